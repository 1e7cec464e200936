//! The RDT protocol engine: a single cumulative-ACK sliding-window
//! sender/receiver pair, instantiated with window size 1 (Stop-and-Wait) or
//! 5 (Go-Back-N) per [`crate::packet::Protocol`].

mod receiver;
mod sender;
pub mod traits;

pub use receiver::run_receiver;
pub use sender::run_sender;
pub use traits::{ByteSink, ByteSource};
