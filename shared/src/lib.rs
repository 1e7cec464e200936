//! Core of the reliable file-transfer service: packet framing, the
//! endpoint socket, the windowed RDT engine, and the handshake. Command-line
//! parsing, storage-directory layout, and file-stream construction live in
//! the `client`/`server` binary crates built on top of this library.

pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod packet;
pub mod session;
pub mod socket;

pub use error::TransferError;
pub use packet::{Operation, Packet, PacketType, Protocol};
pub use socket::Endpoint;
