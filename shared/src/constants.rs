use std::time::Duration;

/// Header size in bytes, ahead of the payload (see [`crate::packet`]).
pub const HEADER_LEN: usize = 10;

/// Largest payload a single DATA packet may carry.
pub const MAX_PAYLOAD: usize = 1024;

/// Window size for the Stop-and-Wait protocol.
pub const WINDOW_STOP_AND_WAIT: u32 = 1;

/// Window size for the Go-Back-N protocol.
pub const WINDOW_GO_BACK_N: u32 = 5;

/// Retransmission timeout: how long a sender waits for progress before
/// resending the oldest unacknowledged packet.
pub const RTO: Duration = Duration::from_millis(500);

/// Consecutive timeouts without progress before a session gives up.
pub const MAX_RETRIES: u32 = 10;

/// How long a receiver keeps answering duplicate terminal packets
/// (last DATA / FIN) after it has already finished its side.
pub const LINGER: Duration = Duration::from_millis(1_000);
