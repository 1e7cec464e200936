use std::fmt;
use std::io;
use std::net::AddrParseError;

/// Error taxonomy for the RDT core. Mid-session failures other than
/// `FileIo`/`NetworkError` are not constructed directly — the timeout path
/// collapses them into `PeerUnresponsive` instead.
#[derive(Debug)]
pub enum TransferError {
    Malformed,
    Timeout,
    PeerUnresponsive,
    FileNotFound,
    FileExists,
    FileIo(io::Error),
    NetworkError(io::Error),
    ProtocolViolation,
    InvalidAddress,
}

impl TransferError {
    /// Human-readable string carried in an ERROR packet's payload.
    pub fn as_wire_message(&self) -> String {
        match self {
            TransferError::FileNotFound => "FILE_NOT_FOUND".to_string(),
            TransferError::FileExists => "FILE_EXISTS".to_string(),
            TransferError::PeerUnresponsive => "PEER_UNRESPONSIVE".to_string(),
            TransferError::FileIo(e) => format!("FILE_IO: {e}"),
            other => format!("{other}"),
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Malformed => write!(f, "malformed packet"),
            TransferError::Timeout => write!(f, "receive timed out"),
            TransferError::PeerUnresponsive => {
                write!(f, "peer unresponsive after max retries")
            }
            TransferError::FileNotFound => write!(f, "requested file not found"),
            TransferError::FileExists => write!(f, "target file already exists"),
            TransferError::FileIo(e) => write!(f, "file I/O error: {e}"),
            TransferError::NetworkError(e) => write!(f, "network error: {e}"),
            TransferError::ProtocolViolation => write!(f, "protocol violation"),
            TransferError::InvalidAddress => write!(f, "invalid address"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::FileIo(e) | TransferError::NetworkError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AddrParseError> for TransferError {
    fn from(_: AddrParseError) -> Self {
        TransferError::InvalidAddress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_matches_taxonomy_names() {
        assert_eq!(TransferError::FileNotFound.as_wire_message(), "FILE_NOT_FOUND");
        assert_eq!(TransferError::FileExists.as_wire_message(), "FILE_EXISTS");
        assert_eq!(
            TransferError::PeerUnresponsive.as_wire_message(),
            "PEER_UNRESPONSIVE"
        );
    }
}
