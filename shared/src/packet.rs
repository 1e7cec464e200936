//! On-wire framing: a fixed 10-byte header followed by an optional payload.
//!
//! ```text
//! offset  size  field
//!      0     1  type
//!      1     1  operation
//!      2     1  protocol
//!      3     1  flags (bit 0 = is_last)
//!      4     4  sequence_number (big-endian)
//!      8     2  payload_length (big-endian)
//!     10     .  payload
//! ```

use crate::constants::{HEADER_LEN, MAX_PAYLOAD};
use crate::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Syn,
    SynAck,
    Ack,
    Data,
    Fin,
    FinAck,
    Error,
}

impl PacketType {
    fn to_byte(self) -> u8 {
        match self {
            PacketType::Syn => 0,
            PacketType::SynAck => 1,
            PacketType::Ack => 2,
            PacketType::Data => 3,
            PacketType::Fin => 4,
            PacketType::FinAck => 5,
            PacketType::Error => 6,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, TransferError> {
        match byte {
            0 => Ok(PacketType::Syn),
            1 => Ok(PacketType::SynAck),
            2 => Ok(PacketType::Ack),
            3 => Ok(PacketType::Data),
            4 => Ok(PacketType::Fin),
            5 => Ok(PacketType::FinAck),
            6 => Ok(PacketType::Error),
            _ => Err(TransferError::Malformed),
        }
    }
}

/// Meaningful only on [`PacketType::Syn`]; carried as 0 elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Download,
}

impl Operation {
    fn to_byte(self) -> u8 {
        match self {
            Operation::Upload => 0,
            Operation::Download => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, TransferError> {
        match byte {
            0 => Ok(Operation::Upload),
            1 => Ok(Operation::Download),
            _ => Err(TransferError::Malformed),
        }
    }
}

/// Meaningful only on [`PacketType::Syn`]; carried as 0 elsewhere. Selects
/// which window size the whole session's [`crate::engine`] instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    StopAndWait,
    GoBackN,
}

impl Protocol {
    fn to_byte(self) -> u8 {
        match self {
            Protocol::StopAndWait => 0,
            Protocol::GoBackN => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, TransferError> {
        match byte {
            0 => Ok(Protocol::StopAndWait),
            1 => Ok(Protocol::GoBackN),
            _ => Err(TransferError::Malformed),
        }
    }

    pub fn window_size(self) -> u32 {
        match self {
            Protocol::StopAndWait => crate::constants::WINDOW_STOP_AND_WAIT,
            Protocol::GoBackN => crate::constants::WINDOW_GO_BACK_N,
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop-and-wait" | "sw" => Ok(Protocol::StopAndWait),
            "go-back-n" | "gbn" => Ok(Protocol::GoBackN),
            _ => Err(TransferError::Malformed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub packet_type: PacketType,
    pub operation: Operation,
    pub protocol: Protocol,
    pub sequence_number: u32,
    pub is_last: bool,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Builds a DATA packet; callers ensure `payload.len() <= MAX_PAYLOAD`.
    pub fn data(protocol: Protocol, sequence_number: u32, payload: Vec<u8>, is_last: bool) -> Self {
        Packet {
            packet_type: PacketType::Data,
            operation: Operation::Upload,
            protocol,
            sequence_number,
            is_last,
            payload,
        }
    }

    /// Builds a cumulative ACK for `next_expected`.
    pub fn ack(protocol: Protocol, next_expected: u32) -> Self {
        Packet {
            packet_type: PacketType::Ack,
            operation: Operation::Upload,
            protocol,
            sequence_number: next_expected,
            is_last: false,
            payload: Vec::new(),
        }
    }

    pub fn syn(operation: Operation, protocol: Protocol, filename: &str) -> Self {
        Packet {
            packet_type: PacketType::Syn,
            operation,
            protocol,
            sequence_number: 0,
            is_last: false,
            payload: filename.as_bytes().to_vec(),
        }
    }

    pub fn syn_ack(operation: Operation, protocol: Protocol, file_size: Option<u64>) -> Self {
        Packet {
            packet_type: PacketType::SynAck,
            operation,
            protocol,
            sequence_number: 0,
            is_last: false,
            payload: file_size.map(|n| n.to_be_bytes().to_vec()).unwrap_or_default(),
        }
    }

    pub fn fin(protocol: Protocol) -> Self {
        Packet {
            packet_type: PacketType::Fin,
            operation: Operation::Upload,
            protocol,
            sequence_number: 0,
            is_last: false,
            payload: Vec::new(),
        }
    }

    pub fn fin_ack(protocol: Protocol) -> Self {
        Packet {
            packet_type: PacketType::FinAck,
            operation: Operation::Upload,
            protocol,
            sequence_number: 0,
            is_last: false,
            payload: Vec::new(),
        }
    }

    pub fn error(operation: Operation, protocol: Protocol, message: &str) -> Self {
        Packet {
            packet_type: PacketType::Error,
            operation,
            protocol,
            sequence_number: 0,
            is_last: false,
            payload: message.as_bytes().to_vec(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransferError> {
        if self.payload.len() > u16::MAX as usize {
            return Err(TransferError::Malformed);
        }
        if self.packet_type == PacketType::Data && self.payload.len() > MAX_PAYLOAD {
            return Err(TransferError::Malformed);
        }
        let payload_length = self.payload.len() as u16;
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.push(self.packet_type.to_byte());
        buf.push(self.operation.to_byte());
        buf.push(self.protocol.to_byte());
        buf.push(if self.is_last { 1 } else { 0 });
        buf.extend_from_slice(&self.sequence_number.to_be_bytes());
        buf.extend_from_slice(&payload_length.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TransferError> {
        if bytes.len() < HEADER_LEN {
            return Err(TransferError::Malformed);
        }
        let packet_type = PacketType::from_byte(bytes[0])?;
        let operation = Operation::from_byte(bytes[1])?;
        let protocol = Protocol::from_byte(bytes[2])?;
        let is_last = bytes[3] & 0x1 != 0;
        let sequence_number = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let payload_length = u16::from_be_bytes([bytes[8], bytes[9]]) as usize;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != payload_length {
            return Err(TransferError::Malformed);
        }
        if packet_type == PacketType::Data && payload_length > MAX_PAYLOAD {
            return Err(TransferError::Malformed);
        }
        Ok(Packet {
            packet_type,
            operation,
            protocol,
            sequence_number,
            is_last,
            payload: payload.to_vec(),
        })
    }

    /// Parses the 8-byte big-endian `file_size` payload of a DOWNLOAD SYN-ACK.
    pub fn file_size(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.payload.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn payload_as_string(&self) -> Option<String> {
        String::from_utf8(self.payload.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_roundtrips() {
        let packet = Packet::data(Protocol::GoBackN, 7, b"hello".to_vec(), true);
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_LEN + 5);
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.packet_type, PacketType::Data);
        assert_eq!(decoded.protocol, Protocol::GoBackN);
        assert_eq!(decoded.sequence_number, 7);
        assert!(decoded.is_last);
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn control_packet_has_no_payload() {
        let ack = Packet::ack(Protocol::StopAndWait, 3);
        let encoded = ack.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.sequence_number, 3);
        assert!(!decoded.is_last);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(matches!(
            Packet::decode(&[0u8; 9]),
            Err(TransferError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_payload_length_mismatch() {
        let mut bytes = Packet::ack(Protocol::GoBackN, 1).encode().unwrap();
        bytes[8] = 0;
        bytes[9] = 5; // claims 5 bytes of payload that aren't present
        assert!(matches!(
            Packet::decode(&bytes),
            Err(TransferError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_out_of_range_enum_byte() {
        let mut bytes = Packet::ack(Protocol::GoBackN, 1).encode().unwrap();
        bytes[0] = 200;
        assert!(matches!(
            Packet::decode(&bytes),
            Err(TransferError::Malformed)
        ));
    }

    #[test]
    fn encode_rejects_oversized_data_payload() {
        let packet = Packet::data(Protocol::GoBackN, 0, vec![0u8; MAX_PAYLOAD + 1], true);
        assert!(matches!(packet.encode(), Err(TransferError::Malformed)));
    }

    #[test]
    fn syn_ack_file_size_roundtrips() {
        let packet = Packet::syn_ack(Operation::Download, Protocol::GoBackN, Some(5200));
        let encoded = packet.encode().unwrap();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.file_size(), Some(5200));
    }

    #[test]
    fn protocol_from_str() {
        assert_eq!(
            "go-back-n".parse::<Protocol>().unwrap(),
            Protocol::GoBackN
        );
        assert_eq!(
            "stop-and-wait".parse::<Protocol>().unwrap(),
            Protocol::StopAndWait
        );
        assert!("garbage".parse::<Protocol>().is_err());
    }
}
