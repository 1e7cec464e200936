//! Thin wrapper over a UDP socket: send/receive encoded [`Packet`]s with a
//! timeout. Every session owns exactly one `Endpoint`; nothing else touches
//! its underlying socket.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::TransferError;
use crate::packet::Packet;

pub struct Endpoint {
    socket: UdpSocket,
}

impl Endpoint {
    pub async fn bind(addr: impl Into<SocketAddr>) -> Result<Self, TransferError> {
        let socket = UdpSocket::bind(addr.into())
            .await
            .map_err(TransferError::NetworkError)?;
        Ok(Endpoint { socket })
    }

    /// Binds an ephemeral port on the same interface family as `peer`.
    pub async fn bind_ephemeral(peer: SocketAddr) -> Result<Self, TransferError> {
        let any: SocketAddr = if peer.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        Self::bind(any).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransferError> {
        self.socket.local_addr().map_err(TransferError::NetworkError)
    }

    pub async fn send(&self, packet: &Packet, peer: SocketAddr) -> Result<(), TransferError> {
        let bytes = packet.encode()?;
        self.socket
            .send_to(&bytes, peer)
            .await
            .map_err(TransferError::NetworkError)?;
        Ok(())
    }

    /// Waits up to `timeout` for a datagram. `TransferError::Timeout` on
    /// expiry; `TransferError::Malformed` if the bytes don't decode (the
    /// caller may retry the receive — the datagram is already consumed).
    pub async fn receive(&self, timeout: Duration) -> Result<(Packet, SocketAddr), TransferError> {
        let mut buf = [0u8; 2048];
        let (n, from) = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| TransferError::Timeout)?
            .map_err(TransferError::NetworkError)?;
        let packet = Packet::decode(&buf[..n])?;
        Ok((packet, from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Operation, Protocol};

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let a = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let b = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let b_addr = b.local_addr().unwrap();

        let packet = Packet::syn(Operation::Upload, Protocol::GoBackN, "file.bin");
        a.send(&packet, b_addr).await.unwrap();

        let (received, _from) = b.receive(Duration::from_secs(1)).await.unwrap();
        assert_eq!(received.payload_as_string().unwrap(), "file.bin");
    }

    #[tokio::test]
    async fn receive_times_out_when_nothing_arrives() {
        let endpoint = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let result = endpoint.receive(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TransferError::Timeout)));
    }
}
