//! The three-way handshake (§4.3.3), shared by both sides. The transfer
//! itself (after the handshake) is just [`crate::engine::run_sender`] or
//! [`crate::engine::run_receiver`] — callers invoke those directly with
//! their own file source/sink, there's no separate "session" type needed
//! once the peer's session address is known.

use std::net::SocketAddr;

use tracing::{info, instrument};

use crate::constants::{MAX_RETRIES, RTO};
use crate::error::TransferError;
use crate::packet::{Operation, Packet, PacketType, Protocol};
use crate::socket::Endpoint;

/// Client-side initiator half: send SYN, wait for SYN-ACK (retrying up to
/// `MAX_RETRIES` times on timeout — this retry is idempotent on the server,
/// see [crate's server dispatcher]), then send the closing handshake ACK.
/// Returns the server's ephemeral session address and, for DOWNLOAD, the
/// file size it reported.
#[instrument(skip(endpoint), fields(server = %server_addr, operation = ?operation, protocol = ?protocol))]
pub async fn initiate(
    endpoint: &Endpoint,
    server_addr: SocketAddr,
    operation: Operation,
    protocol: Protocol,
    remote_name: &str,
) -> Result<(SocketAddr, Option<u64>), TransferError> {
    let syn = Packet::syn(operation, protocol, remote_name);
    let mut retries = 0u32;

    loop {
        endpoint.send(&syn, server_addr).await?;
        match endpoint.receive(RTO).await {
            Ok((packet, from)) => match packet.packet_type {
                PacketType::SynAck => {
                    endpoint.send(&Packet::ack(protocol, 0), from).await?;
                    info!(session_addr = %from, "handshake complete");
                    return Ok((from, packet.file_size()));
                }
                PacketType::Error => {
                    return Err(error_from_payload(&packet));
                }
                _ => continue,
            },
            Err(TransferError::Timeout) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    return Err(TransferError::PeerUnresponsive);
                }
            }
            Err(TransferError::Malformed) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Server-side responder half: reply with SYN-ACK from the session's
/// ephemeral endpoint. The dispatcher has already validated the file and
/// bound the endpoint before calling this.
pub async fn respond(
    endpoint: &Endpoint,
    client_addr: SocketAddr,
    operation: Operation,
    protocol: Protocol,
    file_size: Option<u64>,
) -> Result<(), TransferError> {
    endpoint
        .send(&Packet::syn_ack(operation, protocol, file_size), client_addr)
        .await
}

/// Replies to a handshake failure from the listening socket (the dispatcher
/// never creates a session in this case).
pub async fn respond_error(
    endpoint: &Endpoint,
    client_addr: SocketAddr,
    operation: Operation,
    protocol: Protocol,
    error: &TransferError,
) -> Result<(), TransferError> {
    endpoint
        .send(
            &Packet::error(operation, protocol, &error.as_wire_message()),
            client_addr,
        )
        .await
}

fn error_from_payload(packet: &Packet) -> TransferError {
    match packet.payload_as_string().as_deref() {
        Some("FILE_NOT_FOUND") => TransferError::FileNotFound,
        Some("FILE_EXISTS") => TransferError::FileExists,
        _ => TransferError::ProtocolViolation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn handshake_roundtrip_for_upload() {
        let client = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let listener = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let session_ep = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let listener_addr = listener.local_addr().unwrap();
        let session_addr = session_ep.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (syn, from) = listener.receive(Duration::from_secs(1)).await.unwrap();
            assert_eq!(syn.packet_type, PacketType::Syn);
            respond(&session_ep, from, Operation::Upload, Protocol::GoBackN, None)
                .await
                .unwrap();
        });

        let (addr, file_size) = initiate(
            &client,
            listener_addr,
            Operation::Upload,
            Protocol::GoBackN,
            "file.bin",
        )
        .await
        .unwrap();

        server.await.unwrap();
        assert_eq!(addr, session_addr);
        assert_eq!(file_size, None);
    }

    #[tokio::test]
    async fn handshake_surfaces_file_not_found() {
        let client = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let listener = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let listener_addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (_syn, from) = listener.receive(Duration::from_secs(1)).await.unwrap();
            respond_error(
                &listener,
                from,
                Operation::Download,
                Protocol::StopAndWait,
                &TransferError::FileNotFound,
            )
            .await
            .unwrap();
        });

        let result = initiate(
            &client,
            listener_addr,
            Operation::Download,
            Protocol::StopAndWait,
            "missing.txt",
        )
        .await;

        server.await.unwrap();
        assert!(matches!(result, Err(TransferError::FileNotFound)));
    }
}
