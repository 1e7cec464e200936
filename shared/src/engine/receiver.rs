//! Receiver half of the windowed RDT engine, shared by Stop-and-Wait and
//! Go-Back-N: both protocols accept only the next in-order DATA and answer
//! everything else with a duplicate ACK of the current boundary.

use std::net::SocketAddr;
use std::time::Instant;

use tracing::instrument;

use crate::constants::{LINGER, RTO};
use crate::engine::traits::ByteSink;
use crate::error::TransferError;
use crate::packet::{Packet, PacketType, Protocol};
use crate::socket::Endpoint;

/// Accepts in-order DATA from `peer`, writing each payload to `sink`
/// exactly once, until the final DATA is delivered and acknowledged, then
/// lingers to answer duplicate last-DATA/FIN traffic before returning.
#[instrument(skip(endpoint, sink), fields(peer = %peer, protocol = ?protocol))]
pub async fn run_receiver(
    endpoint: &Endpoint,
    peer: SocketAddr,
    protocol: Protocol,
    sink: &mut impl ByteSink,
) -> Result<(), TransferError> {
    let mut expected_seq: u32 = 0;

    loop {
        match endpoint.receive(RTO).await {
            Ok((packet, from)) => {
                if from != peer {
                    continue; // PROTOCOL_VIOLATION: drop
                }
                if packet.packet_type != PacketType::Data {
                    continue; // out-of-state control packet: drop
                }
                if packet.sequence_number == expected_seq {
                    sink.write_chunk(&packet.payload).await?;
                    let is_last = packet.is_last;
                    expected_seq += 1;
                    endpoint
                        .send(&Packet::ack(protocol, expected_seq), peer)
                        .await?;
                    if is_last {
                        return wind_down(endpoint, peer, protocol, expected_seq).await;
                    }
                } else {
                    // Duplicate (seq < expected) or future (seq > expected): re-ACK the boundary.
                    endpoint
                        .send(&Packet::ack(protocol, expected_seq), peer)
                        .await?;
                }
            }
            Err(TransferError::Timeout) => continue,
            Err(TransferError::Malformed) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// After the last DATA is delivered and acknowledged, keep answering
/// duplicates of that ACK and the eventual FIN for up to `LINGER`, resetting
/// the clock once when FIN-ACK is first sent so the sender can observe it.
async fn wind_down(
    endpoint: &Endpoint,
    peer: SocketAddr,
    protocol: Protocol,
    terminal_ack: u32,
) -> Result<(), TransferError> {
    let mut deadline = Instant::now() + LINGER;
    let mut fin_acked = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        match endpoint.receive(remaining).await {
            Ok((packet, from)) if from == peer => match packet.packet_type {
                PacketType::Data if packet.sequence_number + 1 == terminal_ack => {
                    endpoint.send(&Packet::ack(protocol, terminal_ack), peer).await?;
                }
                PacketType::Fin => {
                    endpoint.send(&Packet::fin_ack(protocol), peer).await?;
                    if !fin_acked {
                        fin_acked = true;
                        deadline = Instant::now() + LINGER;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}
