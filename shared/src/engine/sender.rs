//! Sender half of the windowed RDT engine. Stop-and-Wait and Go-Back-N are
//! the same state machine parameterized by `protocol.window_size()` (1 or
//! 5) — see [`crate::packet::Protocol`].

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::constants::{MAX_PAYLOAD, MAX_RETRIES, RTO};
use crate::engine::traits::ByteSource;
use crate::error::TransferError;
use crate::packet::{Packet, PacketType, Protocol};
use crate::socket::Endpoint;

/// Streams every byte from `source` to `peer`, then runs the FIN teardown.
/// Returns once the peer has acknowledged the final DATA and (best-effort)
/// the FIN exchange has completed.
#[instrument(skip(endpoint, source), fields(peer = %peer, protocol = ?protocol))]
pub async fn run_sender(
    endpoint: &Endpoint,
    peer: SocketAddr,
    protocol: Protocol,
    source: &mut impl ByteSource,
) -> Result<(), TransferError> {
    let window_size = protocol.window_size();
    let mut base: u32 = 0;
    let mut next_seq: u32 = 0;
    let mut inflight: VecDeque<(Packet, Instant)> = VecDeque::new();
    let mut exhausted = false;
    let mut retry_count: u32 = 0;

    loop {
        while !exhausted && next_seq.wrapping_sub(base) < window_size {
            let (chunk, is_last) = source.read_chunk(MAX_PAYLOAD).await?;
            let packet = Packet::data(protocol, next_seq, chunk, is_last);
            endpoint.send(&packet, peer).await?;
            inflight.push_back((packet, Instant::now()));
            if is_last {
                exhausted = true;
            }
            next_seq += 1;
        }

        if exhausted && base == next_seq {
            break;
        }

        let oldest_sent_at = inflight
            .front()
            .map(|(_, sent_at)| *sent_at)
            .unwrap_or_else(Instant::now);
        let wait = (oldest_sent_at + RTO).saturating_duration_since(Instant::now());

        match endpoint.receive(wait).await {
            Ok((packet, from)) => {
                if from != peer {
                    continue; // peer address changed mid-session: drop (PROTOCOL_VIOLATION)
                }
                if packet.packet_type == PacketType::Ack && packet.sequence_number > base {
                    let acked_through = packet.sequence_number;
                    while matches!(inflight.front(), Some((p, _)) if p.sequence_number < acked_through)
                    {
                        inflight.pop_front();
                    }
                    base = acked_through;
                    retry_count = 0;
                    if let Some((_, sent_at)) = inflight.front_mut() {
                        *sent_at = Instant::now();
                    }
                }
                // Smaller/equal ACKs and non-ACK packets are dropped.
            }
            Err(TransferError::Timeout) => {
                retry_count += 1;
                if retry_count >= MAX_RETRIES {
                    warn!("peer unresponsive after {retry_count} consecutive timeouts");
                    return Err(TransferError::PeerUnresponsive);
                }
                debug!(retry_count, inflight = inflight.len(), "retransmitting window");
                for (packet, sent_at) in inflight.iter_mut() {
                    endpoint.send(packet, peer).await?;
                    *sent_at = Instant::now();
                }
            }
            Err(TransferError::Malformed) => continue,
            Err(e) => return Err(e),
        }
    }

    send_fin_and_wait(endpoint, peer, protocol).await
}

/// Graceful teardown: send FIN, retransmit up to `MAX_RETRIES` times until a
/// FIN-ACK arrives, then close regardless (the transfer already completed).
async fn send_fin_and_wait(
    endpoint: &Endpoint,
    peer: SocketAddr,
    protocol: Protocol,
) -> Result<(), TransferError> {
    endpoint.send(&Packet::fin(protocol), peer).await?;
    let mut sent_at = Instant::now();
    let mut retries = 0u32;

    loop {
        let wait = (sent_at + RTO).saturating_duration_since(Instant::now());
        match endpoint.receive(wait).await {
            Ok((packet, from)) if from == peer && packet.packet_type == PacketType::FinAck => {
                return Ok(());
            }
            Ok(_) => continue,
            Err(TransferError::Timeout) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    debug!("FIN-ACK never arrived; closing anyway, transfer already acked");
                    return Ok(());
                }
                endpoint.send(&Packet::fin(protocol), peer).await?;
                sent_at = Instant::now();
            }
            Err(TransferError::Malformed) => continue,
            Err(e) => return Err(e),
        }
    }
}
