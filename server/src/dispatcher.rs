//! The server's single point of entry: one well-known-port [`Endpoint`]
//! accepts SYNs, and every accepted session gets its own ephemeral `Endpoint`
//! and task. A [`tokio::task::JoinSet`] is the only thing that learns when a
//! session ends, so the session table lives and dies entirely on the
//! dispatcher side — workers never reach back into it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use shared::constants::RTO;
use shared::error::TransferError;
use shared::packet::{Operation, Packet, PacketType, Protocol};
use shared::session;
use shared::socket::Endpoint;

use crate::file_io;

/// A session already in flight: enough to answer a duplicate SYN without
/// disturbing the worker or creating a second session for the same peer.
struct ActiveSession {
    ephemeral: Arc<Endpoint>,
    syn_ack: Packet,
}

type Table = Arc<Mutex<HashMap<SocketAddr, ActiveSession>>>;

/// Runs until `ctrl_c`, then stops admitting new sessions and waits for the
/// in-flight ones to reach a terminal state.
pub async fn run(bind_addr: SocketAddr, storage_dir: PathBuf) -> Result<(), TransferError> {
    tokio::fs::create_dir_all(&storage_dir)
        .await
        .map_err(TransferError::FileIo)?;

    let listener = Endpoint::bind(bind_addr).await?;
    let table: Table = Arc::new(Mutex::new(HashMap::new()));
    let mut workers: JoinSet<SocketAddr> = JoinSet::new();

    info!(bind = %bind_addr, storage = %storage_dir.display(), "server listening");

    loop {
        tokio::select! {
            result = listener.receive(RTO) => {
                match result {
                    Ok((packet, peer)) if packet.packet_type == PacketType::Syn => {
                        accept_syn(&listener, &table, &storage_dir, packet, peer, &mut workers).await;
                    }
                    Ok(_) => {} // non-SYN traffic on the listening socket: discard
                    Err(TransferError::Timeout) | Err(TransferError::Malformed) => {}
                    Err(e) => warn!(error = %e, "listener receive failed"),
                }
            }
            Some(finished) = workers.join_next(), if !workers.is_empty() => {
                if let Ok(peer) = finished {
                    table.lock().await.remove(&peer);
                    info!(%peer, "session closed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested, draining active sessions");
                break;
            }
        }
    }

    while let Some(finished) = workers.join_next().await {
        if let Ok(peer) = finished {
            table.lock().await.remove(&peer);
        }
    }
    Ok(())
}

#[instrument(skip(listener, table, storage_dir, packet), fields(peer = %peer))]
async fn accept_syn(
    listener: &Endpoint,
    table: &Table,
    storage_dir: &Path,
    packet: Packet,
    peer: SocketAddr,
    workers: &mut JoinSet<SocketAddr>,
) {
    {
        let guard = table.lock().await;
        if let Some(existing) = guard.get(&peer) {
            let ephemeral = existing.ephemeral.clone();
            let syn_ack = existing.syn_ack.clone();
            drop(guard);
            if let Err(e) = ephemeral.send(&syn_ack, peer).await {
                warn!(error = %e, "failed to resend duplicate SYN-ACK");
            }
            return;
        }
    }

    let remote_name = match packet.payload_as_string() {
        Some(name) if !name.is_empty() => name,
        _ => {
            let _ = listener
                .send(
                    &Packet::error(
                        packet.operation,
                        packet.protocol,
                        &TransferError::Malformed.as_wire_message(),
                    ),
                    peer,
                )
                .await;
            return;
        }
    };

    let ephemeral = match Endpoint::bind_ephemeral(peer).await {
        Ok(ep) => Arc::new(ep),
        Err(e) => {
            warn!(error = %e, "failed to bind session endpoint");
            return;
        }
    };

    match packet.operation {
        Operation::Upload => {
            match file_io::open_for_upload(storage_dir, &remote_name).await {
                Ok(sink) => {
                    let syn_ack = Packet::syn_ack(Operation::Upload, packet.protocol, None);
                    table.lock().await.insert(
                        peer,
                        ActiveSession { ephemeral: ephemeral.clone(), syn_ack },
                    );
                    let protocol = packet.protocol;
                    workers.spawn(async move {
                        run_upload_session(ephemeral, peer, protocol, sink).await
                    });
                }
                Err(e) => {
                    let _ = session::respond_error(listener, peer, Operation::Upload, packet.protocol, &e).await;
                }
            }
        }
        Operation::Download => {
            match file_io::open_for_download(storage_dir, &remote_name).await {
                Ok((source, file_size)) => {
                    let syn_ack =
                        Packet::syn_ack(Operation::Download, packet.protocol, Some(file_size));
                    table.lock().await.insert(
                        peer,
                        ActiveSession { ephemeral: ephemeral.clone(), syn_ack },
                    );
                    let protocol = packet.protocol;
                    workers.spawn(async move {
                        run_download_session(ephemeral, peer, protocol, file_size, source).await
                    });
                }
                Err(e) => {
                    let _ = session::respond_error(listener, peer, Operation::Download, packet.protocol, &e).await;
                }
            }
        }
    }
}

async fn run_upload_session(
    ephemeral: Arc<Endpoint>,
    client_addr: SocketAddr,
    protocol: Protocol,
    mut sink: file_io::FileSink,
) -> SocketAddr {
    if let Err(e) = session::respond(&ephemeral, client_addr, Operation::Upload, protocol, None).await {
        warn!(peer = %client_addr, error = %e, "failed to send SYN-ACK");
        return client_addr;
    }
    match shared::engine::run_receiver(&ephemeral, client_addr, protocol, &mut sink).await {
        Ok(()) => info!(peer = %client_addr, "upload complete"),
        Err(e) => {
            warn!(peer = %client_addr, error = %e, "upload session failed");
            let _ = ephemeral
                .send(&Packet::error(Operation::Upload, protocol, &e.as_wire_message()), client_addr)
                .await;
        }
    }
    client_addr
}

async fn run_download_session(
    ephemeral: Arc<Endpoint>,
    client_addr: SocketAddr,
    protocol: Protocol,
    file_size: u64,
    mut source: file_io::FileSource,
) -> SocketAddr {
    if let Err(e) = session::respond(
        &ephemeral,
        client_addr,
        Operation::Download,
        protocol,
        Some(file_size),
    )
    .await
    {
        warn!(peer = %client_addr, error = %e, "failed to send SYN-ACK");
        return client_addr;
    }
    match shared::engine::run_sender(&ephemeral, client_addr, protocol, &mut source).await {
        Ok(()) => info!(peer = %client_addr, "download complete"),
        Err(e) => {
            warn!(peer = %client_addr, error = %e, "download session failed");
            let _ = ephemeral
                .send(&Packet::error(Operation::Download, protocol, &e.as_wire_message()), client_addr)
                .await;
        }
    }
    client_addr
}
