//! End-to-end retransmission scenarios driven over real loopback sockets,
//! with a small relaying proxy in between that can drop one chosen packet
//! (by type and sequence number) exactly once. This exercises the RTO/retry
//! path the way the in-process unit tests (built on `MemorySource`/
//! `MemorySink` with no loss at all) don't.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;

use shared::engine::traits::{MemorySink, MemorySource};
use shared::engine::{run_receiver, run_sender};
use shared::packet::{Packet, PacketType, Protocol};
use shared::socket::Endpoint;

/// Relays datagrams between `a` and `b`, dropping the first packet for which
/// `should_drop` returns true and passing everything else through untouched.
async fn run_dropping_proxy(
    socket: UdpSocket,
    a: SocketAddr,
    b: SocketAddr,
    should_drop: impl Fn(&Packet) -> bool + Send + 'static,
) {
    let dropped_once = AtomicBool::new(false);
    let mut buf = [0u8; 2048];
    loop {
        let (n, from) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(_) => return,
        };
        let bytes = &buf[..n];
        if let Ok(packet) = Packet::decode(bytes) {
            if !dropped_once.load(Ordering::SeqCst) && should_drop(&packet) {
                dropped_once.store(true, Ordering::SeqCst);
                continue;
            }
        }
        let dest = if from == a { b } else { a };
        let _ = socket.send_to(bytes, dest).await;
    }
}

async fn spawn_proxy(
    sender_addr: SocketAddr,
    receiver_addr: SocketAddr,
    should_drop: impl Fn(&Packet) -> bool + Send + 'static,
) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = socket.local_addr().unwrap();
    tokio::spawn(run_dropping_proxy(socket, sender_addr, receiver_addr, should_drop));
    proxy_addr
}

#[tokio::test]
async fn go_back_n_retransmits_after_final_ack_is_lost_once() {
    let sender_ep = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    let receiver_ep = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    let sender_addr = sender_ep.local_addr().unwrap();
    let receiver_addr = receiver_ep.local_addr().unwrap();

    let proxy_addr = spawn_proxy(sender_addr, receiver_addr, |packet| {
        packet.packet_type == PacketType::Ack && packet.sequence_number == 3
    })
    .await;

    // Three DATA packets: 1024, 1024, 50 bytes, so the final ACK is ACK(3).
    let payload = vec![9u8; 1024 * 2 + 50];
    let mut source = MemorySource::new(payload.clone());
    let mut sink = MemorySink::default();

    let sender = tokio::spawn(async move {
        run_sender(&sender_ep, proxy_addr, Protocol::GoBackN, &mut source)
            .await
            .unwrap();
    });
    let receiver = tokio::spawn(async move {
        run_receiver(&receiver_ep, proxy_addr, Protocol::GoBackN, &mut sink)
            .await
            .unwrap();
        sink
    });

    sender.await.unwrap();
    let sink = tokio::time::timeout(Duration::from_secs(5), receiver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sink.data, payload);
}

#[tokio::test]
async fn stop_and_wait_retransmits_after_ack_is_lost_once() {
    let sender_ep = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    let receiver_ep = Endpoint::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    let sender_addr = sender_ep.local_addr().unwrap();
    let receiver_addr = receiver_ep.local_addr().unwrap();

    let proxy_addr = spawn_proxy(sender_addr, receiver_addr, |packet| {
        packet.packet_type == PacketType::Ack && packet.sequence_number == 1
    })
    .await;

    let payload = b"abc".to_vec();
    let mut source = MemorySource::new(payload.clone());
    let mut sink = MemorySink::default();

    let sender = tokio::spawn(async move {
        run_sender(&sender_ep, proxy_addr, Protocol::StopAndWait, &mut source)
            .await
            .unwrap();
    });
    let receiver = tokio::spawn(async move {
        run_receiver(&receiver_ep, proxy_addr, Protocol::StopAndWait, &mut sink)
            .await
            .unwrap();
        sink
    });

    sender.await.unwrap();
    let sink = tokio::time::timeout(Duration::from_secs(5), receiver)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sink.data, payload);
}
