//! Tests for the per-connection worker loop

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MapFiles, peer, router};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use turnstile::http::connection::{CloseReason, Connection};
use turnstile::http::writer::{DecodedResponse, decode_response};
use turnstile::registry::{Registry, SocketHandle};

struct Harness {
    registry: Arc<Registry>,
    socket: SocketHandle,
    client: DuplexStream,
    worker: JoinHandle<CloseReason>,
}

fn start(files: MapFiles) -> Harness {
    start_with_pipe(files, 8192)
}

fn start_with_pipe(files: MapFiles, pipe_size: usize) -> Harness {
    let registry = Arc::new(Registry::new(2));
    let router = Arc::new(router(Arc::clone(&registry), Arc::new(files), false));

    let (client, server) = tokio::io::duplex(pipe_size);
    let socket = SocketHandle::new();
    let handle = registry.acquire(socket.clone(), peer(9000)).unwrap();

    let conn = Connection::new(server, peer(9000), handle, socket.clone(), router, 2048);
    let worker = tokio::spawn(conn.run());

    Harness {
        registry,
        socket,
        client,
        worker,
    }
}

async fn roundtrip(client: &mut DuplexStream, raw: &[u8]) -> DecodedResponse {
    client.write_all(raw).await.unwrap();

    let mut buf = vec![0u8; 8192];
    let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("no response")
        .unwrap();
    decode_response(&buf[..n]).unwrap()
}

async fn finish(worker: JoinHandle<CloseReason>) -> CloseReason {
    tokio::time::timeout(Duration::from_secs(2), worker)
        .await
        .expect("worker did not exit")
        .unwrap()
}

#[tokio::test]
async fn test_serves_requests_in_order() {
    let mut h = start(MapFiles::with_file("report.txt", b"data"));

    let first = roundtrip(&mut h.client, b"GET /status\r\n\r\n").await;
    assert_eq!(first.code, 200);
    assert_eq!(first.body, b"Server running, connections: 1");

    let second = roundtrip(&mut h.client, b"GET /file/report.txt\r\n\r\n").await;
    assert_eq!(second.code, 200);
    assert_eq!(second.body, b"data");

    let third = roundtrip(&mut h.client, b"GET /file/missing.txt\r\n\r\n").await;
    assert_eq!(third.code, 404);
}

#[tokio::test]
async fn test_malformed_request_keeps_connection_open() {
    let mut h = start(MapFiles::default());

    let response = roundtrip(&mut h.client, b"no terminator here").await;
    assert_eq!(response.code, 400);
    assert_eq!(h.registry.len(), 1);

    let response = roundtrip(&mut h.client, b"GET /status\r\n\r\n").await;
    assert_eq!(response.code, 200);
}

#[tokio::test]
async fn test_peer_close_releases_slot() {
    let h = start(MapFiles::default());
    assert_eq!(h.registry.len(), 1);

    drop(h.client);

    let reason = finish(h.worker).await;
    assert!(matches!(reason, CloseReason::PeerClosed));
    assert_eq!(h.registry.len(), 0);
}

#[tokio::test]
async fn test_close_all_forces_worker_out() {
    let mut h = start(MapFiles::default());
    roundtrip(&mut h.client, b"GET /status\r\n\r\n").await;

    assert_eq!(h.registry.close_all(), 1);

    let reason = finish(h.worker).await;
    assert!(matches!(reason, CloseReason::ForcedClose));
    assert_eq!(h.registry.len(), 0);

    // The worker dropped its end of the stream
    let mut buf = [0u8; 16];
    assert_eq!(h.client.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_close_signal_before_first_read() {
    let h = start(MapFiles::default());
    h.socket.close();

    let reason = finish(h.worker).await;
    assert!(matches!(reason, CloseReason::ForcedClose));
    assert_eq!(h.registry.len(), 0);
}

#[tokio::test]
async fn test_close_all_interrupts_blocked_write() {
    let mut h = start_with_pipe(MapFiles::with_file("big", &[b'x'; 512]), 64);

    // The client never reads: the first response fills the pipe, the second
    // leaves the worker stuck in its write.
    h.client.write_all(b"GET /file/big\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.client.write_all(b"GET /file/big\r\n\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h.worker.is_finished());

    assert_eq!(h.registry.close_all(), 1);

    let reason = finish(h.worker).await;
    assert!(matches!(reason, CloseReason::ForcedClose));
    assert_eq!(h.registry.len(), 0);
}

#[tokio::test]
async fn test_close_signal_wins_over_pending_request() {
    let mut h = start(MapFiles::default());

    // Request bytes and the close signal are both ready on the first poll
    h.client.write_all(b"GET /status\r\n\r\n").await.unwrap();
    h.socket.close();

    let reason = finish(h.worker).await;
    assert!(matches!(reason, CloseReason::ForcedClose));

    let mut buf = [0u8; 64];
    assert_eq!(h.client.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_persists_across_requests() {
    let mut h = start(MapFiles::default());

    let response = roundtrip(&mut h.client, b"GET /connections\r\n\r\n").await;
    assert_eq!(response.code, 401);

    let response = roundtrip(&mut h.client, b"POST /login\r\n\r\nuser=alice&pass=wonderland").await;
    assert_eq!(response.code, 200);

    let snapshot = h.registry.snapshot();
    assert!(snapshot[0].authenticated);
    assert_eq!(snapshot[0].principal.as_deref(), Some("alice"));

    let response = roundtrip(&mut h.client, b"GET /connections\r\n\r\n").await;
    assert_eq!(response.code, 200);
    assert!(String::from_utf8(response.body).unwrap().contains("user: alice"));
}
