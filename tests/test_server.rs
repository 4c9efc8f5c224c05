//! End-to-end tests: a real server on a loopback port and the client against it

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ferry::client::{BodyReport, Client, Target};
use ferry::config::{ByteOrder, ClientConfig, DelimiterScan, Framing, ServerConfig};
use ferry::http::connection::Connection;
use ferry::server::{Server, WorkerStats};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<WorkerStats>>,
}

impl Running {
    async fn stop(self) -> WorkerStats {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap()
    }
}

fn server_config(root: &Path, framing: Framing) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        root: root.to_path_buf(),
        framing,
        byte_order: ByteOrder::Network,
        ..ServerConfig::default()
    }
}

async fn start(root: &Path, framing: Framing) -> Running {
    let server = Server::bind(server_config(root, framing)).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown, rx) = oneshot::channel();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = rx.await;
    }));

    Running {
        addr,
        shutdown,
        handle,
    }
}

fn target(addr: SocketAddr, path: &str) -> Target {
    Target::parse(&format!("http://127.0.0.1:{}{}", addr.port(), path)).unwrap()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

fn prefixed_client() -> Client {
    Client::new(ClientConfig {
        framing: Framing::LengthPrefixed,
        byte_order: ByteOrder::Network,
        delimiter_scan: DelimiterScan::CarryOver,
        ..ClientConfig::default()
    })
}

#[tokio::test]
async fn test_plain_round_trip_sizes() {
    let root = tempfile::tempdir().unwrap();
    let sizes = [0usize, 1, 4096, 4097, 1_000_000];
    for n in sizes {
        std::fs::write(root.path().join(format!("file_{}.bin", n)), pattern(n)).unwrap();
    }
    let server = start(root.path(), Framing::Plain).await;
    let client = Client::new(ClientConfig::default());

    for n in sizes {
        let mut sink = Vec::new();
        let report = client
            .fetch_to(&target(server.addr, &format!("/file_{}.bin", n)), &mut sink)
            .await
            .unwrap();

        let mut expected =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", n).into_bytes();
        expected.extend_from_slice(&pattern(n));
        expected.push(b'\n');

        assert_eq!(sink.len(), expected.len(), "size {}", n);
        assert!(sink == expected, "size {}", n);
        assert!(matches!(report.body, BodyReport::Plain(ref r) if r.read_error.is_none()));
        assert_eq!(report.attempts, 1);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_round_trip_names_with_space_and_non_ascii() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("café.txt"), b"coffee").unwrap();
    std::fs::write(root.path().join("a b.txt"), b"spaced").unwrap();
    let server = start(root.path(), Framing::Plain).await;
    let client = Client::new(ClientConfig::default());

    for (name, content) in [("/café.txt", &b"coffee"[..]), ("/a b.txt", &b"spaced"[..])] {
        let mut sink = Vec::new();
        client.fetch_to(&target(server.addr, name), &mut sink).await.unwrap();

        assert!(sink.starts_with(b"HTTP/1.1 200 OK\r\n"), "{}", name);
        let mut expected = content.to_vec();
        expected.push(b'\n');
        assert!(sink.ends_with(&expected), "{}", name);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_request_line_that_is_not_utf8_is_400() {
    let root = tempfile::tempdir().unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /caf\xe9.txt HTTP/1.1\r\n\r\n").await;

    assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\n\r\n");

    server.stop().await;
}

#[tokio::test]
async fn test_content_length_matches_streamed_bytes() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("data.bin"), pattern(10_000)).unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /data.bin HTTP/1.1\r\n\r\n").await;

    let split = response.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let head = String::from_utf8(response[..split].to_vec()).unwrap();
    assert!(head.contains("Content-Length: 10000\r\n"));
    assert_eq!(response.len() - split, 10_000);
    assert_eq!(&response[split..], &pattern(10_000)[..]);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let root = tempfile::tempdir().unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /missing.txt HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert_eq!(response, b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n");

    server.stop().await;
}

#[tokio::test]
async fn test_directory_is_404() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /sub HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

    let response = raw_exchange(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn test_nested_path_is_served() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("a/b")).unwrap();
    std::fs::write(root.path().join("a/b/c.txt"), b"nested").unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /a/b/c.txt HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with(b"\r\n\r\nnested"));

    server.stop().await;
}

#[tokio::test]
async fn test_non_get_is_400_without_body() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"content").unwrap();
    let server = start(root.path(), Framing::Plain).await;

    for method in ["POST", "PUT", "DELETE", "HEAD", "get"] {
        let request = format!("{} /a.txt HTTP/1.1\r\n\r\n", method);
        let response = raw_exchange(server.addr, request.as_bytes()).await;
        assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\n\r\n", "method {}", method);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_garbage_request_is_400() {
    let root = tempfile::tempdir().unwrap();
    let server = start(root.path(), Framing::Plain).await;

    let response = raw_exchange(server.addr, b"\r\n").await;
    assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\n\r\n");

    let long = format!("GET /{} HTTP/1.1\r\n\r\n", "x".repeat(1500));
    let response = raw_exchange(server.addr, long.as_bytes()).await;
    assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\n\r\n");

    server.stop().await;
}

#[tokio::test]
async fn test_traversal_outside_root_is_refused() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("www");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(outer.path().join("secret.txt"), b"do not serve").unwrap();
    let server = start(&root, Framing::Plain).await;

    let response = raw_exchange(server.addr, b"GET /../secret.txt HTTP/1.1\r\n\r\n").await;

    assert_eq!(response, b"HTTP/1.1 403 Forbidden\r\nConnection: close\r\n\r\n");

    server.stop().await;
}

#[tokio::test]
async fn test_silent_client_does_not_stop_server() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"still here").unwrap();
    let server = start(root.path(), Framing::Plain).await;

    // Connect and hang up without a request
    let stream = TcpStream::connect(server.addr).await.unwrap();
    drop(stream);

    let response = raw_exchange(server.addr, b"GET /a.txt HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with(b"still here"));

    server.stop().await;
}

#[tokio::test]
async fn test_length_prefixed_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let data = pattern(20_000);
    std::fs::write(root.path().join("big.bin"), &data).unwrap();
    let server = start(root.path(), Framing::LengthPrefixed).await;

    let mut sink = Vec::new();
    let report = prefixed_client()
        .fetch_to(&target(server.addr, "/big.bin"), &mut sink)
        .await
        .unwrap();

    assert!(sink == data);
    match report.body {
        BodyReport::LengthPrefixed(r) => {
            assert_eq!(r.body_bytes, 20_000);
            assert_eq!(r.declared_total as u64, r.header_bytes + r.body_bytes);
            let header = r.header.unwrap();
            assert_eq!(header.code, 200);
            assert_eq!(header.content_length, Some(20_000));
        }
        other => panic!("unexpected report {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_length_prefixed_not_found_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let server = start(root.path(), Framing::LengthPrefixed).await;

    let mut sink = Vec::new();
    let report = prefixed_client()
        .fetch_to(&target(server.addr, "/nope"), &mut sink)
        .await
        .unwrap();

    assert!(sink.is_empty());
    match report.body {
        BodyReport::LengthPrefixed(r) => assert_eq!(r.header.unwrap().code, 404),
        other => panic!("unexpected report {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_client_run_writes_output_file() {
    let root = tempfile::tempdir().unwrap();
    let data = pattern(4097);
    std::fs::write(root.path().join("f.bin"), &data).unwrap();
    let server = start(root.path(), Framing::LengthPrefixed).await;

    let downloads = tempfile::tempdir().unwrap();
    let output = downloads.path().join("output");
    std::fs::write(&output, b"stale contents that must be truncated away").unwrap();

    let client = Client::new(ClientConfig {
        output: output.clone(),
        framing: Framing::LengthPrefixed,
        byte_order: ByteOrder::Network,
        ..ClientConfig::default()
    });
    client.run(&target(server.addr, "/f.bin")).await.unwrap();

    assert!(std::fs::read(&output).unwrap() == data);

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_complete_independently() {
    let root = tempfile::tempdir().unwrap();
    for i in 0..16 {
        std::fs::write(root.path().join(format!("f{}.bin", i)), pattern(5000 + i * 1000)).unwrap();
    }
    let server = start(root.path(), Framing::LengthPrefixed).await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16usize {
        let target = target(server.addr, &format!("/f{}.bin", i));
        tasks.spawn(async move {
            let mut sink = Vec::new();
            prefixed_client().fetch_to(&target, &mut sink).await.unwrap();
            (i, sink)
        });
    }

    let mut done = 0;
    while let Some(result) = tasks.join_next().await {
        let (i, sink) = result.unwrap();
        assert!(sink == pattern(5000 + i * 1000), "file {}", i);
        done += 1;
    }
    assert_eq!(done, 16);

    server.stop().await;
}

#[tokio::test]
async fn test_finished_workers_are_reaped() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();
    let server = start(root.path(), Framing::Plain).await;

    for _ in 0..32 {
        raw_exchange(server.addr, b"GET /a.txt HTTP/1.1\r\n\r\n").await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = server.stop().await;

    assert_eq!(stats.dispatched, 32);
    assert_eq!(stats.reaped, 32);
    assert_eq!(stats.crashed, 0);
}

#[tokio::test]
async fn test_panicking_worker_does_not_stop_accept_loop() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.txt"), b"survivor").unwrap();
    let server = Server::bind(server_config(root.path(), Framing::Plain)).await.unwrap();
    let addr = server.local_addr().unwrap();

    let served = Arc::new(AtomicUsize::new(0));
    let (shutdown, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until_with(
        async move {
            let _ = rx.await;
        },
        move |conn: Connection| {
            let first = served.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    panic!("worker blew up");
                }
                conn.run().await
            }
        },
    ));

    // The first worker panics before answering, so the client sees EOF or a reset
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let _ = stream.write_all(b"GET /a.txt HTTP/1.1\r\n\r\n").await;
    let mut dropped = Vec::new();
    let _ = stream.read_to_end(&mut dropped).await;
    assert!(dropped.is_empty());

    let response = raw_exchange(addr, b"GET /a.txt HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(b"survivor"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let _ = shutdown.send(());
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.reaped, 2);
    assert_eq!(stats.crashed, 1);
}
