use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use otalink::config::Config;
use otalink::device::DeviceReset;
use otalink::install::sha1_hex;
use otalink::server::listener;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Default)]
struct RecordingReset {
    resets: AtomicUsize,
}

impl DeviceReset for RecordingReset {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

async fn start_server(staging: &Path) -> (SocketAddr, Arc<RecordingReset>) {
    let cfg = Config {
        listen_addr: "127.0.0.1:0".to_string(),
        staging_dir: staging.to_path_buf(),
    };
    let reset = Arc::new(RecordingReset::default());

    let server = listener::bind(&cfg, reset.clone()).await;
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    (addr, reset)
}

fn update_request(target: &Path, contents: &[u8], filehash: &str) -> String {
    let body = BASE64.encode(contents);
    format!(
        "PUT {} HTTP/1.1\r\ncontent-length: {}\r\nX-filehash: {}\r\n\r\n{}",
        target.display(),
        body.len(),
        filehash,
        body
    )
}

async fn send(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_valid_update_is_installed_and_device_resets() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let target = dir.path().join("app.bin");
    let contents = b"hello world!";
    let request = update_request(&target, contents, &sha1_hex(contents));

    let response = send(addr, &request).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("Connection: close"));
    assert_eq!(std::fs::read(&target).unwrap(), contents);

    wait_for(|| reset.resets.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_checksum_mismatch_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let target = dir.path().join("app.bin");
    std::fs::write(&target, b"previous version").unwrap();

    let wrong = "0000000000000000000000000000000000000000";
    let response = send(addr, &update_request(&target, b"new version", wrong)).await;

    assert!(response.is_empty());
    assert_eq!(std::fs::read(&target).unwrap(), b"previous version");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(reset.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_filehash_refuses_install() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let target = dir.path().join("app.bin");
    let body = BASE64.encode(b"new version");
    let request = format!(
        "PUT {} HTTP/1.1\r\ncontent-length: {}\r\n\r\n{}",
        target.display(),
        body.len(),
        body
    );

    let response = send(addr, &request).await;

    assert!(response.is_empty());
    assert!(!target.exists());
    assert_eq!(reset.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_without_payload_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let response = send(addr, "GET /status HTTP/1.1\r\n\r\n").await;

    assert!(response.is_empty());
    assert_eq!(reset.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_request_does_not_kill_the_listener() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let response = send(addr, "not a request at all\r\n\r\n").await;
    assert!(response.is_empty());

    // The next connection is still served.
    let target = dir.path().join("app.bin");
    let contents = b"second attempt";
    let response = send(addr, &update_request(&target, contents, &sha1_hex(contents))).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(std::fs::read(&target).unwrap(), contents);
    wait_for(|| reset.resets.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_peer_closing_mid_header_does_not_kill_the_listener() {
    let dir = TempDir::new().unwrap();
    let (addr, _reset) = start_server(&dir.path().join("staging")).await;

    {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"PUT /app.bin HTTP/1.1\r\ncontent-le").await.unwrap();
    }

    let target = dir.path().join("app.bin");
    let contents = b"after the abort";
    let response = send(addr, &update_request(&target, contents, &sha1_hex(contents))).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(std::fs::read(&target).unwrap(), contents);
}

#[tokio::test]
async fn test_repeated_valid_update_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (addr, reset) = start_server(&dir.path().join("staging")).await;

    let target = dir.path().join("app.bin");
    let contents = b"hello world!";
    let request = update_request(&target, contents, &sha1_hex(contents));

    let first = send(addr, &request).await;
    assert!(first.starts_with("HTTP/1.1 200 OK"));

    let second = send(addr, &request).await;
    assert!(second.starts_with("HTTP/1.1 200 OK"));

    assert_eq!(std::fs::read(&target).unwrap(), contents);
    wait_for(|| reset.resets.load(Ordering::SeqCst) == 2).await;
}

#[tokio::test]
async fn test_bind_retries_until_port_is_free() {
    let dir = TempDir::new().unwrap();

    let occupier = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupier.local_addr().unwrap();

    let cfg = Config {
        listen_addr: addr.to_string(),
        staging_dir: dir.path().to_path_buf(),
    };
    let reset = Arc::new(RecordingReset::default());
    let binding = tokio::spawn(async move { listener::bind(&cfg, reset).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!binding.is_finished());

    drop(occupier);

    let server = tokio::time::timeout(Duration::from_secs(10), binding)
        .await
        .expect("bind did not complete after the port freed")
        .unwrap();
    assert_eq!(server.local_addr().unwrap(), addr);
}
