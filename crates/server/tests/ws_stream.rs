//! End-to-end tests of the `/ws/{alias}` transport over a real socket.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ezviewer_core::{Config, Registry};
use ezviewer_server::{router, AppState};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    dir: tempfile::TempDir,
    registry: Registry,
    addr: SocketAddr,
    _shutdown: watch::Sender<bool>,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("tracked_logs.json"));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState {
            registry: registry.clone(),
            config: Arc::new(Config::default()),
            shutdown: shutdown_rx,
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        Self {
            dir,
            registry,
            addr,
            _shutdown: shutdown_tx,
        }
    }

    fn track(&self, alias: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{alias}.log"));
        std::fs::write(&path, body).unwrap();
        self.registry.add(alias, &path).unwrap();
        std::fs::canonicalize(&path).unwrap()
    }

    async fn connect(&self, alias: &str) -> Client {
        let url = format!("ws://{}/ws/{}", self.addr, alias);
        let (client, _) = connect_async(url).await.unwrap();
        client
    }
}

async fn next_json(client: &mut Client) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

/// Read frames until the live marker, returning the history lines seen.
async fn read_until_live(client: &mut Client) -> Vec<String> {
    assert_eq!(next_json(client).await["type"], "metadata");
    let mut lines = Vec::new();
    loop {
        let msg = next_json(client).await;
        match msg["type"].as_str() {
            Some("log_batch") => lines.extend(
                msg["data"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|l| l.as_str().unwrap().to_string()),
            ),
            _ => {
                assert_eq!(msg["msg"], "__LIVE_START__");
                return lines;
            }
        }
    }
}

/// Descriptors of this process currently open on `path`.
#[cfg(target_os = "linux")]
fn open_handles(path: &Path) -> usize {
    std::fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| std::fs::read_link(entry.path()).is_ok_and(|target| target == path))
        .count()
}

#[cfg(target_os = "linux")]
async fn wait_for_release(path: &Path) {
    for _ in 0..40 {
        if open_handles(path) == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} is still open", path.display());
}

#[tokio::test]
async fn unknown_alias_gets_error_then_close() {
    let server = TestServer::start().await;
    let mut client = server.connect("ghost").await;

    let msg = next_json(&mut client).await;
    assert_eq!(msg["type"], "sys");
    assert_eq!(msg["msg"], "Error: ghost not found");

    let next = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("server kept the socket open");
    assert!(
        matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "unexpected frame: {next:?}"
    );
}

#[tokio::test]
async fn history_marker_then_live_lines() {
    let server = TestServer::start().await;
    let path = server.track("api", "one\ntwo\n");
    let mut client = server.connect("api").await;

    assert_eq!(read_until_live(&mut client).await, vec!["one", "two"]);

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"three\n").unwrap();
    let msg = next_json(&mut client).await;
    assert_eq!(msg["type"], "log_batch");
    assert_eq!(msg["data"], serde_json::json!(["three"]));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn client_close_releases_file_handle() {
    let server = TestServer::start().await;
    let path = server.track("api", "one\n");
    let mut client = server.connect("api").await;
    read_until_live(&mut client).await;
    assert!(open_handles(&path) > 0);

    client.close(None).await.unwrap();
    while let Ok(Some(Ok(_))) =
        tokio::time::timeout(Duration::from_secs(2), client.next()).await
    {}
    wait_for_release(&path).await;
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropped_connection_releases_file_handle() {
    let server = TestServer::start().await;
    let path = server.track("api", "one\n");
    let mut client = server.connect("api").await;
    read_until_live(&mut client).await;
    assert!(open_handles(&path) > 0);

    // No close handshake: the TCP stream just goes away.
    drop(client);
    wait_for_release(&path).await;
}
