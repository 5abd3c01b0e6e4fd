//! Shared utilities for integration testing.
//!
//! Mock backends speak raw HTTP/1.1 over TCP so tests control framing and
//! timing exactly. Every helper binds an ephemeral port and returns it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bff_gateway::config::schema::{GatewayConfig, RuleConfig};
use bff_gateway::http::HttpServer;
use bff_gateway::lifecycle::Shutdown;

pub const ADMIN_COOKIE: &str = "bff_admin_token=change_me_in_production";

/// A running gateway bound to an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server (and its log) to close.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

/// Config whose request log lives in `dir`.
pub fn config_in(dir: &Path, rules: Vec<RuleConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.log.file = dir.join("requests.log").to_string_lossy().into_owned();
    config.admin.static_dir = dir.to_string_lossy().into_owned();
    config.server.shutdown_grace_secs = 1;
    config.proxy.rules = rules;
    config
}

pub fn rule(name: &str, path: &str, target: SocketAddr) -> RuleConfig {
    let mut rule = RuleConfig {
        name: name.into(),
        target: format!("http://{}", target),
        ..Default::default()
    };
    rule.match_condition.path = path.into();
    rule
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    start_gateway_with_path(config, None).await
}

pub async fn start_gateway_with_path(
    config: GatewayConfig,
    path: Option<std::path::PathBuf>,
) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, rx) = mpsc::unbounded_channel();
    let server = HttpServer::with_config_path(config, path);
    let handle = tokio::spawn(server.run(listener, rx, shutdown.subscribe()));

    TestGateway {
        addr,
        shutdown,
        config_updates,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Read one request: head plus a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

async fn write_response(socket: &mut TcpStream, status: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Spawn an accept loop that hands each connection to `serve`.
async fn start_backend<F, Fut>(serve: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve = std::sync::Arc::new(serve);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let serve = serve.clone();
            tokio::spawn(async move { serve(socket).await });
        }
    });

    addr
}

/// Backend that answers every request with `status` and a fixed JSON body.
pub async fn start_mock_backend(status: &'static str, body: &'static str) -> SocketAddr {
    start_backend(move |mut socket| async move {
        read_request(&mut socket).await;
        write_response(&mut socket, status, "application/json", body).await;
    })
    .await
}

/// Backend that answers with the raw request it received (head and body).
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(|mut socket| async move {
        let request = read_request(&mut socket).await;
        write_response(&mut socket, "200 OK", "text/plain", &request).await;
    })
    .await
}

/// Backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(move |mut socket| async move {
        read_request(&mut socket).await;
        tokio::time::sleep(delay).await;
        write_response(&mut socket, "200 OK", "application/json", "{\"slow\":true}").await;
    })
    .await
}

/// Backend that streams `events` as Server-Sent Events, `gap` apart, then
/// closes the connection.
pub async fn start_sse_backend(events: Vec<&'static str>, gap: Duration) -> SocketAddr {
    start_backend(move |mut socket| {
        let events = events.clone();
        async move {
            read_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for event in events {
                tokio::time::sleep(gap).await;
                let frame = format!("data: {}\n\n", event);
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
            let _ = socket.shutdown().await;
        }
    })
    .await
}

/// Backend that announces an event stream with a `Content-Length` it never
/// honors: one event is written, then the connection is closed.
pub async fn start_broken_sse_backend() -> SocketAddr {
    start_backend(|mut socket| async move {
        read_request(&mut socket).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.write_all(b"data: one\n\n").await;
        let _ = socket.flush().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = socket.shutdown().await;
    })
    .await
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
