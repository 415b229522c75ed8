//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, extract::State, http::HeaderMap, routing::any, Router};
use search_gate::config::GateConfig;
use search_gate::http::GateServer;
use search_gate::lifecycle::Shutdown;
use tokio::net::TcpListener;

/// Requests seen by the mock backend.
#[derive(Clone, Default)]
pub struct BackendLog {
    pub hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl BackendLog {
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn echo(State(log): State<BackendLog>, headers: HeaderMap, body: Bytes) -> (HeaderMap, Bytes) {
    log.hits.fetch_add(1, Ordering::SeqCst);

    let mut reply = HeaderMap::new();
    if let Some(id) = headers.get("x-request-id") {
        reply.insert("x-backend-saw-request-id", id.clone());
    }
    reply.insert("x-backend", "echo".parse().unwrap());
    (reply, body)
}

/// Start a backend that answers every request with the body it received.
pub async fn start_echo_backend() -> (SocketAddr, BackendLog) {
    let log = BackendLog::default();
    let app = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

/// Address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config pointing at `backend`, with the sweeper and metrics off.
pub fn config_for(backend: SocketAddr) -> GateConfig {
    let mut config = GateConfig::default();
    config.backend.address = backend.to_string();
    config.backend.timeout_secs = 5;
    config.rate_limit.sweep_interval_ms = 0;
    config
}

/// Start the gate on an ephemeral port. Keep the returned `Shutdown` alive.
pub async fn start_gate(config: GateConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GateServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
