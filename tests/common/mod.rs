//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::Request, Json, Router};
use host_gateway::config::GatewayConfig;
use host_gateway::load_balancer::ConnectionTracker;
use host_gateway::mapping::{HostMapping, StaticMappingStore};
use host_gateway::{HttpServer, Shutdown};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the echo backend saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Backend answering every request with a JSON description of it.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request) -> Json<Echo> {
        let (parts, body) = request.into_parts();
        let headers = parts
            .headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
        Json(Echo {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    serve(Router::new().fallback(echo)).await
}

/// Backend replying with its `name`; `/slow` waits `delay` first.
/// Returns the address and a hit counter.
pub async fn start_named_backend(
    name: &'static str,
    delay: Duration,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let handler = move |request: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if request.uri().path() == "/slow" {
                tokio::time::sleep(delay).await;
            }
            name
        }
    };

    (serve(Router::new().fallback(handler)).await, hits)
}

/// Concurrent requests seen by a backend.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Backend that holds every request for `delay` and records peak concurrency.
pub async fn start_gauged_backend(delay: Duration) -> (SocketAddr, Arc<Gauge>) {
    let gauge = Arc::new(Gauge::default());
    let shared = gauge.clone();
    let handler = move || {
        let gauge = shared.clone();
        async move {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            gauge.current.fetch_sub(1, Ordering::SeqCst);
            "done"
        }
    };

    (serve(Router::new().fallback(handler)).await, gauge)
}

/// Raw TCP backend that reads the request head and writes a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub tracker: Arc<ConnectionTracker>,
    pub server_router: axum::Router,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway on an ephemeral port serving `mappings`.
pub async fn start_gateway(mappings: Vec<HostMapping>) -> TestGateway {
    start_gateway_with(&GatewayConfig::default(), mappings).await
}

/// Like [`start_gateway`], with an explicit configuration.
pub async fn start_gateway_with(
    config: &GatewayConfig,
    mappings: Vec<HostMapping>,
) -> TestGateway {
    let store = Arc::new(StaticMappingStore::from_mappings(mappings));
    let server = HttpServer::with_store(config, store);
    let tracker = server.tracker();
    let server_router = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.signaled();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        tracker,
        server_router,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll until the tracked count reaches `expected`, or give up after 2s.
pub async fn wait_for_count(
    tracker: &ConnectionTracker,
    host: &str,
    target: &str,
    expected: u64,
) -> u64 {
    for _ in 0..200 {
        let current = tracker.active_connections(host, target);
        if current == expected {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tracker.active_connections(host, target)
}
