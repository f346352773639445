//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router (every path, every method goes to the proxy)
//! - Wire up middleware (tracing, request ID)
//! - Resolve host → reserve target → forward → access log

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::forward::{Forwarder, UpstreamTiming};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::load_balancer::ConnectionTracker;
use crate::mapping::{store_from_config, MappingResolver, MappingStore, StoreError};
use crate::observability::access::{self, AccessRecord};

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<MappingResolver>,
    pub tracker: Arc<ConnectionTracker>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server using the mapping store named in the configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, StoreError> {
        let store = store_from_config(&config.mapping_store)?;
        Ok(Self::with_store(config, store))
    }

    /// Create a server around an already constructed store.
    pub fn with_store(config: &GatewayConfig, store: Arc<dyn MappingStore>) -> Self {
        let cache = &config.resolver.cache;
        let resolver = if cache.enabled {
            MappingResolver::with_cache(store, Duration::from_secs(cache.ttl_secs))
        } else {
            MappingResolver::new(store)
        };

        let state = AppState {
            resolver: Arc::new(resolver),
            tracker: Arc::new(ConnectionTracker::new()),
            forwarder: Arc::new(Forwarder::new()),
        };

        let router = Self::build_router(state.clone(), config.listener.max_body_bytes);
        Self { router, state }
    }

    fn build_router(state: AppState, max_body_bytes: usize) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(max_body_bytes))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        Arc::clone(&self.state.tracker)
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Host identity as the client addressed us: the `Host` header verbatim,
/// falling back to the URI authority (HTTP/2).
fn host_identity(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .filter(|h| !h.is_empty())
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let mut target = None;
    let response = match route(&state, request, &mut target).await {
        Ok(response) => response,
        Err(err) => {
            err.log(&request_id);
            err.into_response()
        }
    };

    access::record(&AccessRecord {
        status: response.status(),
        start,
        upstream_elapsed: response.extensions().get::<UpstreamTiming>().map(|t| t.0),
        peer,
        method: &method,
        target: target.as_deref().unwrap_or(""),
        path: &path,
        request_id: &request_id,
    });

    response
}

async fn route(
    state: &AppState,
    request: Request<Body>,
    target: &mut Option<String>,
) -> Result<Response, GatewayError> {
    let host = host_identity(&request).ok_or(GatewayError::MissingHost)?;
    let mapping = state.resolver.resolve(&host).await?;

    let reservation = state
        .tracker
        .reserve(&host, &mapping.targets)
        .ok_or_else(|| GatewayError::NoSelectableTarget { host: host.clone() })?;
    *target = Some(reservation.target().to_string());

    state.forwarder.forward(request, &mapping, reservation).await
}
