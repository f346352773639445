//! Host-based reverse-proxy gateway.
//!
//! Requests are routed by their `Host` header to one of the host's backend
//! targets, chosen by least active connections, and forwarded transparently.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod mapping;
pub mod observability;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
