//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, host identity, access log)
//!     → request.rs (request ID)
//!     → [mapping resolver finds the host's targets]
//!     → [connection tracker reserves a target]
//!     → forward.rs (rewrite, websocket.rs short-circuit, upstream call)
//!     → upstream.rs (pooled client per host/target, connection cap)
//!     → Stream response to client
//! ```

pub mod forward;
pub mod request;
pub mod server;
pub mod upstream;
pub mod websocket;

pub use forward::Forwarder;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
