//! Host-based reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                    HOST GATEWAY                       │
//!                   │                                                       │
//!  Client Request   │  ┌──────────┐   ┌──────────┐   ┌────────────────┐     │
//!  ─────────────────┼─▶│  http    │──▶│ mapping  │──▶│ load_balancer  │     │
//!                   │  │  server  │   │ resolver │   │ tracker + lc   │     │
//!                   │  └──────────┘   └────┬─────┘   └───────┬────────┘     │
//!                   │                      │                 │              │
//!                   │               mapping store            ▼              │
//!                   │             (static/file/http)  ┌────────────────┐    │
//!  Client Response  │  ┌──────────┐                   │   forwarder    │    │
//!  ◀────────────────┼──│  access  │◀──────────────────│ upstream pool  │◀───┼── Backend
//!                   │  │   log    │                   └────────────────┘    │
//!                   │  └──────────┘                                         │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use host_gateway::config::{default_config, load_config};
use host_gateway::lifecycle::signals::spawn_signal_listener;
use host_gateway::observability::{logging, metrics};
use host_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "host-gateway")]
#[command(about = "Host-based reverse-proxy gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("host-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.mapping_store.kind,
        resolver_cache = config.resolver.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(&config)?;
    server.run(listener, shutdown.signaled()).await?;

    if shutdown.is_triggered() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("Server stopped without a shutdown request");
    }
    Ok(())
}
