//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::mapping::HostMapping;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound listener.
    pub listener: ListenerConfig,

    /// Where host mappings come from.
    pub mapping_store: MappingStoreConfig,

    /// Host resolution settings.
    pub resolver: ResolverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8880").
    pub bind_address: String,

    /// Largest request body forwarded upstream, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8880".to_string(),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Which mapping store backs the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Hosts listed inline in this file.
    Static,
    /// A JSON/TOML document reloaded on change.
    File,
    /// A remote configuration service.
    #[default]
    Http,
}

/// Mapping store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingStoreConfig {
    pub kind: StoreKind,

    /// Base URL of the remote store (`http` kind).
    pub url: String,

    /// Database name in the remote store.
    pub database: String,

    /// Collection holding host records.
    pub collection: String,

    /// Request timeout against the remote store, in seconds.
    pub timeout_secs: u64,

    /// Mapping document (`file` kind).
    pub path: String,

    /// Inline mappings (`static` kind).
    pub hosts: Vec<HostMapping>,
}

impl Default for MappingStoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Http,
            url: "http://localhost:8000".to_string(),
            database: "api_gateway".to_string(),
            collection: "hosts".to_string(),
            timeout_secs: 5,
            path: String::new(),
            hosts: Vec::new(),
        }
    }
}

/// Host resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache: CacheConfig,
}

/// Resolution cache. Disabled by default: every request hits the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Lifetime of a cached mapping in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
