//! Host mapping subsystem.
//!
//! # Data Flow
//! ```text
//! Host header (verbatim)
//!     → resolver.rs (optional TTL cache)
//!     → MappingStore::find
//!         - static_store.rs (in-memory table from config)
//!         - file_store.rs (JSON/TOML document, hot reloaded)
//!         - http_store.rs (remote configuration service)
//!     → HostMapping | NotFound | LookupError
//! ```
//!
//! # Design Decisions
//! - Stores are an async trait object so the gateway never knows the backend
//! - A mapping is a plain value: resolved per request, dropped afterwards
//! - The certificate pair is carried opaquely and never applied

pub mod file_store;
pub mod http_store;
pub mod resolver;
pub mod static_store;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::{MappingStoreConfig, StoreKind};

pub use file_store::FileMappingStore;
pub use http_store::HttpMappingStore;
pub use resolver::{MappingResolver, ResolutionCache};
pub use static_store::StaticMappingStore;

/// Opaque public/private key pair attached to a host.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CertificateBundle {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Routing configuration for one host identity.
///
/// Field names on the wire follow the records kept in the mapping store
/// (`host_url`, `target_url`, `max_conns`, `ssl`). `timeout` is stored as
/// integer nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostMapping {
    #[serde(rename = "host_url")]
    pub host: String,

    #[serde(rename = "target_url", default)]
    pub targets: Vec<String>,

    #[serde(default, with = "duration_nanos", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(rename = "max_conns", default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,

    #[serde(rename = "ssl", default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateBundle>,
}

impl HostMapping {
    pub fn new(host: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            host: host.into(),
            targets,
            timeout: None,
            max_connections: None,
            certificate: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Upstream timeout, if any. A zero duration means "transport default".
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    /// Connection cap, if any. Zero means unbounded.
    pub fn connection_limit(&self) -> Option<usize> {
        self.max_connections.filter(|&n| n > 0)
    }
}

mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_nanos))
    }
}

/// Failure to talk to, or make sense of, the mapping store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store answered with unexpected status {0}")]
    Status(u16),

    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode mapping records: {0}")]
    Decode(String),

    #[error("invalid store url {0}")]
    InvalidUrl(String),

    #[error("failed to watch mapping file: {0}")]
    Watch(#[from] notify::Error),
}

/// Keyed lookup of host mappings.
#[async_trait]
pub trait MappingStore: Send + Sync + fmt::Debug {
    /// Find the mapping for `host`. `Ok(None)` means no mapping is configured.
    async fn find(&self, host: &str) -> Result<Option<HostMapping>, StoreError>;

    /// Short description for startup logs.
    fn describe(&self) -> String;
}

/// Build the store selected by configuration.
pub fn store_from_config(config: &MappingStoreConfig) -> Result<Arc<dyn MappingStore>, StoreError> {
    let store: Arc<dyn MappingStore> = match config.kind {
        StoreKind::Static => Arc::new(StaticMappingStore::from_mappings(config.hosts.clone())),
        StoreKind::File => Arc::new(FileMappingStore::open(&config.path)?.watch()?),
        StoreKind::Http => Arc::new(HttpMappingStore::new(
            &config.url,
            &config.database,
            &config.collection,
            Duration::from_secs(config.timeout_secs),
        )?),
    };
    tracing::info!(store = %store.describe(), "Mapping store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_store_record() {
        let json = r#"{
            "host_url": "api.example.com",
            "target_url": ["localhost:9000", "backend.example.com"],
            "timeout": 5000000000,
            "max_conns": 32,
            "ssl": {"public_key": "PUB", "private_key": "PRIV"}
        }"#;
        let mapping: HostMapping = serde_json::from_str(json).unwrap();

        assert_eq!(mapping.host, "api.example.com");
        assert_eq!(mapping.targets, vec!["localhost:9000", "backend.example.com"]);
        assert_eq!(mapping.timeout, Some(Duration::from_secs(5)));
        assert_eq!(mapping.max_connections, Some(32));
        assert_eq!(mapping.certificate.as_ref().unwrap().public_key, "PUB");
    }

    #[test]
    fn test_optional_fields_absent() {
        let raw = r#"{"host_url": "a.test", "target_url": ["localhost:1"], "ssl": null}"#;
        let mapping: HostMapping = serde_json::from_str(raw).unwrap();
        assert_eq!(mapping.timeout, None);
        assert_eq!(mapping.max_connections, None);
        assert!(mapping.certificate.is_none());
    }

    #[test]
    fn test_zero_policy_values_are_unbounded() {
        let mapping = HostMapping::new("a.test", vec![])
            .with_timeout(Duration::ZERO)
            .with_max_connections(0);
        assert_eq!(mapping.effective_timeout(), None);
        assert_eq!(mapping.connection_limit(), None);
    }

    #[test]
    fn test_private_key_redacted_in_debug() {
        let mut mapping = HostMapping::new("a.test", vec!["localhost:1".into()]);
        mapping.certificate = Some(CertificateBundle {
            public_key: "PUBLIC".into(),
            private_key: "TOP-SECRET".into(),
        });
        let debug = format!("{:?}", mapping);
        assert!(debug.contains("PUBLIC"));
        assert!(!debug.contains("TOP-SECRET"));
    }
}
