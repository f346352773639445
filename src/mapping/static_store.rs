//! In-memory mapping store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::mapping::{HostMapping, MappingStore, StoreError};

/// A mapping table held in memory, keyed by exact host identity.
#[derive(Debug, Default)]
pub struct StaticMappingStore {
    hosts: DashMap<String, HostMapping>,
}

impl StaticMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of mappings. Later duplicates replace earlier ones.
    pub fn from_mappings(mappings: impl IntoIterator<Item = HostMapping>) -> Self {
        let store = Self::new();
        for mapping in mappings {
            store.insert(mapping);
        }
        store
    }

    pub fn insert(&self, mapping: HostMapping) {
        if let Some(previous) = self.hosts.insert(mapping.host.clone(), mapping) {
            tracing::debug!(host = %previous.host, "Replaced static mapping");
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[async_trait]
impl MappingStore for StaticMappingStore {
    async fn find(&self, host: &str) -> Result<Option<HostMapping>, StoreError> {
        Ok(self.hosts.get(host).map(|entry| entry.value().clone()))
    }

    fn describe(&self) -> String {
        format!("static ({} hosts)", self.hosts.len())
    }
}
