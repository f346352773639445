//! Host resolution on top of a mapping store.
//!
//! # Responsibilities
//! - Ask the store for the host's mapping on every request
//! - Translate store outcomes into `MappingNotFound` / `MappingLookup`
//! - Optionally serve repeat lookups from a TTL cache
//!
//! # Design Decisions
//! - Only successful resolutions are cached; a missing host is re-queried
//! - The cache never holds the connection table lock

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::mapping::{HostMapping, MappingStore};
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct CachedMapping {
    mapping: HostMapping,
    stored_at: Instant,
}

/// Time-bounded cache of resolved mappings keyed by host identity.
#[derive(Debug)]
pub struct ResolutionCache {
    ttl: Duration,
    entries: DashMap<String, CachedMapping>,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Fresh entry for `host`, evicting it if expired.
    pub fn get(&self, host: &str) -> Option<HostMapping> {
        {
            let entry = self.entries.get(host)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.mapping.clone());
            }
        }
        self.entries
            .remove_if(host, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, host: &str, mapping: HostMapping) {
        self.entries.insert(
            host.to_string(),
            CachedMapping {
                mapping,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, host: &str) {
        self.entries.remove(host);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves host identities to mappings.
#[derive(Debug)]
pub struct MappingResolver {
    store: Arc<dyn MappingStore>,
    cache: Option<ResolutionCache>,
}

impl MappingResolver {
    /// Resolver that queries the store on every call.
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store, cache: None }
    }

    /// Resolver that caches successful lookups for `ttl`.
    pub fn with_cache(store: Arc<dyn MappingStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: Some(ResolutionCache::new(ttl)),
        }
    }

    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    pub async fn resolve(&self, host: &str) -> Result<HostMapping, GatewayError> {
        if let Some(mapping) = self.cache.as_ref().and_then(|c| c.get(host)) {
            metrics::record_lookup("cache_hit");
            return Ok(mapping);
        }

        match self.store.find(host).await {
            Ok(Some(mapping)) => {
                metrics::record_lookup("found");
                if let Some(cache) = &self.cache {
                    cache.insert(host, mapping.clone());
                }
                Ok(mapping)
            }
            Ok(None) => {
                metrics::record_lookup("not_found");
                Err(GatewayError::MappingNotFound { host: host.to_string() })
            }
            Err(source) => {
                metrics::record_lookup("error");
                Err(GatewayError::MappingLookup {
                    host: host.to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{StaticMappingStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper counting how often it is queried.
    #[derive(Debug)]
    struct CountingStore {
        inner: StaticMappingStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MappingStore for CountingStore {
        async fn find(&self, host: &str) -> Result<Option<HostMapping>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find(host).await
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl MappingStore for FailingStore {
        async fn find(&self, _host: &str) -> Result<Option<HostMapping>, StoreError> {
            Err(StoreError::Status(503))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    fn counting_store() -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: StaticMappingStore::from_mappings([HostMapping::new(
                "a.test",
                vec!["localhost:1".into()],
            )]),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_resolves_every_time_without_cache() {
        let store = counting_store();
        let resolver = MappingResolver::new(store.clone());

        for _ in 0..3 {
            resolver.resolve("a.test").await.unwrap();
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_and_lookup_error() {
        let resolver = MappingResolver::new(counting_store());
        assert!(matches!(
            resolver.resolve("missing.test").await,
            Err(GatewayError::MappingNotFound { .. })
        ));

        let resolver = MappingResolver::new(Arc::new(FailingStore));
        assert!(matches!(
            resolver.resolve("a.test").await,
            Err(GatewayError::MappingLookup { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_serves_within_ttl() {
        let store = counting_store();
        let resolver = MappingResolver::with_cache(store.clone(), Duration::from_secs(30));

        resolver.resolve("a.test").await.unwrap();
        resolver.resolve("a.test").await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        resolver.resolve("a.test").await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_skips_not_found() {
        let store = counting_store();
        let resolver = MappingResolver::with_cache(store.clone(), Duration::from_secs(30));

        assert!(resolver.resolve("missing.test").await.is_err());
        assert!(resolver.resolve("missing.test").await.is_err());
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert!(resolver.cache().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_invalidation() {
        let store = counting_store();
        let resolver = MappingResolver::with_cache(store.clone(), Duration::from_secs(30));

        resolver.resolve("a.test").await.unwrap();
        resolver.cache().unwrap().invalidate("a.test");
        resolver.resolve("a.test").await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);

        resolver.cache().unwrap().invalidate_all();
        assert!(resolver.cache().unwrap().is_empty());
    }
}
