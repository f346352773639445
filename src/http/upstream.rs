//! Upstream client pool.
//!
//! # Responsibilities
//! - Keep one long-lived pooling client per (host, target)
//! - Build clients lazily; rebuild when the host's policy changes
//! - Enforce the host's connection cap with a semaphore per (host, target)
//!
//! # Design Decisions
//! - Redirects are not followed: 3xx responses go back to the caller as-is
//! - The mapping timeout bounds connect and every read on the exchange

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::error::Elapsed;

use crate::mapping::HostMapping;

/// Connection settings derived from a host mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpstreamPolicy {
    pub timeout: Option<Duration>,
    pub max_connections: Option<usize>,
}

impl UpstreamPolicy {
    pub fn from_mapping(mapping: &HostMapping) -> Self {
        Self {
            timeout: mapping.effective_timeout(),
            max_connections: mapping.connection_limit(),
        }
    }
}

/// A client bound to one (host, target) pair.
#[derive(Debug)]
pub struct Upstream {
    client: reqwest::Client,
    limit: Option<Arc<Semaphore>>,
    policy: UpstreamPolicy,
}

impl Upstream {
    fn build(policy: UpstreamPolicy) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();

        if let Some(timeout) = policy.timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        if let Some(max) = policy.max_connections {
            builder = builder.pool_max_idle_per_host(max);
        }

        Ok(Self {
            client: builder.build()?,
            limit: policy.max_connections.map(|max| Arc::new(Semaphore::new(max))),
            policy,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn policy(&self) -> UpstreamPolicy {
        self.policy
    }

    /// Wait for a connection slot when the host is capped.
    ///
    /// The wait is bounded by the policy timeout when one is set. The permit
    /// must be held until the upstream exchange finishes.
    pub async fn acquire(&self) -> Result<Option<OwnedSemaphorePermit>, Elapsed> {
        let Some(limit) = &self.limit else {
            return Ok(None);
        };

        let acquire = Arc::clone(limit).acquire_owned();
        let permit = match self.policy.timeout {
            Some(timeout) => tokio::time::timeout(timeout, acquire).await?,
            None => acquire.await,
        };
        Ok(permit.ok())
    }
}

/// Lazily populated map of upstream clients.
#[derive(Debug, Default)]
pub struct UpstreamPool {
    clients: DashMap<(String, String), Arc<Upstream>>,
}

impl UpstreamPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for `target` under `host`, built on first use.
    ///
    /// Lookup and build happen under the entry lock, so concurrent first
    /// requests for a pair share one client and one connection cap.
    pub fn get(
        &self,
        host: &str,
        target: &str,
        policy: UpstreamPolicy,
    ) -> Result<Arc<Upstream>, reqwest::Error> {
        let key = (host.to_string(), target.to_string());
        match self.clients.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().policy != policy {
                    tracing::debug!(host, upstream = target, ?policy, "Rebuilding upstream client");
                    entry.insert(Arc::new(Upstream::build(policy)?));
                }
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                tracing::debug!(host, upstream = target, ?policy, "Built upstream client");
                let upstream = Arc::new(Upstream::build(policy)?);
                Ok(Arc::clone(entry.insert(upstream).value()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
