//! Per-host active connection accounting.
//!
//! # Responsibilities
//! - Hold the connection table: host → target → active count
//! - Select and reserve a target atomically under one lock
//! - Release reservations exactly once through a RAII guard

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{LeastConnections, LoadBalancer};
use crate::observability::metrics;

type ConnectionTable = HashMap<String, HashMap<String, u64>>;

/// Process-wide table of active upstream connections.
///
/// The mutex guards the whole table and is only ever held for in-memory
/// work; no lookup or network call happens while it is locked.
#[derive(Debug)]
pub struct ConnectionTracker {
    table: Mutex<ConnectionTable>,
    balancer: Box<dyn LoadBalancer>,
}

impl ConnectionTracker {
    /// Tracker using least-connections selection.
    pub fn new() -> Self {
        Self::with_balancer(Box::new(LeastConnections::new()))
    }

    fn with_balancer(balancer: Box<dyn LoadBalancer>) -> Self {
        Self {
            table: Mutex::new(ConnectionTable::new()),
            balancer,
        }
    }

    /// Select a target for `host` and reserve it.
    ///
    /// Returns `None` without touching the table when nothing is selectable.
    /// The returned guard decrements the count when dropped.
    pub fn reserve(self: &Arc<Self>, host: &str, targets: &[String]) -> Option<Reservation> {
        if targets.is_empty() {
            return None;
        }

        let target = {
            let mut table = self.table.lock();
            let counts = table.entry(host.to_string()).or_default();
            for target in targets {
                counts.entry(target.clone()).or_insert(0);
            }

            let target = self.balancer.next_target(targets, counts)?.to_string();
            if let Some(count) = counts.get_mut(&target) {
                *count += 1;
            }
            target
        };

        metrics::connection_reserved(host, &target);
        tracing::debug!(host, upstream = %target, "Reserved target");

        Some(Reservation {
            tracker: Arc::clone(self),
            host: host.to_string(),
            target,
        })
    }

    fn release(&self, host: &str, target: &str) {
        {
            let mut table = self.table.lock();
            match table.get_mut(host).and_then(|counts| counts.get_mut(target)) {
                Some(count) if *count > 0 => *count -= 1,
                _ => {
                    tracing::error!(
                        host,
                        upstream = target,
                        "Released a connection that was never reserved"
                    );
                    return;
                }
            }
        }

        metrics::connection_released(host, target);
    }

    /// Current active count for a host/target pair.
    pub fn active_connections(&self, host: &str, target: &str) -> u64 {
        self.table
            .lock()
            .get(host)
            .and_then(|counts| counts.get(target))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `host` has an entry in the table.
    pub fn knows_host(&self, host: &str) -> bool {
        self.table.lock().contains_key(host)
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A reserved slot on one target.
/// Releases the slot when dropped.
#[derive(Debug)]
pub struct Reservation {
    tracker: Arc<ConnectionTracker>,
    host: String,
    target: String,
}

impl Reservation {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.tracker.release(&self.host, &self.target);
    }
}
