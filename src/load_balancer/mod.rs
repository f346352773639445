//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! HostMapping resolved → target list known
//!     → tracker.rs (lock the connection table)
//!     → least_conn.rs (pick target with fewest active connections)
//!     → tracker.rs (increment, hand out a Reservation guard)
//!     → forwarding completes, guard dropped → count decremented
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function over (targets, counts)
//! - The tracker owns the only mutable state: one table, one lock
//! - Release happens only through the guard, so it runs exactly once

pub mod least_conn;
pub mod tracker;

use std::collections::HashMap;

pub use least_conn::{select_target, LeastConnections};
pub use tracker::{ConnectionTracker, Reservation};

/// Target-selection strategy over a host's current connection counts.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick one of `targets`, or `None` if nothing is selectable.
    /// Targets absent from `counts` have no active connections.
    fn next_target<'a>(
        &self,
        targets: &'a [String],
        counts: &HashMap<String, u64>,
    ) -> Option<&'a str>;
}
