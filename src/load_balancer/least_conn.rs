//! Least Connections load balancing strategy.

use std::collections::HashMap;

use crate::load_balancer::LoadBalancer;

/// Least connections selector.
/// Selects the target with the minimum number of active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_target<'a>(
        &self,
        targets: &'a [String],
        counts: &HashMap<String, u64>,
    ) -> Option<&'a str> {
        select_target(targets, counts)
    }
}

/// Scan `targets` in order and return the first one with the lowest count.
///
/// The comparison is strict, so on a tie the earliest target wins.
pub fn select_target<'a>(targets: &'a [String], counts: &HashMap<String, u64>) -> Option<&'a str> {
    let mut min_conns = u64::MAX;
    let mut candidate = None;

    for target in targets {
        let conns = counts.get(target).copied().unwrap_or(0);
        if conns < min_conns {
            min_conns = conns;
            candidate = Some(target.as_str());
        }
    }

    candidate
}
