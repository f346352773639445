//! Per-request access log.
//!
//! One event per request, including those answered by the gateway itself.
//! The status band only selects the log level: 5xx at `error`, 4xx at
//! `warn`, everything else at `info`.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};

use crate::observability::metrics;

/// Severity class of a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBand {
    Success,
    Redirection,
    ClientError,
    ServerError,
    Other,
}

impl StatusBand {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            200..=299 => StatusBand::Success,
            300..=399 => StatusBand::Redirection,
            400..=499 => StatusBand::ClientError,
            500.. => StatusBand::ServerError,
            _ => StatusBand::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBand::Success => "2xx",
            StatusBand::Redirection => "3xx",
            StatusBand::ClientError => "4xx",
            StatusBand::ServerError => "5xx",
            StatusBand::Other => "other",
        }
    }
}

impl fmt::Display for StatusBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything reported about one finished request.
#[derive(Debug)]
pub struct AccessRecord<'a> {
    pub status: StatusCode,
    /// Handler entry. The logged `elapsed` includes the mapping lookup.
    pub start: Instant,
    /// Upstream call alone, up to the response head. `None` when no call was made.
    pub upstream_elapsed: Option<Duration>,
    pub peer: SocketAddr,
    pub method: &'a Method,
    /// Chosen target, or empty when the gateway answered before selecting one.
    pub target: &'a str,
    pub path: &'a str,
    pub request_id: &'a str,
}

macro_rules! access_event {
    ($level:expr, $record:expr, $band:expr) => {
        tracing::event!(
            $level,
            status = $record.status.as_u16(),
            band = %$band,
            elapsed = ?$record.start.elapsed(),
            upstream_elapsed = ?$record.upstream_elapsed,
            peer = %$record.peer.ip(),
            method = %$record.method,
            upstream = $record.target,
            path = $record.path,
            request_id = $record.request_id,
            "request completed"
        )
    };
}

/// Emit the access log line and request metrics.
pub fn record(record: &AccessRecord<'_>) {
    let band = StatusBand::of(record.status);
    match band {
        StatusBand::ServerError => access_event!(tracing::Level::ERROR, record, band),
        StatusBand::ClientError => access_event!(tracing::Level::WARN, record, band),
        _ => access_event!(tracing::Level::INFO, record, band),
    }

    metrics::record_request(
        record.method.as_str(),
        record.status.as_u16(),
        record.target,
        record.start,
        record.upstream_elapsed,
    );
}
