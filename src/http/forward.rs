//! Request forwarding to the reserved target.
//!
//! # Responsibilities
//! - Normalize and parse the target address
//! - Short-circuit WebSocket upgrades with a 101
//! - Rewrite URI and `Host`, copy every other header verbatim
//! - Execute the upstream call through the pooled client
//! - Stream the request body up and the response back, holding the
//!   reservation until the response is done

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, Uri},
    response::Response,
};
use futures_util::StreamExt;
use url::Url;

use crate::error::GatewayError;
use crate::http::upstream::{UpstreamPolicy, UpstreamPool};
use crate::http::websocket;
use crate::load_balancer::Reservation;
use crate::mapping::HostMapping;

/// Prefix a scheme onto a bare target address.
///
/// `localhost` targets are assumed to speak plain HTTP; everything else is
/// assumed to be HTTPS.
pub fn normalize_target(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else if address.contains("localhost") {
        format!("http://{}", address)
    } else {
        format!("https://{}", address)
    }
}

/// Normalize and parse a target into its base URL.
pub fn parse_target(address: &str) -> Result<Url, GatewayError> {
    let normalized = normalize_target(address);
    let url = Url::parse(&normalized).map_err(|e| GatewayError::InvalidTargetAddress {
        target: address.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(GatewayError::InvalidTargetAddress {
            target: address.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// `host[:port]` of the target, as sent in the outbound `Host` header.
pub fn target_authority(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Target base URL with its path and query replaced by the inbound ones.
pub fn upstream_url(target: &Url, uri: &Uri) -> Url {
    let mut url = target.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// Inbound headers copied onto the outbound request, `Host` rewritten.
///
/// A later value for the same header name replaces an earlier one.
pub fn outbound_headers(inbound: &HeaderMap, target: &Url) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        headers.insert(name.clone(), value.clone());
    }

    let authority = target_authority(target);
    let host = HeaderValue::from_str(&authority).map_err(|e| GatewayError::InvalidTargetAddress {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    headers.insert(header::HOST, host);
    Ok(headers)
}

/// Time spent in the upstream call, up to the response head.
///
/// Attached to proxied responses as an extension for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTiming(pub Duration);

/// Executes proxied requests against reserved targets.
#[derive(Debug, Default)]
pub struct Forwarder {
    upstreams: UpstreamPool,
}

impl Forwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward `request` to the reserved target.
    ///
    /// The request body is streamed upstream as it arrives. The reservation
    /// is moved into the response body and released when the body finishes
    /// streaming or is dropped. On every error path it is released before
    /// the error is returned.
    pub async fn forward(
        &self,
        request: Request<Body>,
        mapping: &HostMapping,
        reservation: Reservation,
    ) -> Result<Response, GatewayError> {
        let target = parse_target(reservation.target())?;

        if websocket::is_websocket_upgrade(request.headers()) {
            tracing::debug!(upstream = %target, "WebSocket upgrade answered without proxying");
            return Ok(websocket::switching_protocols());
        }

        let (parts, body) = request.into_parts();
        let url = upstream_url(&target, &parts.uri);
        let headers = outbound_headers(&parts.headers, &target)?;

        let upstream_error = |reason: String| GatewayError::UpstreamExecution {
            target: reservation.target().to_string(),
            reason,
        };

        let policy = UpstreamPolicy::from_mapping(mapping);
        let upstream = self
            .upstreams
            .get(reservation.host(), reservation.target(), policy)
            .map_err(|e| upstream_error(e.to_string()))?;
        let permit = upstream
            .acquire()
            .await
            .map_err(|_| upstream_error("timed out waiting for a connection slot".to_string()))?;

        tracing::debug!(url = %url, "Forwarding request");
        let started = Instant::now();
        let response = upstream
            .client()
            .request(parts.method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(|e| upstream_error(e.to_string()))?;
        let timing = UpstreamTiming(started.elapsed());

        let status = response.status();
        let headers = response.headers().clone();
        let in_flight = InFlight {
            _reservation: reservation,
            _permit: permit,
        };
        let stream = response.bytes_stream().map(move |chunk| {
            let _in_flight = &in_flight;
            chunk
        });

        let mut proxied = Response::new(Body::from_stream(stream));
        *proxied.status_mut() = status;
        *proxied.headers_mut() = headers;
        proxied.extensions_mut().insert(timing);
        Ok(proxied)
    }
}

/// Resources held for the lifetime of an upstream response body.
struct InFlight {
    _reservation: Reservation,
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}
