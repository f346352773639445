//! Request-path error taxonomy and its HTTP mapping.
//!
//! Every variant is handled at the request boundary: the handler logs it once
//! and turns it into a short generic JSON response. Internal details (store
//! errors, upstream error text) never reach the client.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::mapping::StoreError;

/// Header carrying the machine-readable error code on gateway-generated errors.
pub const X_GATEWAY_ERROR: &str = "x-gateway-error";

/// Failures that end a single proxied request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Neither a `Host` header nor a URI authority was present.
    #[error("request carries no host identity")]
    MissingHost,

    /// The store has no routing configuration for the host.
    #[error("no mapping configured for host {host}")]
    MappingNotFound { host: String },

    /// The store could not be reached or answered garbage.
    #[error("mapping lookup for host {host} failed: {source}")]
    MappingLookup {
        host: String,
        #[source]
        source: StoreError,
    },

    /// A mapping exists but offers nothing to select (empty target pool).
    #[error("no selectable target for host {host}")]
    NoSelectableTarget { host: String },

    /// The chosen target does not parse as an absolute URL with a host.
    #[error("invalid target address {target}: {reason}")]
    InvalidTargetAddress { target: String, reason: String },

    /// The call to the chosen target failed (connect, timeout, protocol).
    #[error("upstream request to {target} failed: {reason}")]
    UpstreamExecution { target: String, reason: String },
}

impl GatewayError {
    /// Status code returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingHost => StatusCode::BAD_REQUEST,
            GatewayError::MappingNotFound { .. }
            | GatewayError::MappingLookup { .. }
            | GatewayError::NoSelectableTarget { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InvalidTargetAddress { .. } | GatewayError::UpstreamExecution { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Value for the `X-Gateway-Error` header.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingHost => "MISSING_HOST",
            GatewayError::MappingNotFound { .. } => "MAPPING_NOT_FOUND",
            GatewayError::MappingLookup { .. } => "MAPPING_LOOKUP_ERROR",
            GatewayError::NoSelectableTarget { .. } => "NO_SELECTABLE_TARGET",
            GatewayError::InvalidTargetAddress { .. } => "INVALID_TARGET_ADDRESS",
            GatewayError::UpstreamExecution { .. } => "UPSTREAM_EXECUTION_ERROR",
        }
    }

    /// Generic message placed in the response body.
    fn public_message(&self) -> &'static str {
        match self {
            GatewayError::MissingHost => "Bad Request",
            GatewayError::MappingNotFound { .. }
            | GatewayError::MappingLookup { .. }
            | GatewayError::NoSelectableTarget { .. } => "Service Unavailable",
            GatewayError::InvalidTargetAddress { .. } => "Invalid target URL",
            GatewayError::UpstreamExecution { .. } => "Error during request",
        }
    }

    /// Log the error at the level matching its operational weight.
    ///
    /// Store failures are infrastructure faults and log at `error`; a host
    /// that simply isn't configured is a `warn`.
    pub fn log(&self, request_id: &str) {
        match self {
            GatewayError::MappingLookup { host, source } => {
                tracing::error!(
                    request_id,
                    host = %host,
                    error = %source,
                    "Mapping store lookup failed"
                );
            }
            GatewayError::UpstreamExecution { target, reason } => {
                tracing::error!(
                    request_id,
                    upstream = %target,
                    error = %reason,
                    "Upstream request failed"
                );
            }
            GatewayError::InvalidTargetAddress { target, reason } => {
                tracing::error!(
                    request_id,
                    upstream = %target,
                    error = %reason,
                    "Invalid target address"
                );
            }
            other => {
                tracing::warn!(request_id, error = %other, "Request rejected");
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&ErrorBody {
            error: self.public_message(),
        })
        .unwrap_or_default();

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status_code();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(X_GATEWAY_ERROR, HeaderValue::from_static(self.code()));
        response
    }
}
