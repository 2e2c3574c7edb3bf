//! Error kinds and machine-readable error codes for the gateway

use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Error codes surfaced to clients in response headers and bodies.
///
/// Upstream failures have no code: they are always answered from the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No fallback route matches the request path
    RouteNotFound,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Get the error code as a string for the X-Gateway-Error header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ErrorCode::RouteNotFound => "ROUTE_NOT_FOUND",
        }
    }
}

/// Gateway errors.
///
/// `UpstreamUnavailable` is always recovered by the fallback resolver and never
/// reaches the client as an error status, so only `RouteNotFound` has a code.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    #[error("Route non trouvée: {path}")]
    RouteNotFound { path: String },
}

impl GatewayError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        GatewayError::UpstreamUnavailable {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_codes() {
        assert_eq!(
            ErrorCode::RouteNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_error_code_header_values() {
        assert_eq!(ErrorCode::RouteNotFound.as_header_value(), "ROUTE_NOT_FOUND");
    }

    #[test]
    fn test_error_code_serializes_like_header() {
        let json = serde_json::to_string(&ErrorCode::RouteNotFound).unwrap();
        assert_eq!(json, "\"ROUTE_NOT_FOUND\"");
    }

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::RouteNotFound {
            path: "/inconnu".to_string(),
        };
        assert_eq!(err.to_string(), "Route non trouvée: /inconnu");

        let err = GatewayError::upstream("connection refused");
        assert_eq!(err.to_string(), "upstream unavailable: connection refused");
    }
}
