//! JSON response construction with the CORS header set attached

use crate::error::ErrorCode;
use crate::request::OutboundResponse;
use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

/// Header naming which path produced the response
pub const X_GATEWAY_SOURCE: &str = "x-gateway-source";
/// Header carrying the error code on error responses
pub const X_GATEWAY_ERROR: &str = "x-gateway-error";

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Relayed from the upstream backend
    Upstream,
    /// Served from the static fallback dataset
    Fallback,
    /// Answered by the gateway itself (preflight)
    Gateway,
}

impl Source {
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Source::Upstream => "upstream",
            Source::Fallback => "fallback",
            Source::Gateway => "gateway",
        }
    }
}

/// Headers every response carries
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers
}

fn headers_for(source: Source) -> HeaderMap {
    let mut headers = cors_headers();
    headers.insert(
        HeaderName::from_static(X_GATEWAY_SOURCE),
        HeaderValue::from_static(source.as_header_value()),
    );
    headers
}

/// Empty 200 answer to a CORS preflight
pub fn preflight() -> OutboundResponse {
    OutboundResponse {
        status: StatusCode::OK,
        headers: headers_for(Source::Gateway),
        body: String::new(),
    }
}

/// Serialize `body` into a JSON response
pub fn json<T: Serialize + ?Sized>(status: StatusCode, source: Source, body: &T) -> OutboundResponse {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "null".to_string());
    OutboundResponse {
        status,
        headers: headers_for(source),
        body,
    }
}

/// JSON response tagged with an error code header
pub fn json_error<T: Serialize + ?Sized>(code: ErrorCode, source: Source, body: &T) -> OutboundResponse {
    let mut response = json(code.status_code(), source, body);
    response.headers.insert(
        HeaderName::from_static(X_GATEWAY_ERROR),
        HeaderValue::from_static(code.as_header_value()),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cors(response: &OutboundResponse) {
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            response.header("access-control-allow-headers"),
            Some("Content-Type")
        );
        assert_eq!(
            response.header("access-control-allow-methods"),
            Some("GET, POST, OPTIONS")
        );
    }

    #[test]
    fn test_preflight_is_empty_with_cors() {
        let response = preflight();
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
        assert_cors(&response);
        assert_eq!(response.header(X_GATEWAY_SOURCE), Some("gateway"));
    }

    #[test]
    fn test_json_response() {
        let response = json(StatusCode::OK, Source::Fallback, &serde_json::json!(["Douala"]));
        assert_eq!(response.body, r#"["Douala"]"#);
        assert_cors(&response);
        assert_eq!(response.header(X_GATEWAY_SOURCE), Some("fallback"));
        assert_eq!(response.header(X_GATEWAY_ERROR), None);
    }

    #[test]
    fn test_json_error_response() {
        let response = json_error(
            ErrorCode::RouteNotFound,
            Source::Fallback,
            &serde_json::json!({"error": "Route non trouvée: /x"}),
        );
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.header(X_GATEWAY_ERROR), Some("ROUTE_NOT_FOUND"));
        assert_cors(&response);
    }
}
