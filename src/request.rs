//! Transient request/response model for one gateway invocation

use hyper::body::Bytes;
use hyper::{HeaderMap, Method, StatusCode};
use std::collections::HashMap;

/// Decoded query-string parameters, first occurrence of a key wins
pub type QueryParams = HashMap<String, String>;

/// An inbound request, independent of the server transport
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path as received, before normalization
    pub path: String,
    /// Raw query string without the leading `?`
    pub raw_query: Option<String>,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    /// Build a request from a method and a path that may carry a query string
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, raw_query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        Self::from_parts(
            method,
            path,
            raw_query,
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    pub fn from_parts(
        method: Method,
        path: &str,
        raw_query: Option<&str>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let raw_query = raw_query.filter(|q| !q.is_empty()).map(String::from);
        let query = raw_query.as_deref().map(parse_query).unwrap_or_default();
        Self {
            method,
            path: path.to_string(),
            raw_query,
            query,
            headers,
            body,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// The response produced by one invocation
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON-encoded body, empty for preflight
    pub body: String,
}

impl OutboundResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Parse a raw query string into decoded parameters
pub fn parse_query(raw: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params
            .entry(key)
            .or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        // Invalid UTF-8 after decoding: keep the literal text
        Err(_) => spaced,
    }
}

/// Strips platform routing prefixes so forwarding and fallback matching see
/// the same logical path
#[derive(Debug, Clone, Default)]
pub struct PathNormalizer {
    prefixes: Vec<String>,
}

impl PathNormalizer {
    pub fn new(prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    /// Remove the first prefix that matches on a segment boundary
    pub fn normalize(&self, path: &str) -> String {
        let path = if path.is_empty() { "/" } else { path };

        for prefix in &self.prefixes {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                if rest.is_empty() {
                    return "/".to_string();
                }
                if rest.starts_with('/') {
                    return rest.to_string();
                }
            }
        }

        path.to_string()
    }
}
