//! Single-attempt, timeout-bounded forwarding to the upstream backend

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};
use hyper::body::Bytes;
use hyper::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header name for request ID
pub const X_REQUEST_ID: &str = "x-request-id";

/// One outbound call as built from an inbound request
#[derive(Debug, Clone)]
pub struct ForwardRequest<'a> {
    pub method: &'a Method,
    /// Normalized path, starting with `/`
    pub path: &'a str,
    pub raw_query: Option<&'a str>,
    pub body: &'a Bytes,
    pub request_id: Option<&'a str>,
}

/// HTTP client for the upstream backend
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create upstream HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream URL for a normalized path and optional raw query
    pub fn url_for(&self, path: &str, raw_query: Option<&str>) -> String {
        match raw_query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }

    /// Forward once and return the parsed JSON body of a 2xx reply.
    ///
    /// Every failure (connect, timeout, non-2xx, unparseable body) comes back as
    /// `GatewayError::UpstreamUnavailable`.
    pub async fn forward(&self, request: &ForwardRequest<'_>) -> Result<Value> {
        let url = self.url_for(request.path, request.raw_query);

        match tokio::time::timeout(self.timeout, self.exchange(&url, request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::upstream(format!(
                "timed out after {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn exchange(&self, url: &str, request: &ForwardRequest<'_>) -> Result<Value> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| GatewayError::upstream(format!("unsupported method: {}", e)))?;

        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(id) = request.request_id {
            builder = builder.header(X_REQUEST_ID, id);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::upstream(format!("timed out: {}", e))
            } else {
                GatewayError::upstream(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::upstream(format!(
                "upstream returned status {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::upstream(format!("failed to read body: {}", e)))?;

        let value = serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| GatewayError::upstream(format!("invalid JSON body: {}", e)))?;

        debug!(url, status = status.as_u16(), "Upstream replied");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> UpstreamClient {
        let config = UpstreamConfig {
            url: url.to_string(),
            timeout_secs: 1,
            connect_timeout_secs: 1,
        };
        UpstreamClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_for_with_and_without_query() {
        let c = client("http://backend.local:5000/api/");
        assert_eq!(c.base_url(), "http://backend.local:5000/api");
        assert_eq!(c.url_for("/villes", None), "http://backend.local:5000/api/villes");
        assert_eq!(
            c.url_for("/communes", Some("ville=Douala")),
            "http://backend.local:5000/api/communes?ville=Douala"
        );
        assert_eq!(c.url_for("/villes", Some("")), "http://backend.local:5000/api/villes");
    }

    #[tokio::test]
    async fn test_forward_to_closed_port_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let c = client(&format!("http://127.0.0.1:{}", port));
        let body = Bytes::new();
        let err = c
            .forward(&ForwardRequest {
                method: &Method::GET,
                path: "/villes",
                raw_query: None,
                body: &body,
                request_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));
    }
}
