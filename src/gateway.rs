//! The forward-or-fallback request handler

use crate::config::Config;
use crate::fallback::FallbackResolver;
use crate::request::{InboundRequest, OutboundResponse, PathNormalizer};
use crate::response::{self, Source};
use crate::upstream::{ForwardRequest, UpstreamClient, X_REQUEST_ID};
use hyper::{Method, StatusCode};
use tracing::{debug, warn};

/// Handles one request at a time; shared immutably across connections
#[derive(Debug, Clone)]
pub struct Gateway {
    upstream: UpstreamClient,
    resolver: FallbackResolver,
    normalizer: PathNormalizer,
}

impl Gateway {
    pub fn new(upstream: UpstreamClient, resolver: FallbackResolver, normalizer: PathNormalizer) -> Self {
        Self {
            upstream,
            resolver,
            normalizer,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            UpstreamClient::new(&config.upstream)?,
            FallbackResolver::new(config.fallback.health_timestamp),
            PathNormalizer::new(config.routing.strip_prefixes.clone()),
        ))
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Handle one request. Always produces a response.
    pub async fn handle(&self, request: InboundRequest) -> OutboundResponse {
        if request.method == Method::OPTIONS {
            return response::preflight();
        }

        let path = self.normalizer.normalize(&request.path);
        let request_id = request
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok());

        let forward = ForwardRequest {
            method: &request.method,
            path: &path,
            raw_query: request.raw_query.as_deref(),
            body: &request.body,
            request_id,
        };

        match self.upstream.forward(&forward).await {
            Ok(body) => {
                debug!(path, method = %request.method, "Relaying upstream response");
                response::json(StatusCode::OK, Source::Upstream, &body)
            }
            Err(e) => {
                warn!(path, method = %request.method, error = %e, "Serving fallback");
                self.resolver.resolve(&path, &request.query).into_response()
            }
        }
    }

    /// Answer from the fallback table without contacting the upstream.
    ///
    /// Used when the inbound body could not be read in full, so a truncated
    /// request is never forwarded.
    pub fn fallback(&self, request: &InboundRequest) -> OutboundResponse {
        if request.method == Method::OPTIONS {
            return response::preflight();
        }

        let path = self.normalizer.normalize(&request.path);
        self.resolver.resolve(&path, &request.query).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_gateway() -> Gateway {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = Config::default();
        config.upstream.url = format!("http://127.0.0.1:{}/api", port);
        config.upstream.timeout_secs = 2;
        config.upstream.connect_timeout_secs = 1;
        Gateway::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_options_short_circuits() {
        let gateway = unreachable_gateway();
        let response = gateway
            .handle(InboundRequest::new(Method::OPTIONS, "/anything/at/all"))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(response.header("x-gateway-source"), Some("gateway"));
    }

    #[tokio::test]
    async fn test_prefixed_paths_hit_same_fallback() {
        let gateway = unreachable_gateway();
        for path in ["/.netlify/functions/api/villes", "/api/villes", "/villes", "/villes/"] {
            let response = gateway.handle(InboundRequest::new(Method::GET, path)).await;
            assert_eq!(response.status, StatusCode::OK, "path {}", path);
            assert_eq!(response.body, r#"["Douala","Yaoundé"]"#, "path {}", path);
            assert_eq!(response.header("x-gateway-source"), Some("fallback"));
        }
    }

    #[tokio::test]
    async fn test_not_found_reports_normalized_path() {
        let gateway = unreachable_gateway();
        let response = gateway
            .handle(InboundRequest::new(Method::GET, "/api/quartiers?x=1"))
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let body = response.json().unwrap();
        assert_eq!(body["path"], "/quartiers");
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_fallback_skips_upstream_and_normalizes() {
        let gateway = unreachable_gateway();

        let response = gateway.fallback(&InboundRequest::new(Method::POST, "/api/communes?ville=Douala"));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().unwrap().as_array().map(Vec::len), Some(5));
        assert_eq!(response.header("x-gateway-source"), Some("fallback"));

        let response = gateway.fallback(&InboundRequest::new(Method::POST, "/upload"));
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = gateway.fallback(&InboundRequest::new(Method::OPTIONS, "/upload"));
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_post_falls_back_by_path() {
        let gateway = unreachable_gateway();
        let request = InboundRequest::new(Method::POST, "/communes?ville=yaounde")
            .with_body(r#"{"ignored":true}"#);
        let response = gateway.handle(request).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().unwrap().as_array().map(Vec::len), Some(7));
    }
}
