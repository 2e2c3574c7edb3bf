//! Route-matched static responses used when the upstream is unavailable

use crate::dataset::{self, HealthStatus};
use crate::error::{ErrorCode, GatewayError};
use crate::request::{OutboundResponse, QueryParams};
use crate::response::{self, Source};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

/// Inputs available to a route handler
pub struct ResolveContext<'a> {
    pub query: &'a QueryParams,
    pub health_timestamp: bool,
}

impl ResolveContext<'_> {
    fn param(&self, name: &str) -> &str {
        self.query.get(name).map(String::as_str).unwrap_or("")
    }
}

type RouteHandler = fn(&ResolveContext<'_>) -> Value;

/// One entry of the dispatch table
pub struct RouteEntry {
    pub name: &'static str,
    handler: RouteHandler,
}

/// Known fallback routes, in the order they are advertised on a 404
pub static ROUTES: [RouteEntry; 4] = [
    RouteEntry {
        name: "villes",
        handler: villes,
    },
    RouteEntry {
        name: "communes",
        handler: communes,
    },
    RouteEntry {
        name: "indicateurs",
        handler: indicateurs,
    },
    RouteEntry {
        name: "health",
        handler: health,
    },
];

fn to_value<T: Serialize>(payload: T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn villes(_: &ResolveContext<'_>) -> Value {
    to_value(dataset::VILLES)
}

fn communes(ctx: &ResolveContext<'_>) -> Value {
    to_value(dataset::communes_for(ctx.param("ville")))
}

fn indicateurs(ctx: &ResolveContext<'_>) -> Value {
    to_value(dataset::indicateurs_for(ctx.param("commune")))
}

fn health(ctx: &ResolveContext<'_>) -> Value {
    let timestamp = ctx
        .health_timestamp
        .then(|| chrono::Utc::now().to_rfc3339());
    to_value(HealthStatus::degraded(timestamp))
}

/// Body of a fallback 404
#[derive(Debug, Serialize)]
pub struct NotFoundBody {
    pub error: String,
    pub code: ErrorCode,
    pub path: String,
    pub available_routes: Vec<&'static str>,
}

/// Outcome of resolving one path
#[derive(Debug, Clone)]
pub struct FallbackReply {
    pub status: StatusCode,
    pub body: Value,
    /// Name of the matched route, `None` on 404
    pub matched: Option<&'static str>,
}

impl FallbackReply {
    pub fn into_response(self) -> OutboundResponse {
        if self.matched.is_some() {
            response::json(self.status, Source::Fallback, &self.body)
        } else {
            response::json_error(ErrorCode::RouteNotFound, Source::Fallback, &self.body)
        }
    }
}

/// Resolves normalized paths against the static route table
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    health_timestamp: bool,
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self {
            health_timestamp: true,
        }
    }
}

impl FallbackResolver {
    pub fn new(health_timestamp: bool) -> Self {
        Self { health_timestamp }
    }

    /// Names of all known routes
    pub fn route_names() -> Vec<&'static str> {
        ROUTES.iter().map(|r| r.name).collect()
    }

    /// Find the route for `path`; one trailing slash is ignored, case matters
    pub fn lookup(path: &str) -> Option<&'static RouteEntry> {
        let name = path.strip_prefix('/').unwrap_or(path);
        let name = name.strip_suffix('/').unwrap_or(name);
        ROUTES.iter().find(|route| route.name == name)
    }

    /// Produce the fallback reply for a normalized path; never fails
    pub fn resolve(&self, path: &str, query: &QueryParams) -> FallbackReply {
        match Self::lookup(path) {
            Some(route) => {
                let ctx = ResolveContext {
                    query,
                    health_timestamp: self.health_timestamp,
                };
                FallbackReply {
                    status: StatusCode::OK,
                    body: (route.handler)(&ctx),
                    matched: Some(route.name),
                }
            }
            None => {
                let err = GatewayError::RouteNotFound {
                    path: path.to_string(),
                };
                let code = ErrorCode::RouteNotFound;
                let body = NotFoundBody {
                    error: err.to_string(),
                    code,
                    path: path.to_string(),
                    available_routes: Self::route_names(),
                };
                FallbackReply {
                    status: code.status_code(),
                    body: serde_json::to_value(&body).unwrap_or_else(|_| json!({ "path": path })),
                    matched: None,
                }
            }
        }
    }
}
