//! HTTP front end: accept loop, per-connection hyper service and request IDs

use crate::gateway::Gateway;
use crate::request::{InboundRequest, OutboundResponse};
use crate::upstream::X_REQUEST_ID;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::HeaderValue;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Request body limit used unless [`GatewayServer::with_max_body_bytes`] is called
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP front end that feeds every request through the [`Gateway`]
pub struct GatewayServer {
    listener: TcpListener,
    gateway: Arc<Gateway>,
    shutdown_rx: watch::Receiver<bool>,
    max_body_bytes: usize,
}

impl GatewayServer {
    pub async fn bind(
        bind_addr: SocketAddr,
        gateway: Arc<Gateway>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", bind_addr, e))?;
        Ok(Self {
            listener,
            gateway,
            shutdown_rx,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Cap on buffered request bodies; larger bodies are answered from the fallback
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!(addr = %addr, upstream = %self.gateway.upstream().base_url(), "Gateway listening (HTTP/1.1 and HTTP/2)");

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let gateway = Arc::clone(&self.gateway);
                            let max_body_bytes = self.max_body_bytes;
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, addr, gateway, max_body_bytes).await {
                                    debug!(addr = %addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Gateway server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection<S>(
    stream: S,
    addr: SocketAddr,
    gateway: Arc<Gateway>,
    max_body_bytes: usize,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let gateway = Arc::clone(&gateway);
        async move { handle_request(req, gateway, addr, max_body_bytes).await }
    });

    AutoBuilder::new(TokioExecutor::new())
        .serve_connection(io, service)
        .await
        .map_err(|e| anyhow::anyhow!("Connection error: {}", e))?;

    Ok(())
}

async fn handle_request(
    req: Request<Incoming>,
    gateway: Arc<Gateway>,
    client_addr: SocketAddr,
    max_body_bytes: usize,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (mut parts, body) = req.into_parts();

    // Generate or propagate request ID
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }

    debug!(client = %client_addr, method = %parts.method, uri = %parts.uri, request_id, "Incoming request");

    let outbound = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => {
            let inbound = InboundRequest::from_parts(
                parts.method,
                parts.uri.path(),
                parts.uri.query(),
                parts.headers,
                collected.to_bytes(),
            );
            gateway.handle(inbound).await
        }
        Err(e) => {
            // Never forward a partial body; answer from the fallback table instead
            warn!(request_id, max_body_bytes, error = %e, "Request body unreadable, serving fallback");
            let inbound = InboundRequest::from_parts(
                parts.method,
                parts.uri.path(),
                parts.uri.query(),
                parts.headers,
                Bytes::new(),
            );
            gateway.fallback(&inbound)
        }
    };

    debug!(
        request_id,
        status = outbound.status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request complete"
    );

    Ok(into_hyper_response(outbound, &request_id))
}

fn into_hyper_response(outbound: OutboundResponse, request_id: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(outbound.body)));
    *response.status_mut() = outbound.status;
    *response.headers_mut() = outbound.headers;
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
