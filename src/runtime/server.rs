//! Relay HTTP server.

use crate::http::{Method, RelayRequest, RelayResponse};
use crate::relay::{HttpUpstream, Relay, RelayContext, RelayError, Upstream};
use crate::runtime::ProxyConfig;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Relay server.
///
/// Accepts browser connections and hands each request to the shared [`Relay`].
pub struct RelayServer {
    relay: Arc<Relay>,
}

impl RelayServer {
    /// Create a server that reaches the backend over HTTP.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let upstream = HttpUpstream::new()?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    /// Create a server over a custom transport.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            relay: Arc::new(Relay::new(config, upstream)),
        }
    }

    /// Get the relay.
    pub fn relay(&self) -> Arc<Relay> {
        self.relay.clone()
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.relay.config().bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Relay listening on {}", listener.local_addr()?);
        match self.relay.config().backend() {
            Ok(base) => info!("Forwarding /api to {}", base),
            Err(e) => warn!("{}; API requests will fail until it is set", e),
        }

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let relay = self.relay.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let relay = relay.clone();
                    async move { handle_request(req, relay, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    relay: Arc<Relay>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let ctx = RelayContext::new(generate_request_id()).with_remote_addr(remote_addr);

    let response = match convert_request(req, relay.config().max_body_size).await {
        Ok(request) => relay.handle(request, &ctx).await,
        Err(e) => {
            warn!("Failed to read request: {} [{}]", e, ctx.request_id);
            RelayResponse::from(e).header("x-request-id", &ctx.request_id)
        }
    };

    Ok(response.into_hyper())
}

/// Convert a hyper request into a [`RelayRequest`], buffering at most `max_body_size` bytes.
async fn convert_request(
    req: Request<Incoming>,
    max_body_size: usize,
) -> Result<RelayRequest, RelayError> {
    let method = Method::try_from(req.method()).map_err(RelayError::MethodNotAllowed)?;
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    debug!("Inbound {} {}", method, path);

    let (parts, body) = req.into_parts();
    let body_bytes = Limited::new(body, max_body_size)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                RelayError::PayloadLimitExceeded {
                    limit: max_body_size,
                }
            } else {
                RelayError::BadRequest(e.to_string())
            }
        })?
        .to_bytes();

    Ok(RelayRequest {
        method,
        path,
        query,
        headers: parts.headers,
        body: if body_bytes.is_empty() {
            None
        } else {
            Some(body_bytes)
        },
    })
}

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique request ID: the start time plus a process-wide sequence number.
fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", timestamp, sequence)
}
