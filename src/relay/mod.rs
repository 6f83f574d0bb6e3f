//! Request orchestration: route dispatch, forwarding, relay and session handling.

pub mod error;
pub mod forward;
pub mod path;
pub mod response;
pub mod session;
pub mod upstream;

pub use error::{ErrorEnvelope, RelayError};
pub use session::{LoginPayload, SessionConfig};
pub use upstream::{HttpUpstream, Upstream, UpstreamRequest, UpstreamResponse};

use crate::cookie::request_cookie;
use crate::http::{Method, RelayRequest, RelayResponse};
use crate::runtime::ProxyConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-request context handed to every relay operation.
#[derive(Debug, Clone, Default)]
pub struct RelayContext {
    /// Request ID for tracing, echoed as `x-request-id`.
    pub request_id: String,
    /// Browser address, when known.
    pub remote_addr: Option<SocketAddr>,
}

impl RelayContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// The relay: one browser request in, one backend exchange, one response out.
///
/// Holds only read-only configuration and the transport; it is shared across
/// connections behind an `Arc`.
pub struct Relay {
    config: Arc<ProxyConfig>,
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Handle a browser request. Every failure becomes an error envelope.
    pub async fn handle(&self, request: RelayRequest, ctx: &RelayContext) -> RelayResponse {
        debug!(
            "Relaying {} {} from {:?} [{}]",
            request.method, request.path, ctx.remote_addr, ctx.request_id
        );

        let response = match self.dispatch(request, ctx).await {
            Ok(response) => response,
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!("Relay failure: {} [{}]", e, ctx.request_id);
                } else {
                    warn!("Relay rejected request: {} [{}]", e, ctx.request_id);
                }
                e.into()
            }
        };

        response.header("x-request-id", &ctx.request_id)
    }

    async fn dispatch(&self, request: RelayRequest, ctx: &RelayContext) -> error::Result<RelayResponse> {
        if self.config.enable_health && request.path == "/_health" {
            return Ok(RelayResponse::text("OK"));
        }

        if path::route_segments(&request.path).is_none() {
            return Err(RelayError::NotFound(request.path));
        }

        if request.method == Method::Post {
            if request.path == "/api/login" {
                return self.login(request, ctx).await;
            }
            if request.path == "/api/logout" {
                return Ok(self.logout(request, ctx).await);
            }
        }

        let base = self.config.backend()?;
        let upstream = self.exchange(request, &base, ctx).await?;
        response::relay(upstream)
    }

    /// Forward `request` to `base` and return the backend's answer.
    async fn exchange(
        &self,
        request: RelayRequest,
        base: &str,
        ctx: &RelayContext,
    ) -> error::Result<UpstreamResponse> {
        let url = {
            let segments = path::route_segments(&request.path)
                .ok_or_else(|| RelayError::NotFound(request.path.clone()))?;
            path::upstream_url(base, &segments, request.query.as_deref())
        };

        let session = &self.config.session;
        let bearer = if session.bearer_from_cookie {
            request_cookie(&request.headers, &session.cookie_name)
        } else {
            None
        };

        let upstream_request =
            forward::prepare(request, url, bearer.as_deref(), self.config.max_body_size)?;
        debug!(
            "Forwarding {} {} [{}]",
            upstream_request.method, upstream_request.url, ctx.request_id
        );

        let upstream = self.upstream.send(upstream_request).await?;
        debug!("Backend answered {} [{}]", upstream.status, ctx.request_id);
        Ok(upstream)
    }

    async fn login(&self, request: RelayRequest, ctx: &RelayContext) -> error::Result<RelayResponse> {
        let base = self.config.auth_backend()?;
        let upstream = self.exchange(request, &base, ctx).await?;

        let token = if upstream.status.is_success() {
            LoginPayload::token_from(&upstream.body)
        } else {
            None
        };

        let mut response = response::relay(upstream)?;
        if let Some(token) = token {
            response.set_cookie(&self.config.session.issue(&token, self.config.production));
            info!("Issued session cookie [{}]", ctx.request_id);
        }
        Ok(response)
    }

    /// Logout always clears the session cookie, whatever the backend says.
    async fn logout(&self, request: RelayRequest, ctx: &RelayContext) -> RelayResponse {
        let result = match self.config.auth_backend() {
            Ok(base) => match self.exchange(request, &base, ctx).await {
                Ok(upstream) => response::relay(upstream),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        let mut response = result.unwrap_or_else(|e| {
            warn!("Backend logout failed: {} [{}]", e, ctx.request_id);
            e.into()
        });
        response.set_cookie(&self.config.session.clear(self.config.production));
        info!("Cleared session cookie [{}]", ctx.request_id);
        response
    }
}
