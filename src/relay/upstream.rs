//! Transport to the backend API.

use crate::http::Method;
use crate::relay::error::RelayError;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use reqwest::{redirect, Client};
use tracing::error;

/// A request addressed at an absolute backend URL.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// The backend's answer, fully buffered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// Something that can carry one request to the backend and bring back its response.
///
/// An HTTP error status is a successful exchange; only transport failures are errors.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError>;
}

/// [`Upstream`] backed by a pooled `reqwest` client.
///
/// Redirects are not followed, so the browser sees the backend's `Location` and any
/// cookies set alongside it. No timeout is applied beyond the connection's own lifetime.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, RelayError> {
        let UpstreamRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self
            .client
            .request(hyper::Method::from(method), &url)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                return RelayError::InvalidBackend(url.clone());
            }
            error!("Upstream request to {} failed: {}", url, e);
            RelayError::Unreachable {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            error!("Reading upstream body from {} failed: {}", url, e);
            RelayError::Unreachable {
                url: url.clone(),
                reason: format!("failed to read response body: {}", e),
            }
        })?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
