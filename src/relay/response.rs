//! Turning a backend response into the browser response.

use crate::cookie::{set_cookie_values, SetCookie};
use crate::http::RelayResponse;
use crate::relay::error::{snippet, RelayError, Result};
use crate::relay::upstream::UpstreamResponse;
use hyper::header::{
    HeaderMap, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_TYPE, LOCATION,
};
use tracing::{debug, warn};

/// How the backend body is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Json,
    /// A successful HTML or untyped body where JSON was expected.
    Unexpected,
    Passthrough,
}

impl BodyKind {
    pub fn classify(status: hyper::StatusCode, content_type: Option<&str>, body: &[u8]) -> Self {
        if body.is_empty() {
            return BodyKind::Empty;
        }

        let media = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        let declared_json = media
            .as_deref()
            .map(|m| m == "application/json" || m.ends_with("+json"))
            .unwrap_or(false);
        if declared_json || looks_like_json(body) {
            return BodyKind::Json;
        }

        match media.as_deref() {
            None | Some("text/html") if status.is_success() => BodyKind::Unexpected,
            _ => BodyKind::Passthrough,
        }
    }
}

fn looks_like_json(body: &[u8]) -> bool {
    matches!(
        body.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

/// Parse every `Set-Cookie` the backend emitted, skipping malformed entries.
pub fn upstream_cookies(headers: &HeaderMap) -> Vec<SetCookie> {
    set_cookie_values(headers)
        .into_iter()
        .filter_map(|raw| match raw.parse::<SetCookie>() {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                warn!("Skipping malformed Set-Cookie from backend: {}", e);
                None
            }
        })
        .collect()
}

/// Translate the backend response into the relay's response.
///
/// Upstream error statuses pass through; only relay-side problems become errors.
pub fn relay(upstream: UpstreamResponse) -> Result<RelayResponse> {
    let status = upstream.status;
    let content_type = upstream
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = match BodyKind::classify(status, content_type.as_deref(), &upstream.body) {
        BodyKind::Empty => RelayResponse::new(status),
        BodyKind::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(&upstream.body).map_err(|e| {
                    RelayError::InvalidUpstreamJson {
                        status: status.as_u16(),
                        raw: snippet(&upstream.body),
                        parse_error: e.to_string(),
                    }
                })?;
            RelayResponse::json(status, &value).map_err(|e| RelayError::InvalidUpstreamJson {
                status: status.as_u16(),
                raw: snippet(&upstream.body),
                parse_error: e.to_string(),
            })?
        }
        BodyKind::Unexpected => {
            return Err(RelayError::UnexpectedNonJson {
                status: status.as_u16(),
                content_type: content_type.unwrap_or_else(|| "none".to_string()),
                raw: snippet(&upstream.body),
            })
        }
        BodyKind::Passthrough => {
            let mut response = RelayResponse::new(status).body(upstream.body.clone());
            for name in [CONTENT_TYPE, CONTENT_DISPOSITION, CONTENT_ENCODING] {
                if let Some(value) = upstream.headers.get(&name) {
                    response.headers.insert(name, value.clone());
                }
            }
            response
        }
    };

    for name in [CACHE_CONTROL, LOCATION] {
        if let Some(value) = upstream.headers.get(&name) {
            response.headers.insert(name, value.clone());
        }
    }

    for cookie in upstream_cookies(&upstream.headers) {
        debug!("Relaying cookie '{}'", cookie.name);
        response.set_cookie(&cookie);
    }

    Ok(response)
}
