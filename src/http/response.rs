//! Outbound response type produced by the relay.

use crate::cookie::SetCookie;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

/// Response sent back to the browser.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// HTTP headers. `Set-Cookie` may appear more than once.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RelayResponse {
    /// Create an empty response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create an empty OK response.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create a response with a JSON body.
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        Ok(Self::new(status)
            .header("content-type", "application/json")
            .body(body))
    }

    /// Create a plain text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self::ok()
            .header("content-type", "text/plain")
            .body(content.into())
    }

    /// Set a header, replacing any existing value. Invalid names or values are ignored.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!("Dropping invalid response header {}", key),
        }
        self
    }

    /// Append a `Set-Cookie` header for `cookie`.
    pub fn set_cookie(&mut self, cookie: &SetCookie) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                self.headers.append(SET_COOKIE, value);
            }
            Err(_) => warn!("Dropping cookie '{}' with unencodable value", cookie.name),
        }
    }

    /// Set the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// All `Set-Cookie` header values, in emission order.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Get the body as text.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the body as JSON.
    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Convert into a hyper response.
    pub fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for RelayResponse {
    fn default() -> Self {
        Self::ok()
    }
}
