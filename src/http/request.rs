//! Inbound request type seen by the relay.

use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// HTTP method enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Whether the relay forwards this method to the backend.
    pub fn is_forwardable(&self) -> bool {
        matches!(
            self,
            Method::Get | Method::Post | Method::Put | Method::Patch | Method::Delete
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
            Method::Patch => write!(f, "PATCH"),
            Method::Head => write!(f, "HEAD"),
            Method::Options => write!(f, "OPTIONS"),
        }
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = String;

    fn try_from(method: &hyper::Method) -> Result<Self, Self::Error> {
        match *method {
            hyper::Method::GET => Ok(Method::Get),
            hyper::Method::POST => Ok(Method::Post),
            hyper::Method::PUT => Ok(Method::Put),
            hyper::Method::DELETE => Ok(Method::Delete),
            hyper::Method::PATCH => Ok(Method::Patch),
            hyper::Method::HEAD => Ok(Method::Head),
            hyper::Method::OPTIONS => Ok(Method::Options),
            ref other => Err(other.to_string()),
        }
    }
}

impl From<Method> for hyper::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => hyper::Method::GET,
            Method::Post => hyper::Method::POST,
            Method::Put => hyper::Method::PUT,
            Method::Delete => hyper::Method::DELETE,
            Method::Patch => hyper::Method::PATCH,
            Method::Head => hyper::Method::HEAD,
            Method::Options => hyper::Method::OPTIONS,
        }
    }
}

/// A browser request addressed to one of the relay's routes.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Raw query string, forwarded verbatim.
    pub query: Option<String>,
    /// HTTP headers. `Cookie` may appear more than once.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl RelayRequest {
    /// Create a new request for `path`. A `?query` suffix is split off.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Append a header to the request. Invalid names or values are ignored.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

impl Default for RelayRequest {
    fn default() -> Self {
        Self::new(Method::Get, "/")
    }
}
