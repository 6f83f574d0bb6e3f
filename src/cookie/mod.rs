//! Cookie codec shared by every relay route.
//!
//! The relay touches cookies in two directions:
//!
//! - **Inbound**: every `Cookie` header the browser sent is folded into a single
//!   `Cookie` header for the backend ([`request_cookie_header`]).
//! - **Outbound**: each `Set-Cookie` the backend emitted is split out of the header
//!   map ([`split_set_cookie`]), parsed into a [`SetCookie`], and re-serialized onto
//!   the browser response without its `Domain` attribute.

mod parse;
mod split;

use chrono::{DateTime, Utc};
use hyper::header::{HeaderMap, COOKIE};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use parse::parse_http_date;
pub use split::{set_cookie_values, split_set_cookie};

/// Errors produced while parsing a single `Set-Cookie` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("cookie has no name=value pair: {0}")]
    MissingPair(String),

    #[error("cookie name is empty")]
    EmptyName,

    #[error("cookie name contains forbidden characters: {0}")]
    InvalidName(String),
}

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Parse an attribute value case-insensitively. Unknown values fall back to `Lax`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// A parsed `Set-Cookie` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    /// Seconds. Zero or negative expires the cookie immediately.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    /// Parsed for inspection only; never serialized.
    pub domain: Option<String>,
}

impl SetCookie {
    /// Create a cookie with the relay defaults (`Path=/`, `SameSite=Lax`).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            http_only: false,
            secure: false,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: None,
            expires: None,
            domain: None,
        }
    }

    /// Set the `HttpOnly` flag.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the `Secure` flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `SameSite` policy.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Set the cookie path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set `Max-Age` in seconds.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Set an absolute `Expires` time.
    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        write!(f, "; SameSite={}", self.same_site)
    }
}

/// Fold every inbound `Cookie` header into one `name=value; name=value` string.
///
/// Returns `None` when the browser sent no usable cookie pairs.
pub fn request_cookie_header(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Look up a single inbound cookie by name.
pub fn request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}
