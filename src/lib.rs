//! # api-relay - backend-for-frontend HTTP relay
//!
//! `api-relay` sits on the same origin as a browser application and forwards its
//! `/api/...` calls to a session-based backend hosted elsewhere. Cookies travel both
//! ways, so the browser's session with the relay authenticates against the backend
//! without cross-origin cookie blocking.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  /api/proxy/shop/cart   ┌──────────────────────┐  /api/shop/cart  ┌─────────┐
//! │ Browser  │ ──────────────────────▶ │      api-relay       │ ───────────────▶ │ Backend │
//! │          │ ◀────────────────────── │ path · body · cookie │ ◀─────────────── │   API   │
//! └──────────┘   JSON + Set-Cookie     └──────────────────────┘  JSON + cookies  └─────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use api_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ProxyConfig::new()
//!         .port(3000)
//!         .backend_url("https://api.shop.test");
//!
//!     RelayServer::new(config)?.run().await
//! }
//! ```
//!
//! ## Routes
//!
//! - `ANY /api/proxy/<segments>` and `ANY /api/<segments>` forward to `<backend>/api/<segments>`.
//! - `POST /api/login` also issues the relay's session cookie when the backend returns a token.
//! - `POST /api/logout` always clears the session cookie.
//! - `GET /_health` answers `OK`.
//!
//! Every failure the relay detects itself is reported as `{ "error", "message" }` JSON.
//! Backend error statuses pass through untouched.

pub mod cookie;
pub mod http;
pub mod relay;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::cookie::{SameSite, SetCookie};
    pub use crate::http::{Method, RelayRequest, RelayResponse, StatusCode};
    pub use crate::relay::{
        ErrorEnvelope, HttpUpstream, Relay, RelayContext, RelayError, SessionConfig, Upstream,
        UpstreamRequest, UpstreamResponse,
    };
    pub use crate::runtime::{ConfigError, ProxyConfig, RelayServer};
    pub use async_trait::async_trait;
}

// Re-export for convenience
pub use http::{RelayRequest, RelayResponse};
pub use relay::{Relay, RelayContext, RelayError};
pub use runtime::{ProxyConfig, RelayServer};
