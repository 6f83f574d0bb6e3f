//! Relay configuration.

use crate::relay::error::Result as RelayResult;
use crate::relay::path::resolve_base;
use crate::relay::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Configuration for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Public backend base URL, e.g. `https://api.shop.test`.
    pub backend_url: Option<String>,
    /// Internal-only backend URL used for login and logout, when set.
    pub internal_backend_url: Option<String>,
    /// Fall back to `http://127.0.0.1:8000` when no backend URL is set.
    pub local_fallback: bool,
    /// Running in production (`APP_ENV=production`).
    pub production: bool,
    /// The session cookie the relay issues on login.
    pub session: SessionConfig,
    /// Whether to serve `/_health`.
    pub enable_health: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            backend_url: None,
            internal_backend_url: None,
            local_fallback: true,
            production: false,
            session: SessionConfig::default(),
            enable_health: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl ProxyConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Read configuration from a set of variables.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.production = get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        config.local_fallback = !config.production;

        if let Some(host) = get("RELAY_HOST") {
            config.host = host;
        }
        if let Some(port) = get("RELAY_PORT") {
            config.port = parse_value("RELAY_PORT", &port)?;
        }
        config.backend_url = get("BACKEND_URL");
        config.internal_backend_url = get("INTERNAL_BACKEND_URL");
        if let Some(fallback) = get("RELAY_LOCAL_FALLBACK") {
            config.local_fallback = parse_bool("RELAY_LOCAL_FALLBACK", &fallback)?;
        }
        if let Some(limit) = get("RELAY_MAX_BODY_BYTES") {
            config.max_body_size = parse_value("RELAY_MAX_BODY_BYTES", &limit)?;
        }

        if let Some(name) = get("SESSION_COOKIE_NAME") {
            config.session.cookie_name = name;
        }
        if let Some(days) = get("SESSION_MAX_AGE_DAYS") {
            config.session.max_age_days = parse_value("SESSION_MAX_AGE_DAYS", &days)?;
        }
        if let Some(secure) = get("SESSION_COOKIE_SECURE") {
            config.session.secure = Some(parse_bool("SESSION_COOKIE_SECURE", &secure)?);
        }
        if let Some(bearer) = get("SESSION_BEARER") {
            config.session.bearer_from_cookie = parse_bool("SESSION_BEARER", &bearer)?;
        }

        Ok(config)
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the public backend URL.
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Set the internal backend URL used for login and logout.
    pub fn internal_backend_url(mut self, url: impl Into<String>) -> Self {
        self.internal_backend_url = Some(url.into());
        self
    }

    /// Enable or disable the local development fallback.
    pub fn local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = enabled;
        self
    }

    /// Mark the deployment as production.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Replace the session cookie settings.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the maximum request body size.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The backend base URL for forwarded API calls.
    pub fn backend(&self) -> RelayResult<String> {
        resolve_base(self.backend_url.as_deref(), self.local_fallback)
    }

    /// The backend base URL for login and logout.
    pub fn auth_backend(&self) -> RelayResult<String> {
        match self.internal_backend_url.as_deref() {
            Some(internal) if !internal.trim().is_empty() => resolve_base(Some(internal), false),
            _ => self.backend(),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
