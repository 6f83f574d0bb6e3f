//! The relay's own session cookie, issued on login and cleared on logout.

use crate::cookie::{SameSite, SetCookie};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Settings for the session cookie the relay issues itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cookie name, e.g. `crm_auth_token`.
    pub cookie_name: String,
    /// Lifetime of the cookie in days.
    pub max_age_days: u32,
    /// Forces `Secure` on or off. When unset, `Secure` follows the production flag.
    pub secure: Option<bool>,
    /// Present the session cookie to the backend as `Authorization: Bearer`.
    pub bearer_from_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "auth_token".to_string(),
            max_age_days: 7,
            secure: None,
            bearer_from_cookie: false,
        }
    }
}

impl SessionConfig {
    fn is_secure(&self, production: bool) -> bool {
        self.secure.unwrap_or(production)
    }

    /// The cookie that establishes a session for `token`.
    pub fn issue(&self, token: &str, production: bool) -> SetCookie {
        SetCookie::new(&self.cookie_name, token)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.is_secure(production))
            .max_age(i64::from(self.max_age_days) * SECONDS_PER_DAY)
    }

    /// The cookie that removes the session from the browser.
    pub fn clear(&self, production: bool) -> SetCookie {
        SetCookie::new(&self.cookie_name, "")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.is_secure(production))
            .max_age(0)
            .expires(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// The parts of a backend login response the relay understands.
#[derive(Debug, Default, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
}

impl LoginPayload {
    /// Extract a session token from a login response body.
    ///
    /// Looks at `token`, `access_token`, then `data.token`. Bodies of any other
    /// shape, or tokens that are not strings, yield `None`.
    pub fn token_from(body: &[u8]) -> Option<String> {
        let payload: LoginPayload = serde_json::from_slice(body).ok()?;
        payload
            .token
            .or(payload.access_token)
            .or(payload.data.and_then(|d| d.token))
            .filter(|t| !t.is_empty())
    }
}
