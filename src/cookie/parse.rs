//! Parsing a single `Set-Cookie` string.

use super::{CookieError, SameSite, SetCookie};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::str::FromStr;
use tracing::debug;

const TSPECIALS: &str = "()<>@,;:\\\"/[]?={} \t";

/// Parse an HTTP date as found in `Expires`.
///
/// Accepts the IMF-fixdate form plus the legacy RFC 850 and asctime forms.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    [
        "%a, %d-%b-%Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a %b %e %H:%M:%S %Y",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    .map(|naive| naive.and_utc())
}

impl FromStr for SetCookie {
    type Err = CookieError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(';');
        let pair = parts.next().unwrap_or_default().trim();

        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| CookieError::MissingPair(raw.trim().to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieError::EmptyName);
        }
        if name
            .chars()
            .any(|c| c.is_ascii_control() || !c.is_ascii() || TSPECIALS.contains(c))
        {
            return Err(CookieError::InvalidName(name.to_string()));
        }

        let mut cookie = SetCookie::new(name, value.trim());

        for attribute in parts {
            let attribute = attribute.trim();
            if attribute.is_empty() {
                continue;
            }
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attribute, ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "httponly" => cookie.http_only = true,
                "secure" => cookie.secure = true,
                "samesite" => cookie.same_site = SameSite::parse(val),
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "max-age" => match val.parse::<i64>() {
                    Ok(seconds) => cookie.max_age = Some(seconds),
                    Err(_) => debug!("Ignoring Max-Age '{}' on cookie '{}'", val, name),
                },
                "expires" => match parse_http_date(val) {
                    Some(at) => cookie.expires = Some(at),
                    None => debug!("Ignoring Expires '{}' on cookie '{}'", val, name),
                },
                "domain" if !val.is_empty() => {
                    cookie.domain = Some(val.trim_start_matches('.').to_string())
                }
                other => debug!("Ignoring cookie attribute '{}' on '{}'", other, name),
            }
        }

        Ok(cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_defaults() {
        let cookie: SetCookie = "laravel_session=abc123".parse().unwrap();
        assert_eq!(cookie.name, "laravel_session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.same_site, SameSite::Lax);
        assert!(!cookie.http_only);
        assert!(!cookie.secure);
        assert_eq!(cookie.max_age, None);
    }

    #[test]
    fn test_parse_all_attributes() {
        let cookie: SetCookie = "XSRF-TOKEN=ey%3D; expires=Wed, 21 Oct 2026 07:28:00 GMT; Max-Age=7200; path=/shop; domain=.backend.test; secure; httponly; samesite=strict"
            .parse()
            .unwrap();
        assert_eq!(cookie.name, "XSRF-TOKEN");
        assert_eq!(cookie.value, "ey%3D");
        assert_eq!(
            cookie.expires,
            Some(Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap())
        );
        assert_eq!(cookie.max_age, Some(7200));
        assert_eq!(cookie.path, "/shop");
        assert_eq!(cookie.domain.as_deref(), Some("backend.test"));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, SameSite::Strict);
    }

    #[test]
    fn test_parse_empty_value_is_allowed() {
        let cookie: SetCookie = "remember_me=; Max-Age=0".parse().unwrap();
        assert_eq!(cookie.value, "");
        assert_eq!(cookie.max_age, Some(0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "no-equals-sign; Path=/".parse::<SetCookie>(),
            Err(CookieError::MissingPair(_))
        ));
        assert_eq!("=value".parse::<SetCookie>(), Err(CookieError::EmptyName));
        assert!(matches!(
            "bad name=1".parse::<SetCookie>(),
            Err(CookieError::InvalidName(_))
        ));
    }

    #[test]
    fn test_parse_drops_bad_attributes_only() {
        let cookie: SetCookie = "a=1; Max-Age=soon; Expires=tomorrow; Path=relative"
            .parse()
            .unwrap();
        assert_eq!(cookie.max_age, None);
        assert_eq!(cookie.expires, None);
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn test_http_date_legacy_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_http_date("Wed, 21-Oct-2026 07:28:00 GMT"), Some(expected));
        assert_eq!(parse_http_date("Wed Oct 21 07:28:00 2026"), Some(expected));
        assert_eq!(parse_http_date("not a date"), None);
    }
}
