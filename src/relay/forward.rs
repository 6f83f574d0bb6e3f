//! Turning a browser request into the equivalent backend request.

use crate::cookie::request_cookie_header;
use crate::http::RelayRequest;
use crate::relay::error::{RelayError, Result};
use crate::relay::upstream::UpstreamRequest;
use bytes::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, COOKIE,
};
use tracing::debug;

const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "proxy-connection",
];

/// How a request body travels to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardBody {
    Empty,
    /// `multipart/form-data`, forwarded byte-for-byte.
    Multipart(Bytes),
    /// Parsed and re-serialized JSON.
    Json(Bytes),
    /// Not JSON; forwarded unchanged.
    Raw(Bytes),
}

impl ForwardBody {
    /// Classify a body by its inbound content type and contents.
    pub fn negotiate(content_type: Option<&str>, body: Option<Bytes>) -> Self {
        let body = match body {
            Some(body) if !body.is_empty() => body,
            _ => return ForwardBody::Empty,
        };

        let is_multipart = content_type
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);
        if is_multipart {
            return ForwardBody::Multipart(body);
        }

        match serde_json::from_slice::<serde_json::Value>(&body)
            .and_then(|value| serde_json::to_vec(&value))
        {
            Ok(json) => ForwardBody::Json(Bytes::from(json)),
            Err(e) => {
                debug!("Forwarding non-JSON body unchanged: {}", e);
                ForwardBody::Raw(body)
            }
        }
    }

    fn into_bytes(self) -> Option<Bytes> {
        match self {
            ForwardBody::Empty => None,
            ForwardBody::Multipart(b) | ForwardBody::Json(b) | ForwardBody::Raw(b) => Some(b),
        }
    }
}

/// Whether an inbound header is copied onto the backend request.
///
/// `Cookie` is excluded because it is rebuilt from every inbound cookie header.
/// `Accept-Encoding` is excluded so the backend answers with an identity body the
/// relay can inspect.
pub fn should_forward_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    name != "host"
        && name != "content-length"
        && name != ACCEPT_ENCODING.as_str()
        && name != COOKIE.as_str()
        && !name.starts_with("proxy-")
        && !HOP_BY_HOP.contains(&name)
}

/// Build the backend request for `request`, addressed at `url`.
///
/// `bearer` is a session token to present as `Authorization: Bearer` when the browser
/// sent no `Authorization` header of its own.
pub fn prepare(
    request: RelayRequest,
    url: String,
    bearer: Option<&str>,
    max_body_size: usize,
) -> Result<UpstreamRequest> {
    if !request.method.is_forwardable() {
        return Err(RelayError::MethodNotAllowed(request.method.to_string()));
    }

    let size = request.body.as_ref().map(|b| b.len()).unwrap_or(0);
    if size > max_body_size {
        return Err(RelayError::PayloadTooLarge {
            size,
            limit: max_body_size,
        });
    }

    let mut headers = HeaderMap::new();
    for (name, value) in request.headers.iter() {
        if should_forward_header(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    if let Some(cookies) = request_cookie_header(&request.headers) {
        if let Ok(value) = HeaderValue::from_str(&cookies) {
            headers.insert(COOKIE, value);
        }
    }

    if let Some(token) = bearer {
        if !headers.contains_key(AUTHORIZATION) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
    }

    let body = ForwardBody::negotiate(request.content_type(), request.body.clone());
    match &body {
        ForwardBody::Json(_) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        ForwardBody::Raw(_) if !headers.contains_key(CONTENT_TYPE) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        }
        _ => {}
    }

    Ok(UpstreamRequest {
        method: request.method,
        url,
        headers,
        body: body.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    const URL: &str = "http://backend/api/x";

    #[test]
    fn test_json_body_is_reserialized() {
        let body = ForwardBody::negotiate(
            Some("text/plain"),
            Some(Bytes::from_static(b"{ \"b\": 2,\n  \"a\": 1 }")),
        );
        assert_eq!(body, ForwardBody::Json(Bytes::from_static(br#"{"b":2,"a":1}"#)));
    }

    #[test]
    fn test_multipart_is_untouched() {
        let raw = Bytes::from_static(b"--xyz\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\n{}\r\n--xyz--");
        let body = ForwardBody::negotiate(Some("multipart/form-data; boundary=xyz"), Some(raw.clone()));
        assert_eq!(body, ForwardBody::Multipart(raw));
    }

    #[test]
    fn test_non_json_is_raw() {
        let body = ForwardBody::negotiate(None, Some(Bytes::from_static(b"a=1&b=2")));
        assert_eq!(body, ForwardBody::Raw(Bytes::from_static(b"a=1&b=2")));
        assert_eq!(ForwardBody::negotiate(None, Some(Bytes::new())), ForwardBody::Empty);
    }

    #[test]
    fn test_prepare_builds_cookie_and_json_headers() {
        let request = RelayRequest::new(Method::Post, "/api/cart")
            .header("Cookie", "laravel_session=abc")
            .header("Cookie", "XSRF-TOKEN=x")
            .header("Host", "shop.test")
            .header("Connection", "keep-alive")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Accept", "application/json")
            .body(r#"{"sku":"A1","qty":2}"#);

        let upstream = prepare(request, URL.to_string(), None, 1024).unwrap();

        assert_eq!(upstream.headers[COOKIE], "laravel_session=abc; XSRF-TOKEN=x");
        assert_eq!(upstream.headers[CONTENT_TYPE], "application/json");
        assert_eq!(upstream.headers["accept"], "application/json");
        assert!(!upstream.headers.contains_key("host"));
        assert!(!upstream.headers.contains_key("connection"));
        assert!(!upstream.headers.contains_key(ACCEPT_ENCODING));
        assert_eq!(upstream.body.unwrap(), Bytes::from_static(br#"{"sku":"A1","qty":2}"#));
    }

    #[test]
    fn test_raw_body_keeps_inbound_content_type() {
        let request = RelayRequest::new(Method::Put, "/api/note")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("a=1");
        let upstream = prepare(request, URL.to_string(), None, 1024).unwrap();
        assert_eq!(upstream.headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(upstream.body.unwrap(), Bytes::from_static(b"a=1"));
    }

    #[test]
    fn test_bearer_only_when_no_authorization() {
        let request = RelayRequest::new(Method::Get, "/api/me");
        let upstream = prepare(request, URL.to_string(), Some("t0k"), 1024).unwrap();
        assert_eq!(upstream.headers[AUTHORIZATION], "Bearer t0k");

        let request = RelayRequest::new(Method::Get, "/api/me").header("Authorization", "Basic Zm9v");
        let upstream = prepare(request, URL.to_string(), Some("t0k"), 1024).unwrap();
        assert_eq!(upstream.headers[AUTHORIZATION], "Basic Zm9v");
    }

    #[test]
    fn test_rejects_unsupported_method() {
        let request = RelayRequest::new(Method::Options, "/api/x");
        assert_eq!(
            prepare(request, URL.to_string(), None, 1024).unwrap_err(),
            RelayError::MethodNotAllowed("OPTIONS".to_string())
        );
    }

    #[test]
    fn test_rejects_oversized_body() {
        let request = RelayRequest::new(Method::Post, "/api/x").body(vec![b'x'; 11]);
        assert_eq!(
            prepare(request, URL.to_string(), None, 10).unwrap_err(),
            RelayError::PayloadTooLarge { size: 11, limit: 10 }
        );
    }
}
