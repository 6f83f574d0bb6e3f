//! Mapping relay paths onto backend URLs.

use crate::relay::error::{RelayError, Result};

/// Backend used during local development when no URL is configured.
pub const LOCAL_FALLBACK_BACKEND: &str = "http://127.0.0.1:8000";

/// Inbound prefixes served by the relay, longest first.
pub const MOUNTS: [&str; 2] = ["/api/proxy", "/api"];

/// Pick the backend base URL, validating its scheme and trimming any trailing `/`.
pub fn resolve_base(configured: Option<&str>, local_fallback: bool) -> Result<String> {
    let base = match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => url,
        None if local_fallback => LOCAL_FALLBACK_BACKEND,
        None => return Err(RelayError::MissingBackend),
    };

    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(RelayError::InvalidBackend(base.to_string()));
    }

    Ok(base.trim_end_matches('/').to_string())
}

/// Strip the relay mount from `path`, returning the remaining non-empty segments.
///
/// Returns `None` when the path is not under any mount, or when a segment would
/// climb out of the backend's `/api` prefix.
pub fn route_segments(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = MOUNTS.iter().find_map(|mount| {
        let rest = path.strip_prefix(mount)?;
        if !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }
        Some(rest.split('/').filter(|s| !s.is_empty()).collect())
    })?;

    if segments.iter().any(|s| is_dot_segment(s)) {
        return None;
    }
    Some(segments)
}

/// Whether `segment` is `.` or `..` once `%2e` is decoded. URL parsers treat `\` as
/// a separator in http(s) paths, so each backslash-delimited part is checked too.
fn is_dot_segment(segment: &str) -> bool {
    segment.split('\\').any(|part| {
        let decoded = part.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Build `<base>/api/<segments>?<query>`.
pub fn upstream_url(base: &str, segments: &[&str], query: Option<&str>) -> String {
    let mut url = format!("{}/api", base.trim_end_matches('/'));
    for segment in segments {
        url.push('/');
        url.push_str(segment);
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}
