//! Separating individual `Set-Cookie` strings.

use hyper::header::{HeaderMap, SET_COOKIE};

/// Collect the `Set-Cookie` strings carried by an upstream header map.
///
/// Several header values are taken as-is. A single value may be a comma-joined list
/// produced by an intermediary, so it goes through [`split_set_cookie`].
pub fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    let values: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    match values.as_slice() {
        [] => Vec::new(),
        [single] => split_set_cookie(single),
        many => many.iter().map(|v| v.trim().to_string()).collect(),
    }
}

/// Split a comma-joined `Set-Cookie` header into individual cookie strings.
///
/// A comma separates cookies unless it follows the weekday of an `Expires=` date,
/// as in `Expires=Wed, 21 Oct 2026 07:28:00 GMT`.
pub fn split_set_cookie(header: &str) -> Vec<String> {
    let mut cookies = Vec::new();
    let mut current = String::new();
    // Byte offset in `current` where the active Expires value starts.
    let mut expires_at: Option<usize> = None;

    for c in header.chars() {
        match c {
            ',' => {
                let in_weekday = expires_at
                    .map(|start| {
                        let token = current[start..].trim();
                        !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
                    })
                    .unwrap_or(false);

                if in_weekday {
                    current.push(c);
                } else {
                    push_cookie(&mut cookies, &current);
                    current.clear();
                    expires_at = None;
                }
            }
            ';' => {
                expires_at = None;
                current.push(c);
            }
            '=' => {
                let opens_expires = ends_with_attribute(&current, "expires");
                current.push(c);
                if opens_expires {
                    expires_at = Some(current.len());
                }
            }
            _ => current.push(c),
        }
    }
    push_cookie(&mut cookies, &current);

    cookies
}

fn push_cookie(cookies: &mut Vec<String>, raw: &str) {
    let raw = raw.trim();
    if !raw.is_empty() {
        cookies.push(raw.to_string());
    }
}

/// Whether `current` ends with the attribute name `attr` following a `;`.
fn ends_with_attribute(current: &str, attr: &str) -> bool {
    let trimmed = current.trim_end();
    let bytes = trimmed.as_bytes();
    if bytes.len() < attr.len() {
        return false;
    }
    let (head, tail) = bytes.split_at(bytes.len() - attr.len());
    tail.eq_ignore_ascii_case(attr.as_bytes())
        && head
            .iter()
            .rev()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b';')
}
