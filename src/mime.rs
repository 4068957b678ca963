//! Media-type matching for content negotiation.
//!
//! Patterns are media-type essences with an optional `*` on either side of
//! the slash: `text/html`, `text/*`, `*/json`, or a bare `*`. Matching is
//! case-insensitive and ignores parameters such as `charset`.

/// The essence of a media-type header value: the part before the first
/// `;`, trimmed and lower-cased.
#[must_use]
pub fn essence(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// The `charset` parameter of a media-type header value, if present.
#[must_use]
pub fn charset(value: &str) -> Option<&str> {
    for param in value.split(';').skip(1) {
        if let Some((key, val)) = param.split_once('=')
            && key.trim().eq_ignore_ascii_case("charset")
        {
            return Some(val.trim().trim_matches('"'));
        }
    }
    None
}

/// Whether `value` matches `pattern`.
///
/// Both sides are reduced to their essence first, so parameters on either
/// never affect the outcome.
#[must_use]
pub fn matches(pattern: &str, value: &str) -> bool {
    let pattern = essence(pattern);
    let value = essence(value);
    if pattern == "*" {
        return true;
    }
    match (pattern.split_once('/'), value.split_once('/')) {
        (Some((pt, ps)), Some((vt, vs))) => {
            (pt == "*" || pt == vt) && (ps == "*" || ps == vs)
        }
        _ => pattern == value,
    }
}

/// Pick the first of `offered` acceptable to an `accept` header value.
///
/// Accepted patterns are tried in the order they appear in the header; a
/// missing or empty header accepts anything, yielding the first offer.
#[must_use]
pub fn accept<'a>(header: Option<&str>, offered: &[&'a str]) -> Option<&'a str> {
    let header = match header {
        Some(h) if !h.trim().is_empty() => h,
        _ => return offered.first().copied(),
    };
    for accepted in header.split(',') {
        for offer in offered {
            if matches(accepted, offer) {
                return Some(offer);
            }
        }
    }
    None
}
