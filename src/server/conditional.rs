//! Response validators for the playlist API.

use md5::{Digest, Md5};

/// Weak ETag over a response body: `W/"<md5 hex>"`.
pub fn compute_etag(body: &[u8]) -> String {
    format!("W/\"{}\"", hex::encode(Md5::digest(body)))
}

fn opaque_tag(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Weak comparison of an `If-None-Match` header value against `etag`.
///
/// Accepts `*` and comma-separated lists; `W/` prefixes are ignored on both
/// sides.
pub fn if_none_match(header: &str, etag: &str) -> bool {
    let header = header.trim();
    if header == "*" {
        return true;
    }
    let ours = opaque_tag(etag);
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| !candidate.is_empty() && opaque_tag(candidate) == ours)
}
