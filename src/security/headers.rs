//! Header manipulation for the forwarding path.
//!
//! - Strip hop-by-hop headers in both directions
//! - Set X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host

use std::net::SocketAddr;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

static PROTO_HTTP: HeaderValue = HeaderValue::from_static("http");

/// Headers meaningful for a single transport hop only.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Case-insensitive hop-by-hop check.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Copy every end-to-end header from `src` into `dst`, keeping repeated
/// values. Names rejected by `skip` are left out as well.
pub fn copy_end_to_end(src: &HeaderMap, dst: &mut HeaderMap, skip: impl Fn(&HeaderName) -> bool) {
    for (name, value) in src {
        if is_hop_by_hop(name.as_str()) || skip(name) {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
}

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Replace the X-Forwarded-* headers with values describing this hop.
pub fn set_forwarded_headers(
    headers: &mut HeaderMap,
    client: SocketAddr,
    host: Option<&HeaderValue>,
) {
    match HeaderValue::from_str(&client.ip().to_string()) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
        Err(e) => tracing::warn!(client = %client, error = %e, "Failed to encode X-Forwarded-For"),
    }
    headers.insert(X_FORWARDED_PROTO.clone(), PROTO_HTTP.clone());
    match host {
        Some(host) => {
            headers.insert(X_FORWARDED_HOST.clone(), host.clone());
        }
        None => {
            headers.remove(&X_FORWARDED_HOST);
        }
    }
}
