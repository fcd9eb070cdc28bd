//! Outbound request construction.
//!
//! - Same method, streamed body
//! - End-to-end headers copied; hop-by-hop and Host dropped
//! - X-Forwarded-* describe the inbound hop

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderValue, Request, Uri};

use crate::security::headers::{copy_end_to_end, set_forwarded_headers};

/// Host the caller addressed: the Host header, else the URI authority
/// (HTTP/2).
fn inbound_host(parts: &Parts) -> Option<HeaderValue> {
    parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
    })
}

/// Build the request sent to the backend at `upstream`.
///
/// The Host header is left for the client to derive from `upstream`.
pub fn build_upstream_request(
    parts: Parts,
    body: Body,
    upstream: Uri,
    client: SocketAddr,
) -> Request<Body> {
    let host = inbound_host(&parts);

    let mut request = Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = upstream;

    let headers = request.headers_mut();
    copy_end_to_end(&parts.headers, headers, |name| *name == header::HOST);
    set_forwarded_headers(headers, client, host.as_ref());

    request
}
