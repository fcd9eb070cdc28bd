//! Path decomposition for `/api/{service}/{rest...}`.
//!
//! Matching works on the raw (still percent-encoded) path so the rest
//! of the path reaches the backend byte for byte.

use axum::http::Uri;

use crate::http::error::ProxyError;

/// Prefix every proxied path must carry.
pub const API_PREFIX: &str = "/api/";

/// Service name and backend target extracted from an inbound URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePath {
    pub service: String,
    /// Path sent to the backend, always starting with `/`.
    pub forward_path: String,
    /// Raw query string, if a non-empty one was present.
    pub query: Option<String>,
}

impl ServicePath {
    pub fn parse(uri: &Uri) -> Result<Self, ProxyError> {
        let rest = uri
            .path()
            .strip_prefix(API_PREFIX)
            .ok_or_else(|| ProxyError::BadRequest("Invalid path format".to_string()))?;

        let (service, tail) = rest.split_once('/').unwrap_or((rest, ""));
        if service.is_empty() {
            return Err(ProxyError::BadRequest("Service name is required".to_string()));
        }

        Ok(Self {
            service: service.to_string(),
            forward_path: format!("/{tail}"),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }
}
