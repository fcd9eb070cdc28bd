//! Backend lookup for a decomposed request path.

use axum::http::Uri;
use url::Url;

use crate::config::schema::{BackendService, GatewayConfig};
use crate::http::error::ProxyError;
use crate::routing::matcher::ServicePath;

/// An enabled backend with a usable origin.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub service: String,
    pub origin: Url,
}

/// Look up an enabled backend by name and validate its URL.
pub fn resolve(config: &GatewayConfig, service: &str) -> Result<ResolvedRoute, ProxyError> {
    let backend = config
        .find_enabled_service(service)
        .ok_or_else(|| ProxyError::ServiceNotFound(service.to_string()))?;

    Ok(ResolvedRoute {
        service: backend.name.clone(),
        origin: parse_origin(backend)?,
    })
}

fn parse_origin(backend: &BackendService) -> Result<Url, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidBackendUrl {
        service: backend.name.clone(),
        url: backend.url.clone(),
        reason,
    };

    let url = Url::parse(&backend.url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.has_host() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

impl ResolvedRoute {
    /// Backend origin joined with the inbound path and query. Any path on
    /// the configured URL is replaced. Path and query are passed on as
    /// received, without re-encoding or dot-segment removal.
    pub fn upstream_uri(&self, path: &ServicePath) -> Result<Uri, ProxyError> {
        let path_and_query = match &path.query {
            Some(query) => format!("{}?{query}", path.forward_path),
            None => path.forward_path.clone(),
        };

        Uri::builder()
            .scheme(self.origin.scheme())
            .authority(authority(&self.origin))
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ProxyError::InvalidBackendUrl {
                service: self.service.clone(),
                url: self.origin.to_string(),
                reason: e.to_string(),
            })
    }
}

/// `host[:port]` of a validated origin. Credentials are not forwarded.
fn authority(origin: &Url) -> String {
    let host = origin.host_str().unwrap_or_default();
    match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
