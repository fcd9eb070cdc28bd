//! Admission control.
//!
//! Enforces the header policy resolved for the target service. The
//! request-id check runs before the API key check.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderValue};

use crate::config::schema::GatewayConfig;
use crate::http::error::ProxyError;
use crate::policy;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_API_KEY: &str = "x-api-key";

/// Header value, treating an empty value as absent.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a HeaderValue> {
    headers.get(name).filter(|v| !v.is_empty())
}

/// Admit or reject a request for `service`.
pub fn authorize(
    config: &GatewayConfig,
    service: &str,
    headers: &HeaderMap,
    client: SocketAddr,
) -> Result<(), ProxyError> {
    if policy::should_require_request_id(config, service)
        && header(headers, X_REQUEST_ID).is_none()
    {
        tracing::warn!(
            service = %service,
            client = %client,
            "Request rejected: missing x-request-id header"
        );
        return Err(ProxyError::BadRequest(
            policy::request_id_error_message(config).to_string(),
        ));
    }

    if policy::should_require_api_key(config, service) {
        let Some(key) = header(headers, X_API_KEY) else {
            tracing::warn!(
                service = %service,
                client = %client,
                "Request rejected: missing x-api-key header"
            );
            return Err(ProxyError::BadRequest(
                policy::api_key_error_message(config).to_string(),
            ));
        };

        // Values that are not visible ASCII can never match.
        let valid = key
            .to_str()
            .map(|key| policy::is_valid_api_key(config, key))
            .unwrap_or(false);
        if !valid {
            tracing::warn!(
                service = %service,
                client = %client,
                "Request rejected: invalid x-api-key"
            );
            return Err(ProxyError::InvalidApiKey);
        }
    }

    Ok(())
}
