//! Policy resolution over a configuration snapshot.

use crate::config::schema::{
    BackendService, GatewayConfig, DEFAULT_API_KEY_ERROR, DEFAULT_REQUEST_ID_ERROR,
};

/// Resolve a requirement through the override hierarchy.
///
/// The service lookup ignores `enabled`: a disabled entry still
/// carries its overrides.
fn resolve(
    config: &GatewayConfig,
    service: &str,
    global: bool,
    override_services: bool,
    per_service: impl Fn(&BackendService) -> Option<bool>,
) -> bool {
    if override_services {
        return global;
    }
    config
        .find_service(service)
        .and_then(per_service)
        .unwrap_or(global)
}

/// Whether requests to `service` must carry `x-request-id`.
pub fn should_require_request_id(config: &GatewayConfig, service: &str) -> bool {
    let policy = &config.request_id;
    resolve(
        config,
        service,
        policy.require_request_id,
        policy.override_service_settings,
        |s| s.require_request_id,
    )
}

/// Whether requests to `service` must carry `x-api-key`.
pub fn should_require_api_key(config: &GatewayConfig, service: &str) -> bool {
    let policy = &config.api_key;
    resolve(
        config,
        service,
        policy.require_api_key,
        policy.override_service_settings,
        |s| s.require_api_key,
    )
}

/// Whether `provided` matches the configured key. An empty configured
/// key rejects everything.
pub fn is_valid_api_key(config: &GatewayConfig, provided: &str) -> bool {
    let expected = config.api_key.api_key.as_bytes();
    !expected.is_empty() && constant_time_eq(expected, provided.as_bytes())
}

/// Byte comparison whose running time does not depend on where the
/// inputs first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn request_id_error_message(config: &GatewayConfig) -> &str {
    non_empty_or(&config.request_id.error_message, DEFAULT_REQUEST_ID_ERROR)
}

pub fn api_key_error_message(config: &GatewayConfig) -> &str {
    non_empty_or(&config.api_key.error_message, DEFAULT_API_KEY_ERROR)
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
