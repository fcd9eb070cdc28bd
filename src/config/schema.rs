//! Configuration schema definitions.
//!
//! This module defines the gateway configuration file structure.
//! All types derive Serde traits for deserialization from YAML.

use serde::{Deserialize, Serialize};

/// Message returned by `/ping` when none is configured.
pub const DEFAULT_PING_MESSAGE: &str = "pong";

/// Rejection message used when `request_id.error_message` is empty.
pub const DEFAULT_REQUEST_ID_ERROR: &str = "Missing required x-request-id header";

/// Rejection message used when `api_key.error_message` is empty.
pub const DEFAULT_API_KEY_ERROR: &str = "Missing required x-api-key header";

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Message echoed by the ping endpoint.
    pub message: String,

    /// Global `x-request-id` enforcement.
    pub request_id: RequestIdPolicy,

    /// Global `x-api-key` enforcement.
    pub api_key: ApiKeyPolicy,

    /// Backend services, in lookup order.
    pub backend_services: Vec<BackendService>,
}

/// Global policy for the `x-request-id` header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RequestIdPolicy {
    /// Default requirement for services without an explicit setting.
    pub require_request_id: bool,

    /// When set, `require_request_id` applies to every service and
    /// per-service settings are ignored.
    pub override_service_settings: bool,

    /// Body of the 400 response when the header is missing.
    pub error_message: String,
}

/// Global policy for the `x-api-key` header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiKeyPolicy {
    /// The accepted key. An empty key never validates.
    pub api_key: String,

    /// Default requirement for services without an explicit setting.
    pub require_api_key: bool,

    /// When set, `require_api_key` applies to every service.
    pub override_service_settings: bool,

    /// Body of the 400 response when the header is missing.
    pub error_message: String,
}

/// A named upstream the gateway forwards `/api/{name}/...` to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackendService {
    /// Service name used in the request path.
    pub name: String,

    /// Absolute base URL (e.g., "http://localhost:9001").
    pub url: String,

    /// Disabled services are never forwarded to.
    pub enabled: bool,

    /// `None` inherits the global request-id default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_request_id: Option<bool>,

    /// `None` inherits the global API key default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_api_key: Option<bool>,
}

impl GatewayConfig {
    /// Fill empty error messages with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.request_id.error_message.is_empty() {
            self.request_id.error_message = DEFAULT_REQUEST_ID_ERROR.to_string();
        }
        if self.api_key.error_message.is_empty() {
            self.api_key.error_message = DEFAULT_API_KEY_ERROR.to_string();
        }
        self
    }

    /// Message for the ping endpoint.
    pub fn ping_message(&self) -> &str {
        if self.message.is_empty() {
            DEFAULT_PING_MESSAGE
        } else {
            &self.message
        }
    }

    /// First service with the given name, enabled or not.
    ///
    /// Policy resolution uses this: a disabled entry still carries its
    /// per-service overrides.
    pub fn find_service(&self, name: &str) -> Option<&BackendService> {
        self.backend_services.iter().find(|s| s.name == name)
    }

    /// First enabled service with the given name.
    pub fn find_enabled_service(&self, name: &str) -> Option<&BackendService> {
        self.backend_services
            .iter()
            .find(|s| s.name == name && s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
message: hello
request_id:
  require_request_id: true
  override_service_settings: false
  error_message: need an id
api_key:
  api_key: secret
  require_api_key: false
  override_service_settings: true
  error_message: ""
backend_services:
  - name: billing
    url: http://localhost:9001
    enabled: true
    require_request_id: false
  - name: users
    url: http://localhost:9002
    enabled: false
    require_api_key: true
"#;

    #[test]
    fn test_parse_full_document() {
        let config: GatewayConfig = serde_yaml::from_str(FULL).unwrap();

        assert_eq!(config.message, "hello");
        assert!(config.request_id.require_request_id);
        assert_eq!(config.request_id.error_message, "need an id");
        assert_eq!(config.api_key.api_key, "secret");
        assert!(config.api_key.override_service_settings);
        assert_eq!(config.backend_services.len(), 2);
        assert_eq!(config.backend_services[0].url, "http://localhost:9001");
    }

    #[test]
    fn test_per_service_flags_are_tri_state() {
        let config: GatewayConfig = serde_yaml::from_str(FULL).unwrap();

        let billing = &config.backend_services[0];
        assert_eq!(billing.require_request_id, Some(false));
        assert_eq!(billing.require_api_key, None);

        let users = &config.backend_services[1];
        assert_eq!(users.require_request_id, None);
        assert_eq!(users.require_api_key, Some(true));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: GatewayConfig =
            serde_yaml::from_str("backend_services:\n  - name: a\n").unwrap();

        assert_eq!(config.message, "");
        assert!(!config.request_id.require_request_id);
        assert!(!config.backend_services[0].enabled);
        assert_eq!(config.backend_services[0].url, "");
    }

    #[test]
    fn test_with_defaults_fills_only_empty_messages() {
        let config: GatewayConfig = serde_yaml::from_str(FULL).unwrap();
        let config = config.with_defaults();

        assert_eq!(config.request_id.error_message, "need an id");
        assert_eq!(config.api_key.error_message, DEFAULT_API_KEY_ERROR);
    }

    #[test]
    fn test_ping_message_default() {
        assert_eq!(GatewayConfig::default().ping_message(), "pong");

        let config = GatewayConfig {
            message: "hi".into(),
            ..Default::default()
        };
        assert_eq!(config.ping_message(), "hi");
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let config = GatewayConfig {
            backend_services: vec![
                BackendService {
                    name: "svc".into(),
                    url: "http://first".into(),
                    enabled: false,
                    ..Default::default()
                },
                BackendService {
                    name: "svc".into(),
                    url: "http://second".into(),
                    enabled: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(config.find_service("svc").unwrap().url, "http://first");
        assert_eq!(config.find_enabled_service("svc").unwrap().url, "http://second");
        assert!(config.find_service("other").is_none());
    }

    #[test]
    fn test_disabled_service_is_invisible_to_enabled_lookup() {
        let config: GatewayConfig = serde_yaml::from_str(FULL).unwrap();

        assert!(config.find_service("users").is_some());
        assert!(config.find_enabled_service("users").is_none());
    }
}
