//! Header policy resolution.
//!
//! # Precedence
//! ```text
//! global override_service_settings = true  → global flag, always
//! else service entry with explicit setting → that setting
//! else                                     → global flag
//! ```
//!
//! All functions are pure over a [`GatewayConfig`](crate::config::GatewayConfig)
//! snapshot.

pub mod resolver;

pub use resolver::{
    api_key_error_message, is_valid_api_key, request_id_error_message, should_require_api_key,
    should_require_request_id,
};
