//! Per-request error taxonomy and its HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body returned for the 401 on a wrong key.
pub const INVALID_API_KEY: &str = "Invalid API key";

/// Terminal rejection of a single gateway request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed path or missing required header. Carries the body text.
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Service '{0}' not found or disabled")]
    ServiceNotFound(String),

    /// The configured backend URL cannot be used. Not the caller's fault.
    #[error("invalid URL {url:?} for service '{service}': {reason}")]
    InvalidBackendUrl {
        service: String,
        url: String,
        reason: String,
    },

    /// Connection failure or timeout toward the backend.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ProxyError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidBackendUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Text sent to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::InvalidBackendUrl { .. } => "Internal server error".to_string(),
            ProxyError::UpstreamUnavailable(_) => "Service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.public_message()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
