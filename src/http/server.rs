//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: `/ping` and `/api/...`
//! - Wire up middleware (tracing, request timeout, panic recovery)
//! - Take a config snapshot per request and hand it to the forwarding engine
//! - Serve until the shutdown signal, then drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ConfigStore;
use crate::http::error::ProxyError;
use crate::http::proxy::ForwardingEngine;
use crate::observability::metrics;
use crate::routing::ServicePath;

/// Bound on producing the response head. Relayed bodies are bounded by
/// the upstream deadline instead.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub engine: ForwardingEngine,
}

/// Body of `GET /ping`.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub message: String,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(store: Arc<ConfigStore>, upstream_timeout: Duration) -> Self {
        let state = AppState {
            store,
            engine: ForwardingEngine::new(upstream_timeout),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/ping", get(ping_handler))
            .route("/api/{*rest}", any(proxy_handler))
            .route("/api/", any(proxy_handler))
            .route("/api", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(DEFAULT_REQUEST_TIMEOUT))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn ping_handler(State(state): State<AppState>) -> Json<PingResponse> {
    let snapshot = state.store.current();
    Json(PingResponse {
        status: "ok",
        message: snapshot.config.ping_message().to_string(),
    })
}

/// Gateway handler. The snapshot loaded here is the only configuration
/// this request sees, whatever reloads happen meanwhile.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let snapshot = state.store.current();

    let path = match ServicePath::parse(request.uri()) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), error = %e, "Rejected malformed path");
            metrics::record_request(&method, e.status().as_u16(), "none", start);
            return e.into_response();
        }
    };

    // Unknown names share one label.
    let service = match snapshot.config.find_service(&path.service) {
        Some(s) => s.name.as_str(),
        None => "unknown",
    };

    let response = match state
        .engine
        .forward(&snapshot.config, client, &path, request)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            log_failure(&path, &e);
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), service, start);
    response
}

fn log_failure(path: &ServicePath, err: &ProxyError) {
    match err {
        ProxyError::InvalidBackendUrl { .. } | ProxyError::UpstreamUnavailable(_) => {
            tracing::error!(service = %path.service, error = %err, "Forwarding failed");
        }
        ProxyError::ServiceNotFound(_) => {
            tracing::debug!(service = %path.service, "Service not found or disabled");
        }
        // Admission rejections are logged where they are decided.
        ProxyError::BadRequest(_) | ProxyError::InvalidApiKey => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server_for(yaml: &str) -> (tempfile::TempDir, HttpServer) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        let store = ConfigStore::open(&path);
        (dir, HttpServer::new(store, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_ping_returns_configured_message() {
        let (_dir, server) = server_for("message: hello\n");

        let response = server
            .router()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["message"], "hello");
    }

    #[tokio::test]
    async fn test_ping_defaults_to_pong() {
        let (_dir, server) = server_for("");

        let response = server
            .router()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "pong");
    }
}
