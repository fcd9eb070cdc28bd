//! Forwarding engine.
//!
//! One pass per request against a single config snapshot:
//! admission, backend resolution, outbound request, response relay.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::GatewayConfig;
use crate::http::error::ProxyError;
use crate::http::request::build_upstream_request;
use crate::http::response::relay;
use crate::routing::{self, ServicePath};
use crate::security::access_control;

/// Default bound on one attempt, from sending the request to the last
/// body frame.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Pooled HTTP/1.1 client used toward backends.
pub type HttpClient = Client<HttpConnector, Body>;

/// Forwards `/api/{service}/...` requests to backend services.
#[derive(Clone)]
pub struct ForwardingEngine {
    client: HttpClient,
    timeout: Duration,
}

impl ForwardingEngine {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    /// Forward one request for the service named in `path`.
    ///
    /// `config` must be the snapshot taken when the request arrived; it is
    /// used for every decision on this request.
    pub async fn forward(
        &self,
        config: &GatewayConfig,
        client: SocketAddr,
        path: &ServicePath,
        request: Request<Body>,
    ) -> Result<Response, ProxyError> {
        access_control::authorize(config, &path.service, request.headers(), client)?;

        let route = routing::resolve(config, &path.service)?;
        let upstream = route.upstream_uri(path)?;

        let (parts, body) = request.into_parts();
        tracing::info!(
            service = %route.service,
            method = %parts.method,
            path = %parts.uri.path(),
            upstream = %upstream,
            "Proxying request"
        );

        let outbound = build_upstream_request(parts, body, upstream, client);

        let deadline = time::Instant::now() + self.timeout;
        let pending = self.client.request(outbound);
        let response: hyper::Response<Incoming> = match time::timeout_at(deadline, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(ProxyError::UpstreamUnavailable(format!(
                    "request to {} failed: {e}",
                    route.origin
                )));
            }
            Err(_) => {
                return Err(ProxyError::UpstreamUnavailable(format!(
                    "no response from {} within {:?}",
                    route.origin, self.timeout
                )));
            }
        };

        Ok(relay(response, &route.service, deadline))
    }
}
