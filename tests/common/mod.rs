//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::ConfigStore;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the echo backend saw.
#[derive(Debug, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

async fn echo(request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();

    let echo = serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });

    (
        [
            ("keep-alive", "timeout=5"),
            ("proxy-authenticate", "Basic realm=\"backend\""),
            ("x-backend", "echo"),
        ],
        axum::Json(echo),
    )
        .into_response()
}

/// Start a backend that answers every request with a JSON [`Echo`] of it.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, Router::new().fallback(echo)).await;
    });
    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start a backend that sends a response head and part of the promised
/// body, then keeps the connection open without writing more.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .await;
            held.push(socket);
        }
    });
    addr
}

/// A gateway serving a config file in its own temp directory.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: Arc<ConfigStore>,
    shutdown: Shutdown,
    dir: TempDir,
}

impl TestGateway {
    pub async fn start(yaml: &str) -> Self {
        Self::start_with_timeout(yaml, Duration::from_secs(5)).await
    }

    pub async fn start_with_timeout(yaml: &str, upstream_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();

        let store = ConfigStore::with_poll_interval(&path, Duration::from_millis(100));
        let server = HttpServer::new(Arc::clone(&store), upstream_timeout);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        Self {
            addr,
            store,
            shutdown,
            dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    pub fn rewrite_config(&self, yaml: &str) {
        write_config(&self.config_path(), yaml);
    }

    pub async fn stop(self) {
        self.store.stop().await.unwrap();
        self.shutdown.trigger();
    }
}

pub fn write_config(path: &Path, yaml: &str) {
    std::fs::write(path, yaml).unwrap();
}

/// Single-service config pointing `name` at `backend`.
pub fn service_config(name: &str, backend: SocketAddr) -> String {
    format!(
        "message: test\nbackend_services:\n  - name: {name}\n    \
         url: http://{backend}\n    enabled: true\n"
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
