//! Configuration-driven API gateway.
//!
//! ```text
//!   client ──▶ /ping ─────────────────────────────▶ {"status","message"}
//!   client ──▶ /api/{service}/{rest} ──▶ admission ──▶ backend lookup ──▶ backend
//!                                         ▲                  ▲
//!                                         └── snapshot ──────┘
//!                                                 ▲
//!   config.yaml ──▶ fs events + mtime poll ──▶ ConfigStore
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::{ConfigStore, DEFAULT_POLL_INTERVAL};
use api_gateway::http::{HttpServer, DEFAULT_UPSTREAM_TIMEOUT};
use api_gateway::lifecycle::{wait_for_signal, Shutdown};
use api_gateway::observability::{logging, logging::LogFormat, metrics};

#[derive(Debug, Parser)]
#[command(name = "api-gateway", version, about = "Configuration-driven API gateway")]
struct Args {
    /// Path of the YAML configuration file.
    #[arg(long, env = "GATEWAY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Address the gateway listens on.
    #[arg(long, env = "GATEWAY_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Seconds allowed for one backend attempt, body included.
    #[arg(
        long,
        env = "GATEWAY_UPSTREAM_TIMEOUT_SECS",
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs()
    )]
    upstream_timeout_secs: u64,

    /// Seconds allowed for in-flight requests to drain on shutdown.
    #[arg(long, env = "GATEWAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    shutdown_timeout_secs: u64,

    /// Seconds between config modification-time checks.
    #[arg(
        long,
        env = "GATEWAY_POLL_INTERVAL_SECS",
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs()
    )]
    poll_interval_secs: u64,

    #[arg(long, env = "GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "GATEWAY_METRICS_ADDRESS")]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");

    if let Some(addr) = args.metrics_address {
        metrics::init_metrics(addr);
    }

    let store = ConfigStore::with_poll_interval(
        &args.config,
        Duration::from_secs(args.poll_interval_secs.max(1)),
    );
    store.start_watching()?;

    let listener = TcpListener::bind(args.bind).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        config = %args.config.display(),
        upstream_timeout_secs = args.upstream_timeout_secs,
        "Listening for connections"
    );

    let server = HttpServer::new(
        Arc::clone(&store),
        Duration::from_secs(args.upstream_timeout_secs),
    );
    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {}
        res = &mut server_task => {
            // The server only returns early on an accept-loop failure.
            store.stop().await?;
            res??;
            return Ok(());
        }
    }

    tracing::info!("Shutting down");
    if let Err(e) = store.stop().await {
        tracing::warn!(error = %e, "Failed to stop config watcher");
    }
    shutdown.trigger();

    let deadline = Duration::from_secs(args.shutdown_timeout_secs);
    match tokio::time::timeout(deadline, server_task).await {
        Ok(Ok(Ok(()))) => tracing::info!("Shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server failed during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task panicked"),
        Err(_) => tracing::warn!(
            deadline = ?deadline,
            "Shutdown deadline elapsed, dropping in-flight requests"
        ),
    }

    Ok(())
}
