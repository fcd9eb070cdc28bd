//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, snapshot per request)
//!     → proxy.rs (admission, backend resolution, timeout)
//!     → request.rs (outbound method, headers, streamed body)
//!     → backend
//!     → response.rs (strip hop-by-hop, stream body back)
//!     → Send to client
//! ```

pub mod error;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use proxy::{ForwardingEngine, DEFAULT_UPSTREAM_TIMEOUT};
pub use server::HttpServer;
