//! Configuration-driven API gateway library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;
pub mod routing;
pub mod security;

pub use config::{ConfigStore, GatewayConfig};
pub use http::{ForwardingEngine, HttpServer};
pub use lifecycle::Shutdown;
