//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.yaml
//!     → loader.rs (read, parse, fill default messages)
//!     → store.rs (atomic swap of Arc<Snapshot>)
//!     → handlers take one snapshot per request
//!
//! On change:
//!     watcher.rs (fs event or mtime poll)
//!     → reload worker → ConfigStore::load
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a reload installs a whole new one
//! - All fields have defaults to allow minimal configs
//! - A failed reload keeps the last good snapshot

pub mod loader;
pub mod schema;
pub mod store;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{ApiKeyPolicy, BackendService, GatewayConfig, RequestIdPolicy};
pub use store::{ConfigStore, Snapshot, DEFAULT_POLL_INTERVAL};
