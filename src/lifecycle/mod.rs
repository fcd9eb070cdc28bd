//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse args → Init logging → Open config store → Start watching → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop config watcher → Stop accepting → Drain (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Config problems never prevent startup; the store serves defaults
//! - Shutdown has a deadline: in-flight requests are abandoned after it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
