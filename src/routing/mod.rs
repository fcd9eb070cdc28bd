//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request URI
//!     → matcher.rs (decompose /api/{service}/{rest...})
//!     → router.rs (enabled backend lookup in the current snapshot)
//!     → Return: upstream URI, or NotFound / InvalidBackendUrl
//! ```
//!
//! # Design Decisions
//! - No route table: the service name in the path is the only key
//! - First enabled entry with the name wins
//! - The backend URL contributes scheme and authority only; the path
//!   and query come from the inbound request

pub mod matcher;
pub mod router;

pub use matcher::ServicePath;
pub use router::{resolve, ResolvedRoute};
