//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (x-request-id, then x-api-key, per policy)
//!     → headers.rs (strip hop-by-hop, set X-Forwarded-*)
//!     → Forward
//!
//! Backend response:
//!     → headers.rs (strip hop-by-hop)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected check ends the request
//! - Inbound X-Forwarded-* values are replaced, never extended

pub mod access_control;
pub mod headers;
