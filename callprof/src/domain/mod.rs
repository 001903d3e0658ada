//! Domain model for callprof
//!
//! This module contains core domain types and errors that provide:
//! - Stable identities for instrumented call sites
//! - Self-documenting call-boundary events
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{CallEvent, CodeLocation, EventKind, FunctionIdentity, MAIN_SCOPE};

pub use errors::{ExportError, ProfilerError};
