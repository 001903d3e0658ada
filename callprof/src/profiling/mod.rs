//! Profiling core modules
//!
//! The two concurrent halves of a session:
//! - Call tracing on the instrumented thread
//! - Resource sampling on a background thread
//! - Process CPU/memory probing used by the sampler

pub mod resource;
pub mod sampler;
pub mod tracer;

// Re-export common types
pub use resource::{ProcessProbe, ResourceProbe, ResourceReading};
pub use sampler::{Sample, Sampler, SamplerConfig, SamplerHandle, SamplerOutput};
pub use tracer::{ScopeGuard, Tracer};
