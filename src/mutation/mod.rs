//! Optimistic mutation pipeline for state-changing operations.
//!
//! - `context`: snapshot/rollback holder for one in-flight mutation
//! - `pipeline`: send, create, rename, delete, and upload mutations

pub mod context;
pub mod pipeline;

pub use context::MutationContext;
pub use pipeline::MutationPipeline;
