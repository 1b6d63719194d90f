//! # Execution
//!
//! Per-run mutable state shared between the scheduling loop and in-flight steps.

pub mod context;

pub use context::{ContextError, ExecutionContext};
