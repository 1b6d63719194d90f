//! # Graph Builder
//!
//! Turns an ordered list of step declarations into a validated, read-only
//! dependency graph. A run whose declarations fail validation never starts.

pub mod errors;
pub mod run_graph;

pub use errors::GraphValidationError;
pub use run_graph::{RunGraph, StepNode};
