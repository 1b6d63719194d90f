//! # Parameter Resolution
//!
//! The addressing language that wires step outputs into later step inputs.
//! [`ValuePath`] is the parsed form of an address, [`PathResolver`] evaluates it
//! against any [`ValueSource`] (in practice the run's `ExecutionContext`).

pub mod path;
pub mod resolver;

pub use path::{Accessor, PathRoot, PathSyntaxError, ValuePath, INITIAL_ROOT};
pub use resolver::{walk, PathResolutionError, PathResolver, StepParameters, ValueSource};
