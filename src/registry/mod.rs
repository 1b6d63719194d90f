//! # Registry Infrastructure
//!
//! Where step declarations meet executable code. A step names its unit by
//! `unit_name`; the [`UnitRegistry`] maps that name to an [`AnalysisUnit`] and
//! exposes the whole set to the engine as a [`StepRunner`].
//!
//! ```text
//! StepDeclaration.unit_name ──► UnitRegistry (StepRunner) ──► AnalysisUnit::run
//! ```

pub mod step_runner;
pub mod unit_registry;

// Re-export main types for easy access
pub use step_runner::{CancellationHandle, CancellationSignal, StepRunner};
pub use unit_registry::{AnalysisUnit, FnUnit, UnitRegistry};
