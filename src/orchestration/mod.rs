//! # Orchestration
//!
//! The scheduler that turns a validated [`RunGraph`](crate::graph::RunGraph)
//! into executed steps: readiness, dispatch, retry/optional policy, cancellation
//! and run finalization.

pub mod backoff;
pub mod engine;
pub mod readiness;
pub mod run_finalizer;
pub mod types;

mod run_coordinator;
mod step_executor;

pub use backoff::BackoffCalculator;
pub use engine::{OrchestrationEngine, OrchestrationEngineBuilder};
pub use readiness::Readiness;
pub use run_finalizer::RunFinalizer;
pub use types::{RunState, StepOutcome, StepRunState};
