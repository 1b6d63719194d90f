#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Hunt Core
//!
//! Dependency-ordered orchestrator for multi-step investigation runs ("hunts").
//!
//! ## Overview
//!
//! A run is a set of step declarations. Each step invokes one opaque analysis
//! unit, may depend on other steps, and wires its inputs from the run's initial
//! parameters or from earlier step outputs using dot-path addresses such as
//! `dns_records.results[0].records[0]`. The engine validates the dependency
//! graph, executes independent steps concurrently under an engine-wide ceiling,
//! applies per-step timeout, retry and optional-failure policy, and drives the
//! run to a terminal status.
//!
//! ## Module Organization
//!
//! - [`models`] - Step declarations and run definitions
//! - [`graph`] - Graph Builder: validation and the read-only run graph
//! - [`resolution`] - Path Resolver: address parsing and value lookup
//! - [`execution`] - Per-run execution context (initial parameters and results)
//! - [`state_machine`] - Step and run status transition tables
//! - [`orchestration`] - Scheduling loop and run control surface
//! - [`registry`] - Step runner contract and the analysis unit registry
//! - [`events`] - Progress sinks and the broadcast event publisher
//! - [`config`] - Engine configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hunt_core::{OrchestrationEngine, StepDeclaration, StepParameters, UnitRegistry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> hunt_core::HuntResult<()> {
//! hunt_core::logging::init_structured_logging();
//!
//! let registry = Arc::new(UnitRegistry::new());
//! registry.register_fn("whois", |p| async move { Ok(json!({"domain": p["domain"]})) });
//!
//! let engine = OrchestrationEngine::new(registry)?;
//! let mut initial = StepParameters::new();
//! initial.insert("domain".into(), json!("example.com"));
//!
//! let run_id = engine
//!     .start_run(
//!         vec![StepDeclaration::new("whois", "whois").map_parameter("domain", "initial.domain")],
//!         initial,
//!     )
//!     .await?;
//! let state = engine.wait_for_run(run_id).await?;
//! assert!(state.is_terminal());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod execution;
pub mod graph;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resolution;
pub mod state_machine;
pub mod utils;

pub use config::{BackoffConfig, ConfigLoader, EngineConfig};
pub use error::{AdapterError, HuntError, HuntResult, StepError, StepErrorDetail, StepErrorKind};
pub use events::{ProgressEvent, ProgressSink, RunTransition, StepTransition};
pub use execution::ExecutionContext;
pub use graph::{GraphValidationError, RunGraph};
pub use models::{RunDefinition, StepDeclaration};
pub use orchestration::{OrchestrationEngine, RunState, StepRunState};
pub use registry::{CancellationSignal, StepRunner, UnitRegistry};
pub use resolution::{PathResolutionError, PathResolver, StepParameters, ValuePath};
pub use state_machine::{RunStatus, StepRunStatus};
