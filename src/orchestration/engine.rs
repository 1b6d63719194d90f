//! # Orchestration Engine
//!
//! The run control surface. Each started run gets its own scheduling loop on a
//! tokio task; all runs share one concurrency ceiling, one step runner and one
//! set of progress sinks.
//!
//! ```rust,no_run
//! use hunt_core::models::StepDeclaration;
//! use hunt_core::orchestration::OrchestrationEngine;
//! use hunt_core::registry::UnitRegistry;
//! use hunt_core::resolution::StepParameters;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> hunt_core::HuntResult<()> {
//! let registry = Arc::new(UnitRegistry::new());
//! registry.register_fn("dns_lookup", |_| async move { Ok(json!({"records": ["10.0.0.1"]})) });
//! registry.register_fn("port_scan", |p| async move { Ok(json!({"target": p["host"]})) });
//!
//! let engine = OrchestrationEngine::builder(registry).build()?;
//!
//! let mut initial = StepParameters::new();
//! initial.insert("domain".into(), json!("example.com"));
//!
//! let run_id = engine
//!     .start_run(
//!         vec![
//!             StepDeclaration::new("dns", "dns_lookup").map_parameter("domain", "initial.domain"),
//!             StepDeclaration::new("scan", "port_scan")
//!                 .depends_on("dns")
//!                 .map_parameter("host", "dns.records[0]"),
//!         ],
//!         initial,
//!     )
//!     .await?;
//!
//! let final_state = engine.wait_for_run(run_id).await?;
//! println!("run finished: {}", final_state.status);
//! # Ok(())
//! # }
//! ```

use super::run_coordinator::RunCoordinator;
use super::step_executor::StepExecutor;
use super::types::RunState;
use crate::config::EngineConfig;
use crate::error::{HuntError, HuntResult};
use crate::events::{CompositeProgressSink, EventPublisher, ProgressEvent, ProgressSink};
use crate::execution::ExecutionContext;
use crate::graph::RunGraph;
use crate::models::{RunDefinition, StepDeclaration};
use crate::registry::{CancellationHandle, StepRunner};
use crate::resolution::StepParameters;
use crate::state_machine::RunStatus;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tracing::info;
use uuid::Uuid;

/// Bookkeeping the engine keeps for each run it has started
struct RunHandle {
    state: watch::Receiver<RunState>,
    context: Arc<ExecutionContext>,
    cancel: CancellationHandle,
}

pub struct OrchestrationEngineBuilder {
    runner: Arc<dyn StepRunner>,
    config: EngineConfig,
    sinks: CompositeProgressSink,
    trace_transitions: bool,
}

impl OrchestrationEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add an observer of step and run transitions
    pub fn sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks = self.sinks.with_sink(sink);
        self
    }

    /// Log every transition through `tracing` (on by default)
    pub fn trace_transitions(mut self, enabled: bool) -> Self {
        self.trace_transitions = enabled;
        self
    }

    pub fn build(self) -> HuntResult<OrchestrationEngine> {
        self.config.validate()?;

        let publisher = EventPublisher::new(self.config.event_channel_capacity);
        let mut sinks = CompositeProgressSink::new().with_sink(Arc::new(publisher.clone()));
        if self.trace_transitions {
            sinks = sinks.with_sink(Arc::new(crate::events::TracingProgressSink));
        }
        if !self.sinks.is_empty() {
            sinks = sinks.with_sink(Arc::new(self.sinks));
        }

        info!(
            max_concurrent_steps = self.config.max_concurrent_steps,
            default_step_timeout_ms = self.config.default_step_timeout_ms,
            "Orchestration engine initialized"
        );

        Ok(OrchestrationEngine {
            semaphore: Arc::new(Semaphore::new(self.config.max_concurrent_steps)),
            config: Arc::new(self.config),
            runner: self.runner,
            sink: Arc::new(sinks),
            publisher,
            runs: DashMap::new(),
        })
    }
}

pub struct OrchestrationEngine {
    config: Arc<EngineConfig>,
    runner: Arc<dyn StepRunner>,
    sink: Arc<dyn ProgressSink>,
    publisher: EventPublisher,
    semaphore: Arc<Semaphore>,
    runs: DashMap<Uuid, RunHandle>,
}

impl OrchestrationEngine {
    pub fn builder(runner: Arc<dyn StepRunner>) -> OrchestrationEngineBuilder {
        OrchestrationEngineBuilder {
            runner,
            config: EngineConfig::default(),
            sinks: CompositeProgressSink::new(),
            trace_transitions: true,
        }
    }

    /// Engine with default configuration and no extra sinks
    pub fn new(runner: Arc<dyn StepRunner>) -> HuntResult<Self> {
        Self::builder(runner).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the declarations and start executing them. Validation failures
    /// are returned here and no step runs.
    pub async fn start_run(
        &self,
        declarations: Vec<StepDeclaration>,
        initial_parameters: StepParameters,
    ) -> HuntResult<Uuid> {
        let graph = Arc::new(RunGraph::build(declarations)?);
        let run_id = Uuid::new_v4();

        let context = Arc::new(ExecutionContext::new(initial_parameters));
        let cancel = CancellationHandle::new();
        let state = RunState::new(run_id, &graph);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        let executor = StepExecutor {
            run_id,
            graph: Arc::clone(&graph),
            context: Arc::clone(&context),
            runner: Arc::clone(&self.runner),
            semaphore: Arc::clone(&self.semaphore),
            signal: cancel.signal(),
            cancellation_grace_period: self.config.cancellation_grace_period(),
            tx,
        };

        let coordinator = RunCoordinator::new(
            graph,
            Arc::clone(&context),
            Arc::clone(&self.config),
            Arc::clone(&self.sink),
            state,
            state_tx,
            executor,
            rx,
        );

        self.runs.insert(
            run_id,
            RunHandle {
                state: state_rx,
                context,
                cancel,
            },
        );
        tokio::spawn(coordinator.run());

        Ok(run_id)
    }

    /// Start a run from a loaded definition
    pub async fn start_definition(
        &self,
        definition: &RunDefinition,
        initial_parameters: StepParameters,
    ) -> HuntResult<Uuid> {
        info!(definition = %definition.name, steps = definition.steps.len(), "Starting run from definition");
        self.start_run(definition.steps.clone(), initial_parameters).await
    }

    /// Request cancellation. Returns false if the run had already finished or
    /// was already being cancelled.
    pub fn cancel_run(&self, run_id: Uuid) -> HuntResult<bool> {
        let handle = self.handle(run_id)?;
        if handle.state.borrow().is_terminal() {
            return Ok(false);
        }
        let first = handle.cancel.cancel();
        if first {
            info!(run_id = %run_id, "Run cancellation requested");
        }
        Ok(first)
    }

    /// Latest snapshot of the run's state
    pub fn get_run_state(&self, run_id: Uuid) -> HuntResult<RunState> {
        Ok(self.handle(run_id)?.state.borrow().clone())
    }

    /// Receiver that sees every new snapshot of the run's state
    pub fn watch_run(&self, run_id: Uuid) -> HuntResult<watch::Receiver<RunState>> {
        Ok(self.handle(run_id)?.state.clone())
    }

    /// Wait until the run reaches a terminal status and return its final state
    pub async fn wait_for_run(&self, run_id: Uuid) -> HuntResult<RunState> {
        let mut rx = self.watch_run(run_id)?;
        let state = rx
            .wait_for(RunState::is_terminal)
            .await
            .map_err(|_| HuntError::Internal(format!("scheduling loop for run {run_id} exited early")))?;
        Ok(state.clone())
    }

    /// Recorded output of a step, if it succeeded
    pub fn get_step_result(&self, run_id: Uuid, step_id: &str) -> HuntResult<Option<Arc<Value>>> {
        Ok(self.handle(run_id)?.context.get_result(step_id))
    }

    pub fn list_runs(&self) -> Vec<(Uuid, RunStatus)> {
        self.runs
            .iter()
            .map(|entry| (*entry.key(), entry.value().state.borrow().status))
            .collect()
    }

    /// Forget a finished run, returning its final state
    pub fn remove_run(&self, run_id: Uuid) -> HuntResult<RunState> {
        let status = self.handle(run_id)?.state.borrow().status;
        if !status.is_terminal() {
            return Err(HuntError::RunStillActive {
                run_id,
                status: status.to_string(),
            });
        }
        let (_, handle) = self
            .runs
            .remove(&run_id)
            .ok_or(HuntError::RunNotFound { run_id })?;
        let state = handle.state.borrow().clone();
        Ok(state)
    }

    /// Stream of progress events for every run on this engine
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.publisher.subscribe()
    }

    fn handle(
        &self,
        run_id: Uuid,
    ) -> HuntResult<dashmap::mapref::one::Ref<'_, Uuid, RunHandle>> {
        self.runs.get(&run_id).ok_or(HuntError::RunNotFound { run_id })
    }
}
