//! # Run Coordinator
//!
//! The single scheduling loop behind a run. It exclusively owns the run's
//! [`RunState`]; step tasks never touch it and instead report over a channel.
//! Each pass of the loop:
//!
//! 1. Applies a cancellation if one has been requested, or else recomputes readiness and
//!    dispatches every Ready step (the engine-wide semaphore bounds how many
//!    actually execute at once)
//! 2. Stops once every step is terminal and no step task is outstanding
//! 3. Waits for a step message, a cancellation request, or a backoff timer
//!
//! Every change is pushed to the progress sink and published as a fresh
//! [`RunState`] snapshot for pollers.

use super::backoff::BackoffCalculator;
use super::readiness::{self, Readiness};
use super::run_finalizer::RunFinalizer;
use super::step_executor::StepExecutor;
use super::types::{RunState, StepMessage, StepOutcome};
use crate::config::EngineConfig;
use crate::error::{StepError, StepErrorDetail};
use crate::events::{ProgressSink, RunTransition, StepTransition};
use crate::execution::ExecutionContext;
use crate::graph::RunGraph;
use crate::logging::{log_run_operation, log_step_operation};
use crate::registry::CancellationSignal;
use crate::state_machine::{RunEvent, StepEvent, StepRunStatus};
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub(crate) struct RunCoordinator {
    run_id: Uuid,
    graph: Arc<RunGraph>,
    context: Arc<ExecutionContext>,
    config: Arc<EngineConfig>,
    sink: Arc<dyn ProgressSink>,
    state: RunState,
    state_tx: watch::Sender<RunState>,
    executor: StepExecutor,
    rx: mpsc::UnboundedReceiver<StepMessage>,
    cancel_signal: CancellationSignal,
    backoff: BackoffCalculator,
    /// Steps waiting out a retry delay
    not_before: HashMap<usize, Instant>,
    /// Steps with a spawned task that has not reported `Finished`
    in_flight: HashSet<usize>,
    cancel_requested: bool,
    internal_error: Option<String>,
}

impl RunCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Arc<RunGraph>,
        context: Arc<ExecutionContext>,
        config: Arc<EngineConfig>,
        sink: Arc<dyn ProgressSink>,
        state: RunState,
        state_tx: watch::Sender<RunState>,
        executor: StepExecutor,
        rx: mpsc::UnboundedReceiver<StepMessage>,
    ) -> Self {
        let backoff = BackoffCalculator::new(config.backoff.clone());
        let cancel_signal = executor.signal.clone();
        Self {
            run_id: state.run_id,
            graph,
            context,
            config,
            sink,
            state,
            state_tx,
            executor,
            rx,
            cancel_signal,
            backoff,
            not_before: HashMap::new(),
            in_flight: HashSet::new(),
            cancel_requested: false,
            internal_error: None,
        }
    }

    /// Drive the run to a terminal status
    pub async fn run(mut self) {
        log_run_operation("start", self.run_id, "running", None);
        self.transition_run(RunEvent::Start);

        loop {
            if !self.cancel_requested && self.cancel_signal.is_cancelled() {
                debug!(run_id = %self.run_id, "Cancellation requested");
                self.cancel_requested = true;
            }
            if self.cancel_requested {
                self.cancel_outstanding();
            } else {
                self.schedule();
            }

            if self.in_flight.is_empty() {
                if self.state.all_steps_terminal() {
                    break;
                }
                if self.not_before.is_empty() {
                    self.handle_stall();
                    break;
                }
            }

            let next_wakeup = self.not_before.values().min().copied();

            tokio::select! {
                biased;
                _ = self.cancel_signal.cancelled(), if !self.cancel_requested => {
                    debug!(run_id = %self.run_id, "Cancellation requested");
                    self.cancel_requested = true;
                }
                message = self.rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        self.record_internal_error("step message channel closed");
                        self.handle_stall();
                        break;
                    }
                },
                _ = tokio::time::sleep_until(next_wakeup.unwrap_or_else(Instant::now)), if next_wakeup.is_some() => {}
            }
        }

        self.finalize();
    }

    /// Enqueue and dispatch Ready steps, skip steps that can never run
    fn schedule(&mut self) {
        let now = Instant::now();
        self.not_before.retain(|_, wake_at| *wake_at > now);

        let graph = Arc::clone(&self.graph);
        let mut statuses = self.state.step_statuses();

        for &index in graph.topological_indices() {
            if statuses[index] != StepRunStatus::Pending || self.not_before.contains_key(&index) {
                continue;
            }

            let context = &self.context;
            match readiness::evaluate(&graph, &statuses, index, |id| context.has_result(id)) {
                Readiness::Waiting => {}
                Readiness::Ready => {
                    if self.transition_step(index, StepEvent::Enqueue, None) {
                        statuses[index] = StepRunStatus::Ready;
                        self.dispatch(index);
                    }
                }
                Readiness::Skip(detail) => {
                    if self.transition_step(index, StepEvent::Skip(detail), None) {
                        statuses[index] = StepRunStatus::Skipped;
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, index: usize) {
        let declaration = &self.graph.nodes()[index].declaration;
        let timeout = self.config.effective_timeout(declaration.timeout);
        self.in_flight.insert(index);
        self.executor.spawn(index, timeout);
    }

    fn handle_message(&mut self, message: StepMessage) {
        match message {
            StepMessage::Started { index } => {
                if self.state.steps[index].status != StepRunStatus::Ready {
                    debug!(run_id = %self.run_id, index, "Ignoring start of a step that is no longer ready");
                    return;
                }
                if self.transition_step(index, StepEvent::Start, None) {
                    self.state.steps_dispatched += 1;
                    self.publish_state();
                }
            }
            StepMessage::Finished { index, outcome } => {
                self.in_flight.remove(&index);
                if self.state.steps[index].status != StepRunStatus::Running {
                    return;
                }
                if self.cancel_requested {
                    self.transition_step(index, StepEvent::Cancel, None);
                    return;
                }
                match outcome {
                    StepOutcome::Succeeded(value) => self.complete_step(index, value),
                    StepOutcome::Failed(err) => self.fail_step(index, err),
                }
            }
        }
    }

    fn complete_step(&mut self, index: usize, value: Value) {
        let declaration = &self.graph.nodes()[index].declaration;
        let persisted = declaration.persist_result.then(|| value.clone());

        if let Err(e) = self.context.record_result(&declaration.id, value) {
            let message = e.to_string();
            self.record_internal_error(&message);
            self.transition_step(index, StepEvent::FailFatal(StepErrorDetail::internal(message)), None);
            return;
        }
        self.transition_step(index, StepEvent::Complete, persisted);
    }

    /// Retry while attempts remain, otherwise settle on the exhaustion status
    fn fail_step(&mut self, index: usize, err: StepError) {
        let step = &self.state.steps[index];
        let detail = err.detail();

        let event = if matches!(err, StepError::Cancelled) {
            StepEvent::Cancel
        } else if err.is_retryable() && step.has_attempts_remaining() {
            let delay = self.backoff.delay_for_attempt(step.attempts);
            if !delay.is_zero() {
                self.not_before.insert(index, Instant::now() + delay);
            }
            debug!(
                run_id = %self.run_id,
                step_id = %step.step_id,
                attempt = step.attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying step"
            );
            StepEvent::Retry(detail)
        } else if step.optional {
            StepEvent::FailOptional(detail)
        } else if matches!(err, StepError::Timeout { .. }) {
            StepEvent::TimeOut(detail)
        } else {
            StepEvent::FailFatal(detail)
        };

        self.transition_step(index, event, None);
    }

    /// Cancel every step without an outstanding task. Running steps are
    /// cancelled when their task reports back.
    fn cancel_outstanding(&mut self) {
        self.not_before.clear();
        for index in 0..self.state.steps.len() {
            let status = self.state.steps[index].status;
            if matches!(status, StepRunStatus::Pending | StepRunStatus::Ready) {
                self.transition_step(index, StepEvent::Cancel, None);
            }
        }
    }

    /// Nothing in flight, nothing waiting, yet steps remain: a scheduling bug.
    /// Skip what is left so the run still terminates.
    fn handle_stall(&mut self) {
        self.record_internal_error("scheduler stalled with non-terminal steps remaining");
        for index in 0..self.state.steps.len() {
            if self.state.steps[index].status == StepRunStatus::Pending {
                let detail = StepErrorDetail::internal("run aborted: scheduler stalled");
                self.transition_step(index, StepEvent::Skip(detail), None);
            }
        }
    }

    fn finalize(&mut self) {
        let event = RunFinalizer::determine_outcome(
            &self.state.steps,
            self.cancel_requested,
            self.internal_error.as_deref(),
        );
        self.transition_run(event);

        log_run_operation(
            "finish",
            self.run_id,
            &self.state.status.to_string(),
            self.state.error.as_deref(),
        );
    }

    fn record_internal_error(&mut self, message: &str) {
        error!(run_id = %self.run_id, error = %message, "Internal orchestration error");
        self.internal_error.get_or_insert_with(|| message.to_string());
    }

    /// Apply `event` to the step at `index` and tell observers. Returns false
    /// if the state machine rejected the event.
    fn transition_step(&mut self, index: usize, event: StepEvent, result: Option<Value>) -> bool {
        let step = &mut self.state.steps[index];
        let from = match step.apply(&event) {
            Ok(from) => from,
            Err(e) => {
                let message = format!("step '{}': {e}", step.step_id);
                self.record_internal_error(&message);
                return false;
            }
        };

        let transition = StepTransition {
            run_id: self.run_id,
            step_id: step.step_id.clone(),
            from,
            to: step.status,
            attempt: step.attempts,
            error: event.error_detail().cloned(),
            result,
            occurred_at: Utc::now(),
        };

        if transition.to.is_terminal() {
            log_step_operation(
                "finish",
                self.run_id,
                &step.step_id,
                Some(&step.unit_name),
                &transition.to.to_string(),
                transition.error.as_ref().map(|e| e.message.as_str()),
            );
        }

        if let Err(e) = self.sink.on_step_transition(&transition) {
            warn!(run_id = %self.run_id, step_id = %transition.step_id, error = %e, "Progress sink rejected step transition");
        }
        self.publish_state();
        true
    }

    fn transition_run(&mut self, event: RunEvent) {
        let from = match self.state.apply(&event) {
            Ok(from) => from,
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Rejected run transition");
                return;
            }
        };

        let transition = RunTransition {
            run_id: self.run_id,
            from,
            to: self.state.status,
            error: self.state.error.clone(),
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.sink.on_run_transition(&transition) {
            warn!(run_id = %self.run_id, error = %e, "Progress sink rejected run transition");
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
