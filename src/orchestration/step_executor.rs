//! # Step Executor
//!
//! Runs one attempt of one step on its own task and reports back to the
//! scheduling loop. Each attempt goes through the same phases:
//!
//! 1. Wait for an engine-wide concurrency permit (or for cancellation)
//! 2. Report `Started`
//! 3. Resolve the step's parameters against the execution context
//! 4. Invoke the step runner under the step's deadline
//! 5. Report `Finished` with the outcome
//!
//! Cancellation is checked before every phase, so a unit is never invoked
//! once the run has been cancelled. A cancellation request that arrives
//! mid-call gives the unit a grace period to notice its
//! [`CancellationSignal`]; after that the call is abandoned by dropping its
//! future. Either way the attempt finishes as cancelled.

use super::types::{StepMessage, StepOutcome};
use crate::error::{AdapterError, StepError};
use crate::execution::ExecutionContext;
use crate::graph::RunGraph;
use crate::registry::{CancellationSignal, StepRunner};
use crate::resolution::PathResolver;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Everything an attempt needs, shared across the run's step tasks
#[derive(Clone)]
pub(crate) struct StepExecutor {
    pub run_id: Uuid,
    pub graph: Arc<RunGraph>,
    pub context: Arc<ExecutionContext>,
    pub runner: Arc<dyn StepRunner>,
    pub semaphore: Arc<Semaphore>,
    pub signal: CancellationSignal,
    pub cancellation_grace_period: Duration,
    pub tx: mpsc::UnboundedSender<StepMessage>,
}

impl StepExecutor {
    /// Spawn one attempt of the step at `index`. Exactly one `Finished`
    /// message is sent for every call.
    pub fn spawn(&self, index: usize, timeout: Duration) {
        let executor = self.clone();
        tokio::spawn(async move {
            let outcome = executor.execute_attempt(index, timeout).await;
            // The loop only goes away once the run is over
            let _ = executor.tx.send(StepMessage::Finished { index, outcome });
        });
    }

    #[instrument(skip(self), fields(run_id = %self.run_id))]
    async fn execute_attempt(&self, index: usize, timeout: Duration) -> StepOutcome {
        let Some(node) = self.graph.node(index) else {
            return StepOutcome::Failed(StepError::Adapter(AdapterError::failed(
                "<unknown>",
                format!("step index {index} is not part of the graph"),
            )));
        };
        let declaration = &node.declaration;

        // Phase 1: concurrency permit
        let queued_at = Instant::now();
        let _permit = tokio::select! {
            biased;
            _ = self.signal.cancelled() => return StepOutcome::Failed(StepError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return StepOutcome::Failed(StepError::Cancelled),
            },
        };

        // Phase 2: report start
        if self.tx.send(StepMessage::Started { index }).is_err() {
            return StepOutcome::Failed(StepError::Cancelled);
        }
        debug!(
            step_id = %declaration.id,
            unit_name = %declaration.unit_name,
            queued_ms = queued_at.elapsed().as_millis() as u64,
            "Starting step attempt"
        );

        // Phase 3: parameter resolution
        let parameters = match PathResolver::resolve_parameters(
            self.context.as_ref(),
            node.mapping.iter().map(|(name, path)| (name, path)),
            &declaration.static_parameters,
        ) {
            Ok(parameters) => parameters,
            Err(e) => return StepOutcome::Failed(e),
        };

        if self.signal.is_cancelled() {
            return StepOutcome::Failed(StepError::Cancelled);
        }

        // Phase 4: invoke the unit under its deadline
        let started = Instant::now();
        let call = AssertUnwindSafe(self.runner.execute(
            &declaration.unit_name,
            parameters,
            self.signal.clone(),
        ))
        .catch_unwind();
        tokio::pin!(call);

        // Set on the call's first poll; a call that never started is not
        // given a grace period
        let mut call_started = false;
        let outcome = tokio::select! {
            biased;
            _ = self.signal.cancelled() => {
                if call_started {
                    self.wait_out_grace_period(&declaration.id, &mut call).await;
                }
                StepOutcome::Failed(StepError::Cancelled)
            }
            result = tokio::time::timeout(timeout, async {
                call_started = true;
                (&mut call).await
            }) => match result {
                Ok(Ok(Ok(value))) => StepOutcome::Succeeded(value),
                Ok(Ok(Err(e))) => StepOutcome::Failed(StepError::Adapter(e)),
                Ok(Err(_panic)) => StepOutcome::Failed(StepError::Adapter(AdapterError::failed(
                    &declaration.unit_name,
                    "analysis unit panicked",
                ))),
                Err(_elapsed) => StepOutcome::Failed(StepError::Timeout { after: timeout }),
            },
        };

        debug!(
            step_id = %declaration.id,
            duration_ms = started.elapsed().as_millis() as u64,
            succeeded = matches!(outcome, StepOutcome::Succeeded(_)),
            "Step attempt finished"
        );
        outcome
    }

    async fn wait_out_grace_period<F: std::future::Future + Unpin>(&self, step_id: &str, call: &mut F) {
        if tokio::time::timeout(self.cancellation_grace_period, call)
            .await
            .is_err()
        {
            warn!(
                run_id = %self.run_id,
                step_id = %step_id,
                grace_ms = self.cancellation_grace_period.as_millis() as u64,
                "Abandoning step that did not stop within the cancellation grace period"
            );
        }
    }
}
