//! # Progress Sinks
//!
//! Observers of step and run status changes (persistence, live UI). Sinks are
//! called from the scheduling loop, so they must return promptly; anything slow
//! belongs on the far side of a channel. A sink error is logged and otherwise
//! ignored: observers never abort a run.
//!
//! ## Usage
//!
//! ```rust
//! use hunt_core::events::{EventPublisher, ProgressEvent, ProgressSink, RunTransition};
//! use hunt_core::state_machine::RunStatus;
//! use chrono::Utc;
//! use uuid::Uuid;
//!
//! # tokio_test::block_on(async {
//! let publisher = EventPublisher::new(16);
//! let mut events = publisher.subscribe();
//!
//! publisher
//!     .on_run_transition(&RunTransition {
//!         run_id: Uuid::new_v4(),
//!         from: RunStatus::Pending,
//!         to: RunStatus::Running,
//!         error: None,
//!         occurred_at: Utc::now(),
//!     })
//!     .unwrap();
//!
//! match events.recv().await.unwrap() {
//!     ProgressEvent::Run(t) => assert_eq!(t.to, RunStatus::Running),
//!     other => panic!("unexpected event {other:?}"),
//! }
//! # });
//! ```

use super::types::{ProgressEvent, RunTransition, StepTransition};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Sink rejected event: {0}")]
    Rejected(String),
}

/// Receives status transitions. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn on_step_transition(&self, transition: &StepTransition) -> Result<(), PublishError>;

    fn on_run_transition(&self, transition: &RunTransition) -> Result<(), PublishError>;
}

/// Fan-out of progress events over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ProgressEvent) -> Result<(), PublishError> {
        // No subscribers is fine: events are published whether or not anyone listens
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Subscribe to events. Slow subscribers lag and skip, they never block publishers.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl ProgressSink for EventPublisher {
    fn on_step_transition(&self, transition: &StepTransition) -> Result<(), PublishError> {
        self.publish(ProgressEvent::Step(transition.clone()))
    }

    fn on_run_transition(&self, transition: &RunTransition) -> Result<(), PublishError> {
        self.publish(ProgressEvent::Run(transition.clone()))
    }
}

/// Writes every transition to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_step_transition(&self, t: &StepTransition) -> Result<(), PublishError> {
        info!(
            run_id = %t.run_id,
            step_id = %t.step_id,
            from = %t.from,
            to = %t.to,
            attempt = t.attempt,
            error = t.error.as_ref().map(|e| e.to_string()),
            "Step transition"
        );
        Ok(())
    }

    fn on_run_transition(&self, t: &RunTransition) -> Result<(), PublishError> {
        info!(
            run_id = %t.run_id,
            from = %t.from,
            to = %t.to,
            error = t.error.as_deref(),
            "Run transition"
        );
        Ok(())
    }
}

/// Forwards to several sinks; one failing sink does not starve the others
#[derive(Default, Clone)]
pub struct CompositeProgressSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl CompositeProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn forward(
        &self,
        deliver: impl Fn(&dyn ProgressSink) -> Result<(), PublishError>,
    ) -> Result<(), PublishError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = deliver(sink.as_ref()) {
                warn!(error = %e, "Progress sink failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ProgressSink for CompositeProgressSink {
    fn on_step_transition(&self, transition: &StepTransition) -> Result<(), PublishError> {
        self.forward(|sink| sink.on_step_transition(transition))
    }

    fn on_run_transition(&self, transition: &RunTransition) -> Result<(), PublishError> {
        self.forward(|sink| sink.on_run_transition(transition))
    }
}
