//! # Step Runner Adapter
//!
//! The seam between the orchestrator and the analysis units it drives. The engine
//! only ever talks to a [`StepRunner`]; it imposes deadlines itself (by dropping
//! the future) and asks for cooperative shutdown through a [`CancellationSignal`].

use crate::error::AdapterError;
use crate::resolution::StepParameters;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

/// Executes an analysis unit by name.
///
/// Implementations must tolerate having their future dropped at any await point:
/// that is how timeouts and abandoned cancellations are enforced.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn execute(
        &self,
        unit_name: &str,
        parameters: StepParameters,
        signal: CancellationSignal,
    ) -> Result<Value, AdapterError>;
}

/// Read side of a run's cancellation flag
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling: this signal can never fire
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Write side of a run's cancellation flag
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Request cancellation. Returns false if it had already been requested.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_fires_after_cancel() {
        let handle = CancellationHandle::new();
        let signal = handle.signal();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });

        assert!(handle.cancel());
        assert!(!handle.cancel(), "second cancel reports already cancelled");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should fire")
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_created_after_cancel_is_already_fired() {
        let handle = CancellationHandle::new();
        handle.cancel();
        let signal = handle.signal();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already-cancelled signal resolves immediately");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_stays_pending() {
        let signal = CancellationSignal::never();
        let outcome = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(outcome.is_err());
        assert!(!signal.is_cancelled());
    }
}
