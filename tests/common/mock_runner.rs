use async_trait::async_trait;
use hunt_core::error::AdapterError;
use hunt_core::registry::{CancellationSignal, StepRunner};
use hunt_core::resolution::StepParameters;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mocked analysis unit does when invoked
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return a fixed value
    Return(Value),
    /// Return the resolved parameters as an object
    Echo,
    /// Fail every time
    Fail(String),
    /// Fail the first `n` invocations, then return the value
    FailTimes(u32, Value),
    /// Sleep, then return the value. Ignores cancellation.
    Sleep(Duration, Value),
    /// Block until the run is cancelled, then fail
    UntilCancelled,
}

/// One recorded lifecycle event of a mocked unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Started(String),
    Finished(String),
}

/// Scripted step runner that records every invocation
#[derive(Default)]
pub struct MockStepRunner {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    invocations: Mutex<HashMap<String, u32>>,
    parameters: Mutex<HashMap<String, Vec<StepParameters>>>,
    events: Mutex<Vec<MockEvent>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Decrements the active count even when the unit's future is dropped
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockStepRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(self: &Arc<Self>, unit_name: &str, behavior: MockBehavior) -> Arc<Self> {
        self.behaviors.lock().insert(unit_name.to_string(), behavior);
        Arc::clone(self)
    }

    pub fn invocations(&self, unit_name: &str) -> u32 {
        self.invocations.lock().get(unit_name).copied().unwrap_or(0)
    }

    pub fn total_invocations(&self) -> u32 {
        self.invocations.lock().values().sum()
    }

    /// Parameters of every invocation of `unit_name`, in order
    pub fn parameters(&self, unit_name: &str) -> Vec<StepParameters> {
        self.parameters.lock().get(unit_name).cloned().unwrap_or_default()
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn record_start(&self, unit_name: &str, parameters: &StepParameters) -> u32 {
        let attempt = {
            let mut invocations = self.invocations.lock();
            let count = invocations.entry(unit_name.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.parameters
            .lock()
            .entry(unit_name.to_string())
            .or_default()
            .push(parameters.clone());
        self.events.lock().push(MockEvent::Started(unit_name.to_string()));
        attempt
    }
}

#[async_trait]
impl StepRunner for MockStepRunner {
    async fn execute(
        &self,
        unit_name: &str,
        parameters: StepParameters,
        signal: CancellationSignal,
    ) -> Result<Value, AdapterError> {
        let attempt = self.record_start(unit_name, &parameters);

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let behavior = self
            .behaviors
            .lock()
            .get(unit_name)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownUnit {
                unit_name: unit_name.to_string(),
            })?;

        let result = match behavior {
            MockBehavior::Return(value) => Ok(value),
            MockBehavior::Echo => Ok(Value::Object(parameters)),
            MockBehavior::Fail(message) => Err(AdapterError::failed(unit_name, message)),
            MockBehavior::FailTimes(n, value) => {
                if attempt <= n {
                    Err(AdapterError::failed(unit_name, format!("attempt {attempt} failed")))
                } else {
                    Ok(value)
                }
            }
            MockBehavior::Sleep(duration, value) => {
                tokio::time::sleep(duration).await;
                Ok(value)
            }
            MockBehavior::UntilCancelled => {
                signal.cancelled().await;
                Err(AdapterError::failed(unit_name, "stopped on cancellation"))
            }
        };

        self.events.lock().push(MockEvent::Finished(unit_name.to_string()));
        result
    }
}
