//! # Unit Registry
//!
//! Explicit mapping from `unit_name` to the analysis unit that implements it.
//! The hosting application populates the registry at start-up; the orchestrator
//! reaches units only through the [`StepRunner`] implementation below.
//!
//! ## Usage
//!
//! ```rust
//! use hunt_core::registry::UnitRegistry;
//! use serde_json::json;
//!
//! let registry = UnitRegistry::new();
//! registry.register_fn("dns_lookup", |params| async move {
//!     let domain = params.get("domain").cloned().unwrap_or_default();
//!     Ok(json!({"domain": domain, "records": ["93.184.216.34"]}))
//! });
//!
//! assert!(registry.contains("dns_lookup"));
//! ```

use super::step_runner::{CancellationSignal, StepRunner};
use crate::error::AdapterError;
use crate::resolution::StepParameters;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One opaque piece of analysis logic
#[async_trait]
pub trait AnalysisUnit: Send + Sync {
    async fn run(
        &self,
        parameters: StepParameters,
        signal: CancellationSignal,
    ) -> Result<Value, AdapterError>;
}

/// Adapts an async closure into an [`AnalysisUnit`]. Closure errors are reported
/// as [`AdapterError::Failed`] under the unit's registered name.
pub struct FnUnit<F> {
    unit_name: String,
    f: F,
}

impl<F> FnUnit<F> {
    pub fn new(unit_name: impl Into<String>, f: F) -> Self {
        Self {
            unit_name: unit_name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> AnalysisUnit for FnUnit<F>
where
    F: Fn(StepParameters) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    async fn run(
        &self,
        parameters: StepParameters,
        _signal: CancellationSignal,
    ) -> Result<Value, AdapterError> {
        (self.f)(parameters)
            .await
            .map_err(|message| AdapterError::failed(&self.unit_name, message))
    }
}

#[derive(Default)]
pub struct UnitRegistry {
    units: DashMap<String, Arc<dyn AnalysisUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit, replacing any previous registration under the same name
    pub fn register(&self, unit_name: impl Into<String>, unit: Arc<dyn AnalysisUnit>) {
        let unit_name = unit_name.into();
        if self.units.insert(unit_name.clone(), unit).is_some() {
            warn!(unit_name = %unit_name, "Replaced existing analysis unit registration");
        } else {
            info!(unit_name = %unit_name, "Registered analysis unit");
        }
    }

    pub fn register_fn<F, Fut>(&self, unit_name: impl Into<String>, f: F)
    where
        F: Fn(StepParameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let unit_name = unit_name.into();
        let unit = FnUnit::new(unit_name.clone(), f);
        self.register(unit_name, Arc::new(unit));
    }

    pub fn unregister(&self, unit_name: &str) -> bool {
        self.units.remove(unit_name).is_some()
    }

    pub fn get(&self, unit_name: &str) -> Option<Arc<dyn AnalysisUnit>> {
        self.units.get(unit_name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, unit_name: &str) -> bool {
        self.units.contains_key(unit_name)
    }

    /// Registered names, sorted
    pub fn unit_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[async_trait]
impl StepRunner for UnitRegistry {
    async fn execute(
        &self,
        unit_name: &str,
        parameters: StepParameters,
        signal: CancellationSignal,
    ) -> Result<Value, AdapterError> {
        // Clone the handle out so no map guard is held across the await
        let unit = self.get(unit_name).ok_or_else(|| AdapterError::UnknownUnit {
            unit_name: unit_name.to_string(),
        })?;

        debug!(unit_name = %unit_name, parameter_count = parameters.len(), "Invoking analysis unit");
        unit.run(parameters, signal).await
    }
}
