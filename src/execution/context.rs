//! # Execution Context
//!
//! Per-run value store read by the Path Resolver. The initial parameters are set
//! once at construction and never change, so they need no lock. Step results go
//! into a concurrent map that only ever grows: each step id is written at most
//! once and the stored value is immutable afterwards.

use crate::resolution::{StepParameters, ValueSource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Result for step '{step_id}' was already recorded")]
    AlreadyRecorded { step_id: String },
}

#[derive(Debug)]
pub struct ExecutionContext {
    initial: Value,
    results: DashMap<String, Arc<Value>>,
}

impl ExecutionContext {
    pub fn new(initial: StepParameters) -> Self {
        Self {
            initial: Value::Object(initial),
            results: DashMap::new(),
        }
    }

    /// The run's initial parameter set
    pub fn get_initial(&self) -> &Value {
        &self.initial
    }

    /// Record a step's output. Recording the same step twice is an invariant
    /// violation and is reported rather than overwriting.
    pub fn record_result(&self, step_id: &str, value: Value) -> Result<(), ContextError> {
        match self.results.entry(step_id.to_string()) {
            Entry::Occupied(_) => Err(ContextError::AlreadyRecorded {
                step_id: step_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(value));
                Ok(())
            }
        }
    }

    /// A step's recorded output, `None` while the step has not succeeded
    pub fn get_result(&self, step_id: &str) -> Option<Arc<Value>> {
        self.results.get(step_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn has_result(&self, step_id: &str) -> bool {
        self.results.contains_key(step_id)
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Owned copy of every recorded result, for archival
    pub fn results_snapshot(&self) -> HashMap<String, Value> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().as_ref().clone()))
            .collect()
    }
}

impl ValueSource for ExecutionContext {
    fn initial(&self) -> &Value {
        self.get_initial()
    }

    fn step_result(&self, step_id: &str) -> Option<Arc<Value>> {
        self.get_result(step_id)
    }
}
