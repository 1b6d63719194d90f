#![allow(dead_code)]

pub mod mock_runner;
pub mod recording_sink;
pub mod strategies;

pub use mock_runner::*;
pub use recording_sink::*;
pub use strategies::*;

use hunt_core::config::EngineConfig;
use hunt_core::orchestration::OrchestrationEngine;
use hunt_core::registry::StepRunner;
use hunt_core::resolution::StepParameters;
use serde_json::Value;
use std::sync::Arc;

/// Engine with tracing of transitions disabled, to keep test output quiet
pub fn engine_with(runner: Arc<dyn StepRunner>, config: EngineConfig) -> OrchestrationEngine {
    OrchestrationEngine::builder(runner)
        .config(config)
        .trace_transitions(false)
        .build()
        .expect("valid engine configuration")
}

pub fn engine(runner: Arc<dyn StepRunner>) -> OrchestrationEngine {
    engine_with(runner, EngineConfig::default())
}

/// Build an initial parameter set from a JSON object literal
pub fn params(value: Value) -> StepParameters {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
