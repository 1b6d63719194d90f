use crate::resolution::StepParameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// StepDeclaration is the authored, static description of one step in a run.
/// It is immutable once the run graph has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDeclaration {
    /// Unique within a run definition
    pub id: String,
    /// Name of the analysis unit to invoke, looked up in the unit registry
    pub unit_name: String,
    /// Unit parameter name -> address (e.g. `dns_lookup.records[0]`)
    #[serde(default)]
    pub parameter_mapping: BTreeMap<String, String>,
    /// Literal values merged under the resolved mapping
    #[serde(default)]
    pub static_parameters: StepParameters,
    /// Step ids that must reach a terminal state before this one runs
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    /// A failure here does not fail the run
    #[serde(default)]
    pub optional: bool,
    /// Per-attempt deadline; the engine default applies when absent
    #[serde(
        default,
        rename = "timeout_seconds",
        with = "crate::utils::serde::optional_duration_secs"
    )]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub max_retries: u32,
    /// Hand the step's result to progress sinks for archival
    #[serde(default)]
    pub persist_result: bool,
}

impl StepDeclaration {
    pub fn new(id: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unit_name: unit_name.into(),
            parameter_mapping: BTreeMap::new(),
            static_parameters: StepParameters::new(),
            depends_on: BTreeSet::new(),
            optional: false,
            timeout: None,
            max_retries: 0,
            persist_result: false,
        }
    }

    pub fn map_parameter(mut self, parameter: impl Into<String>, address: impl Into<String>) -> Self {
        self.parameter_mapping.insert(parameter.into(), address.into());
        self
    }

    pub fn static_parameter(mut self, parameter: impl Into<String>, value: Value) -> Self {
        self.static_parameters.insert(parameter.into(), value);
        self
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.insert(step_id.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn persist_result(mut self, persist: bool) -> Self {
        self.persist_result = persist;
        self
    }

    /// Total attempts allowed: the initial one plus `max_retries`
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_root(&self) -> bool {
        self.depends_on.is_empty()
    }
}
