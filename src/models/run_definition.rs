use super::StepDeclaration;
use crate::error::{HuntError, HuntResult};
use crate::graph::RunGraph;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RunDefinition is the catalog's hand-off: an ordered list of step declarations
/// plus descriptive metadata. Loading a definition does not validate it;
/// [`RunDefinition::validate`] runs the graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<StepDeclaration>,
}

impl RunDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<StepDeclaration>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    pub fn from_json_str(json: &str) -> HuntResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> HuntResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HuntError::InvalidDefinition(format!("Cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Build and validate the dependency graph for this definition
    pub fn validate(&self) -> HuntResult<RunGraph> {
        Ok(RunGraph::build(self.steps.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEFINITION: &str = r#"{
        "name": "domain_recon",
        "steps": [
            {"id": "dns", "unit_name": "dns_lookup",
             "parameter_mapping": {"domain": "initial.domain"}},
            {"id": "geoip", "unit_name": "geoip",
             "parameter_mapping": {"ip": "dns.records[0]"},
             "depends_on": ["dns"], "optional": true}
        ]
    }"#;

    #[test]
    fn test_load_and_validate() {
        let definition = RunDefinition::from_json_str(DEFINITION).unwrap();
        assert_eq!(definition.name, "domain_recon");
        assert_eq!(definition.steps.len(), 2);

        let graph = definition.validate().unwrap();
        assert_eq!(graph.roots(), vec!["dns"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFINITION.as_bytes()).unwrap();

        let definition = RunDefinition::from_json_file(file.path()).unwrap();
        assert_eq!(definition.steps[1].id, "geoip");
    }

    #[test]
    fn test_malformed_json() {
        let err = RunDefinition::from_json_str(r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, HuntError::InvalidDefinition(_)));

        let err = RunDefinition::from_json_file(Path::new("/nonexistent/definition.json"))
            .unwrap_err();
        assert!(matches!(err, HuntError::InvalidDefinition(_)));
    }
}
