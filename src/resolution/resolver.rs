//! # Path Resolver
//!
//! Evaluates [`ValuePath`]s against a [`ValueSource`]. Resolution is a pure walk:
//! key lookups on objects, positional lookups on arrays, no coercion. The value
//! found is cloned out verbatim, nested structure included.

use super::path::{Accessor, PathRoot, PathSyntaxError, ValuePath};
use crate::error::StepError;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Parameters handed to an analysis unit
pub type StepParameters = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathResolutionError {
    #[error("Step '{step_id}' has not produced a result")]
    StepOutputUnavailable { step_id: String },
    #[error("Key '{key}' not found at '{at}'")]
    MissingKey { at: String, key: String },
    #[error("Index {index} out of range at '{at}' (length {len})")]
    IndexOutOfRange { at: String, index: usize, len: usize },
    #[error("Cannot look up key '{key}' at '{at}': value is {found}")]
    NotAMapping {
        at: String,
        key: String,
        found: &'static str,
    },
    #[error("Cannot take index [{index}] at '{at}': value is {found}")]
    NotASequence {
        at: String,
        index: usize,
        found: &'static str,
    },
    #[error(transparent)]
    Syntax(#[from] PathSyntaxError),
}

/// Read access to the roots a path can start from
pub trait ValueSource {
    /// The run's initial parameter set
    fn initial(&self) -> &Value;

    /// A step's recorded result, or `None` if it has not completed
    fn step_result(&self, step_id: &str) -> Option<Arc<Value>>;
}

/// Stateless resolver over a [`ValueSource`]
pub struct PathResolver;

impl PathResolver {
    /// Resolve a parsed path into an owned copy of the addressed value
    pub fn resolve<S>(source: &S, path: &ValuePath) -> Result<Value, PathResolutionError>
    where
        S: ValueSource + ?Sized,
    {
        match path.root() {
            PathRoot::Initial => walk(source.initial(), path).cloned(),
            PathRoot::Step(step_id) => {
                let root = source.step_result(step_id).ok_or_else(|| {
                    PathResolutionError::StepOutputUnavailable {
                        step_id: step_id.clone(),
                    }
                })?;
                walk(&root, path).cloned()
            }
        }
    }

    /// Parse and resolve a raw address string
    pub fn resolve_str<S>(source: &S, address: &str) -> Result<Value, PathResolutionError>
    where
        S: ValueSource + ?Sized,
    {
        let path = ValuePath::parse(address)?;
        Self::resolve(source, &path)
    }

    /// Build a step's full parameter set.
    ///
    /// Static parameters are laid down first and resolved mappings override them.
    /// The first mapping that fails aborts the whole resolution; nothing partial
    /// is returned.
    pub fn resolve_parameters<'a, S, I>(
        source: &S,
        mapping: I,
        static_parameters: &StepParameters,
    ) -> Result<StepParameters, StepError>
    where
        S: ValueSource + ?Sized,
        I: IntoIterator<Item = (&'a String, &'a ValuePath)>,
    {
        let mut parameters = static_parameters.clone();

        for (name, path) in mapping {
            let value = Self::resolve(source, path).map_err(|source| StepError::PathResolution {
                parameter: name.clone(),
                source,
            })?;
            parameters.insert(name.clone(), value);
        }

        Ok(parameters)
    }
}

/// Walk `path`'s accessors starting at `root`
pub fn walk<'v>(root: &'v Value, path: &ValuePath) -> Result<&'v Value, PathResolutionError> {
    let mut current = root;

    for (depth, accessor) in path.accessors().iter().enumerate() {
        current = match (accessor, current) {
            (Accessor::Key(key), Value::Object(map)) => {
                map.get(key)
                    .ok_or_else(|| PathResolutionError::MissingKey {
                        at: path.prefix(depth),
                        key: key.clone(),
                    })?
            }
            (Accessor::Key(key), other) => {
                return Err(PathResolutionError::NotAMapping {
                    at: path.prefix(depth),
                    key: key.clone(),
                    found: type_name(other),
                })
            }
            (Accessor::Index(index), Value::Array(items)) => {
                items
                    .get(*index)
                    .ok_or_else(|| PathResolutionError::IndexOutOfRange {
                        at: path.prefix(depth),
                        index: *index,
                        len: items.len(),
                    })?
            }
            (Accessor::Index(index), other) => {
                return Err(PathResolutionError::NotASequence {
                    at: path.prefix(depth),
                    index: *index,
                    found: type_name(other),
                })
            }
        };
    }

    Ok(current)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
