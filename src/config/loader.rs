//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file and `HUNT__*` environment
//! variables (in that order of increasing precedence) with the `config` crate,
//! then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::EngineConfig;
use crate::constants::env_vars;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<EngineConfig> {
        Self::build(path, None)
    }

    /// Load using the file named by `HUNT_CONFIG_PATH`, when set
    pub fn load_from_env() -> ConfigResult<EngineConfig> {
        let path = std::env::var_os(env_vars::CONFIG_PATH).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    /// Same as [`ConfigLoader::load`] but reads overrides from `env` instead of
    /// the process environment. Keys use the same `HUNT__...` names.
    pub fn load_with_env(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> ConfigResult<EngineConfig> {
        Self::build(path, Some(env))
    }

    fn build(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<EngineConfig> {
        let defaults = Config::try_from(&EngineConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::ConfigFileNotFound {
                    path: path.to_path_buf(),
                });
            }
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_vars::CONFIG_PREFIX)
                .separator(env_vars::CONFIG_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config: EngineConfig = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(source_name, e))?
            .try_deserialize()
            .map_err(|e| ConfigurationError::TypeMismatch {
                error: e.to_string(),
            })?;

        config.validate()?;

        debug!(
            max_concurrent_steps = config.max_concurrent_steps,
            default_step_timeout_ms = config.default_step_timeout_ms,
            "Configuration loaded successfully"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::load_with_env(None, HashMap::new()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
max_concurrent_steps = 3

[backoff]
base_delay_ms = 100
"#,
        );
        let config = ConfigLoader::load_with_env(Some(file.path()), HashMap::new()).unwrap();
        assert_eq!(config.max_concurrent_steps, 3);
        assert_eq!(config.backoff.base_delay_ms, 100);
        assert_eq!(config.backoff.multiplier, 2.0);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("max_concurrent_steps = 3\n");
        let env = HashMap::from([
            ("HUNT__MAX_CONCURRENT_STEPS".to_string(), "5".to_string()),
            ("HUNT__BACKOFF__MAX_DELAY_MS".to_string(), "1000".to_string()),
        ]);
        let config = ConfigLoader::load_with_env(Some(file.path()), env).unwrap();
        assert_eq!(config.max_concurrent_steps, 5);
        assert_eq!(config.backoff.max_delay_ms, 1000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ConfigLoader::load_with_env(
            Some(Path::new("/nonexistent/hunt.toml")),
            HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = toml_file("max_concurrent_steps = 0\n");
        let err = ConfigLoader::load_with_env(Some(file.path()), HashMap::new()).unwrap_err();
        assert_eq!(err.field(), Some("max_concurrent_steps"));
    }
}
