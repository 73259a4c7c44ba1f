mod app;
mod loader;
pub mod value;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use app::{AppConfig, PropertyMeta};
pub use loader::env_var_name;
pub use value::{parse_duration, ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A value parsed but is not acceptable (e.g. port 0).
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Default config file looked up in the working directory when no explicit
/// file is given.
pub const DEFAULT_CONFIG_FILE: &str = "application.yaml";

/// Raw configuration: dot-separated keys mapped to loosely typed values.
///
/// Resolution order (lowest to highest priority):
/// 1. YAML file (`--config <file>`, else `application.yaml` if present)
/// 2. `.env` file (loaded into process environment, never overwriting)
/// 3. Environment variables for every known key (`server.port` <-> `SERVER_PORT`)
/// 4. Values set programmatically with [`SpaConfig::set`] (command-line flags)
///
/// Defaults live in the typed layer, see [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct SpaConfig {
    values: HashMap<String, ConfigValue>,
    source: Option<PathBuf>,
}

impl SpaConfig {
    /// Load configuration from an optional explicit file, `.env`, and the
    /// environment.
    ///
    /// An explicit file must exist; the default `application.yaml` is optional.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();

        let (path, required) = match file {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        loader::load_yaml_file(&path, required, &mut values)?;
        let source = path.exists().then_some(path);

        let _ = dotenvy::dotenv();

        loader::overlay_env(AppConfig::properties().iter().map(|p| p.key), &mut values);

        Ok(SpaConfig { values, source })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(SpaConfig {
            values,
            source: None,
        })
    }

    /// Create an empty config; every typed setting falls back to its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Get a typed value for the given dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning `default` only when the key is absent.
    ///
    /// A present value of the wrong type is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key),
            None => Ok(default),
        }
    }

    /// Check whether a key exists in the config.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The config file that was read, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
