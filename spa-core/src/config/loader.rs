use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and parse a YAML file, flattening it into the values map.
///
/// A missing file is not an error unless `required` is set.
pub(crate) fn load_yaml_file(
    path: &Path,
    required: bool,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        if required {
            return Err(ConfigError::Load(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
}

/// Parse a YAML string and flatten it into the values map.
pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
pub(crate) fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut HashMap<String, ConfigValue>,
) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Environment variable name for a dot-separated config key:
/// `oidc.jwks_cache_ttl` <-> `OIDC_JWKS_CACHE_TTL`.
pub fn env_var_name(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

/// Overlay environment variables for the given keys.
pub(crate) fn overlay_env<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    values: &mut HashMap<String, ConfigValue>,
) {
    for key in keys {
        if let Ok(val) = std::env::var(env_var_name(key)) {
            values.insert(key.to_string(), ConfigValue::String(val));
        }
    }
}
