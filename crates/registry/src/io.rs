//! Configuration IO helpers.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use fanout_util::expand_tilde;
use tracing::{debug, info};

use crate::{ConfigError, FanoutConfig, validate_config};

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Returns the default path for the field configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("FANOUT_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("fanout").join("fields.yaml")
}

/// Loads and validates configuration from the default path.
pub fn load_config() -> anyhow::Result<FanoutConfig> {
    let path = default_config_path();
    load_config_from_path(&path)
}

/// Loads and validates configuration from a specific path.
///
/// A missing file yields an empty configuration.
pub fn load_config_from_path(path: &Path) -> anyhow::Result<FanoutConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "configuration file not found; using empty configuration");
        return Ok(FanoutConfig::default());
    }

    let content = fs::read_to_string(path).map_err(ConfigError::from)?;
    let config = parse_config_str(&content, ConfigFormat::from_path(path))
        .map_err(|error| anyhow::anyhow!("{}: {}", path.display(), error))?;
    info!(path = %path.display(), field_count = config.fields.len(), "configuration loaded");
    Ok(config)
}

/// Parses and validates a configuration document.
pub fn parse_config_str(content: &str, format: ConfigFormat) -> Result<FanoutConfig, ConfigError> {
    let config: FanoutConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml if content.trim().is_empty() => FanoutConfig::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
fields:
  users:
    shape: collection
    path: /users
    targets:
      - name: primary
        address: https://primary.example.com
      - name: replica
        address: https://replica.example.com
"#;

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/fanout/fields.yaml";
        temp_env::with_var("FANOUT_CONFIG_PATH", Some(override_path), || {
            let path = default_config_path();
            let expected = expand_tilde(override_path);
            assert_eq!(path, expected);
        });
    }

    #[test]
    fn missing_file_is_empty_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(&temp_dir.path().join("absent.yaml")).unwrap();
        assert!(config.fields.is_empty());
    }

    #[test]
    fn loads_yaml_and_json_by_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let yaml_path = temp_dir.path().join("fields.yaml");
        fs::write(&yaml_path, VALID_YAML).unwrap();
        let from_yaml = load_config_from_path(&yaml_path).expect("yaml loads");
        assert_eq!(from_yaml.field("users").unwrap().target_names(), vec!["primary", "replica"]);

        let json_path = temp_dir.path().join("fields.json");
        fs::write(&json_path, serde_json::to_string(&from_yaml).unwrap()).unwrap();
        let from_json = load_config_from_path(&json_path).expect("json loads");
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn invalid_document_reports_path_and_reason() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("fields.yaml");
        fs::write(&path, "fields:\n  users:\n    targets: []\n").unwrap();

        let error = load_config_from_path(&path).unwrap_err().to_string();
        assert!(error.contains("fields.yaml"), "error: {error}");
        assert!(error.contains("at least one target"), "error: {error}");
    }

    #[test]
    fn empty_yaml_document_is_empty_config() {
        let config = parse_config_str("  \n", ConfigFormat::Yaml).unwrap();
        assert!(config.fields.is_empty());
    }
}
