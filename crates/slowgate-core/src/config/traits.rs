//! Core configuration trait

use crate::SlowGateError;
use std::path::Path;
use tracing::debug;

/// Common lifecycle for SlowGate configuration types
///
/// Values are layered: defaults, then a file, then `SLOWGATE_*` environment
/// variables, then explicit `key=value` overrides. `validate` runs last.
pub trait SlowGateConfig: Clone + Default + Send + Sync + 'static {
    /// Error type for configuration operations
    type Error: Into<SlowGateError> + From<SlowGateError>;

    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from a `.toml` or `.json` file
    fn load_from_file(path: &Path) -> Result<Self, Self::Error>;

    /// Merge with environment variables
    fn merge_with_env(&mut self) -> Result<(), Self::Error>;

    /// Merge with another configuration
    fn merge_with(&mut self, other: &Self) -> Result<(), Self::Error>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), Self::Error>;

    /// Set a configuration value from a string
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Defaults, then `path` if given, then the environment, then validation
    fn load_layered(path: Option<&Path>) -> Result<Self, Self::Error> {
        let mut config = Self::defaults();
        if let Some(path) = path {
            let from_file = Self::load_from_file(path)?;
            config.merge_with(&from_file)?;
        }
        config.merge_with_env()?;
        config.validate()?;
        debug!(path = ?path, "Configuration loaded");
        Ok(config)
    }
}

/// Parse a file's contents as TOML or JSON depending on its extension
pub fn parse_config_file<T>(path: &Path) -> Result<T, SlowGateError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let content = std::fs::read_to_string(path)?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)
            .map_err(|e| SlowGateError::invalid(format!("Invalid TOML: {e}"))),
        Some("json") => serde_json::from_str(&content)
            .map_err(|e| SlowGateError::invalid(format!("Invalid JSON: {e}"))),
        _ => Err(SlowGateError::invalid(format!(
            "Unsupported config file format: {}",
            path.display()
        ))),
    }
}
