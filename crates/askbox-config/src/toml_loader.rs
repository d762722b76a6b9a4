//! TOML config file loading and creation.

use crate::schema::AskboxConfig;
use crate::validation;
use askbox_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variables that override file values.
pub const ENV_ANSWER_URL: &str = "ASKBOX_API_URL";
pub const ENV_TOPICS_URL: &str = "ASKBOX_TOPICS_URL";
pub const ENV_ERROR_MESSAGE: &str = "ASKBOX_ERROR_MESSAGE";

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// After loading, the config is validated; if validation fails, a warning
/// is logged and the default config is returned.
pub fn load_from_path(path: &Path) -> Result<AskboxConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: AskboxConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
        warn!("falling back to default config");
        return Ok(AskboxConfig::default());
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/askbox/config.toml`
/// On Linux: `~/.config/askbox/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<AskboxConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(AskboxConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("askbox").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Apply `ASKBOX_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut AskboxConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup (environment in production).
pub fn apply_overrides_from(config: &mut AskboxConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_ANSWER_URL).filter(|v| !v.trim().is_empty()) {
        info!(url = %url, "answer endpoint overridden from environment");
        config.api.answer_url = url;
    }
    if let Some(url) = lookup(ENV_TOPICS_URL).filter(|v| !v.trim().is_empty()) {
        info!(url = %url, "topics endpoint overridden from environment");
        config.api.topics_url = url;
    }
    if let Some(msg) = lookup(ENV_ERROR_MESSAGE).filter(|v| !v.trim().is_empty()) {
        config.session.error_message = msg;
    }
}

/// Generate the default TOML config content with comments.
fn default_config_toml() -> String {
    r##"# askbox configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[api]
# answer_url = "http://localhost:8000/ask"
# topics_url = "http://localhost:8000/topics"
# request_timeout_secs = 60       # 1-600

[session]
# inactivity_timeout_secs = 600   # 60-86400
# check_interval_secs = 60        # 1-3600
# error_message = "Sorry, an error occurred"
# store = "file"                  # "file" or "memory"
# store_path = "/path/to/session.json"

[logging]
# level = "askbox=info"
"##
    .to_string()
}
