//! askbox configuration system.
//!
//! Provides TOML-based configuration with environment overrides and
//! validation. All config sections use defaults so partial configs work
//! out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use askbox_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.api.answer_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ApiConfig, AskboxConfig, LoggingConfig, SessionConfig, StoreKind, DEFAULT_ERROR_MESSAGE,
};

use askbox_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, then apply environment overrides.
pub fn load_config() -> Result<AskboxConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    toml_loader::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit file path, then apply environment overrides.
pub fn load_config_from(path: &Path) -> Result<AskboxConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    toml_loader::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}
