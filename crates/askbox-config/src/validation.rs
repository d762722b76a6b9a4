//! Full configuration validation.
//!
//! Validates numeric ranges, endpoint URLs, and the fallback message.

use crate::schema::AskboxConfig;
use askbox_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &AskboxConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_url(&mut errors, "api.answer_url", &config.api.answer_url);
    validate_url(&mut errors, "api.topics_url", &config.api.topics_url);
    validate_range(
        &mut errors,
        "api.request_timeout_secs",
        config.api.request_timeout_secs,
        1,
        600,
    );

    validate_range(
        &mut errors,
        "session.inactivity_timeout_secs",
        config.session.inactivity_timeout_secs,
        60,
        86_400,
    );
    validate_range(
        &mut errors,
        "session.check_interval_secs",
        config.session.check_interval_secs,
        1,
        3_600,
    );
    if config.session.error_message.trim().is_empty() {
        errors.push("session.error_message must not be empty".into());
    }

    if config.logging.level.trim().is_empty() {
        errors.push("logging.level must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

fn validate_url(errors: &mut Vec<String>, name: &str, value: &str) {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        errors.push(format!("{name} = {value:?} must be an http(s) URL"));
    }
}
