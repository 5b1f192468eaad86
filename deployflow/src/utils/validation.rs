//! Name validation for stages, actions and artifacts.
//!
//! The rules mirror what the deployment platform accepts, so that a bad name
//! is reported while the graph is being composed instead of at deploy time.

use crate::errors::ConfigurationError;
use regex::Regex;
use std::sync::OnceLock;

const MAX_NAME_LEN: usize = 100;

fn stage_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9.@_-]+$").expect("static pattern compiles"))
}

fn artifact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static pattern compiles"))
}

fn check(kind: &str, name: &str, pattern: &Regex, rule: &str) -> Result<(), ConfigurationError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ConfigurationError::invalid_name(
            kind,
            name,
            "must be between 1 and 100 characters",
        ));
    }
    if !pattern.is_match(name) {
        return Err(ConfigurationError::invalid_name(kind, name, rule));
    }
    Ok(())
}

/// Validates a stage name.
pub fn validate_stage_name(name: &str) -> Result<(), ConfigurationError> {
    check(
        "stage",
        name,
        stage_name_pattern(),
        "only letters, digits and . @ _ - are allowed",
    )
}

/// Validates an action name. Actions follow the same rules as stages.
pub fn validate_action_name(name: &str) -> Result<(), ConfigurationError> {
    check(
        "action",
        name,
        stage_name_pattern(),
        "only letters, digits and . @ _ - are allowed",
    )
}

/// Validates an artifact name.
pub fn validate_artifact_name(name: &str) -> Result<(), ConfigurationError> {
    check(
        "artifact",
        name,
        artifact_name_pattern(),
        "only letters, digits, _ and - are allowed",
    )
}

/// Rejects empty or whitespace-only values.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::missing_value(field));
    }
    Ok(())
}
