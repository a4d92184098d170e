//! Configuration validation

use crate::policy::{DEFAULT_RENEW_BEFORE_EXPIRY_SECS, DEFAULT_SESSION_DURATION_SECS};
use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("session: {0}")]
    SessionError(String),

    #[error("toggle: command cannot be empty")]
    EmptyToggleCommand,

    #[error("toggle: command program cannot be blank")]
    BlankToggleProgram,

    #[error("app: process_name cannot be empty")]
    EmptyProcessName,

    #[error("app: process_name '{0}' is longer than 15 bytes and will never match /proc/<pid>/comm")]
    ProcessNameTooLong(String),

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
}

/// Validate a raw configuration, collecting every error
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.session.duration_seconds == Some(0) {
        errors.push(ValidationError::SessionError(
            "duration_seconds must be greater than zero".into(),
        ));
    }

    match config.toggle.command.first() {
        None => errors.push(ValidationError::EmptyToggleCommand),
        Some(program) if program.trim().is_empty() => {
            errors.push(ValidationError::BlankToggleProgram)
        }
        Some(_) => {}
    }

    let process_name = config.app.process_name.trim();
    if process_name.is_empty() {
        errors.push(ValidationError::EmptyProcessName);
    } else if process_name.len() > 15 {
        errors.push(ValidationError::ProcessNameTooLong(process_name.to_string()));
    }

    let intervals = [
        ("toggle.timeout_seconds", config.toggle.timeout_seconds),
        ("app.poll_interval_seconds", config.app.poll_interval_seconds),
        ("power.poll_interval_seconds", config.power.poll_interval_seconds),
        ("retry.not_ready_backoff_seconds", config.retry.not_ready_backoff_seconds),
        ("retry.failure_backoff_seconds", config.retry.failure_backoff_seconds),
    ];
    for (field, value) in intervals {
        if value == Some(0) {
            errors.push(ValidationError::ZeroInterval { field });
        }
    }

    errors
}

/// Non-fatal findings that the loader logs but accepts
pub fn config_warnings(config: &RawConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let duration = config
        .session
        .duration_seconds
        .unwrap_or(DEFAULT_SESSION_DURATION_SECS);
    let lead = config
        .session
        .renew_before_expiry_seconds
        .unwrap_or(DEFAULT_RENEW_BEFORE_EXPIRY_SECS);

    if lead >= duration {
        warnings.push(format!(
            "renew_before_expiry_seconds ({}) >= duration_seconds ({}): every session will be renewed immediately",
            lead, duration
        ));
    }

    warnings
}
