//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, attempts >= 1)
//! - Detect duplicate or empty check names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{EngineConfig, SchedulerConfig};
use crate::health::Schedule;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `checks[1].schedule`.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate an engine configuration, collecting every error.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_scheduler(&config.scheduler, &mut errors);

    let mut seen = HashSet::new();
    for (i, check) in config.checks.iter().enumerate() {
        let prefix = format!("checks[{}]", i);

        if check.name.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                "must not be empty",
            ));
        } else if !seen.insert(check.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                format!("duplicate check name '{}'", check.name),
            ));
        }

        if check.kind.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.type", prefix),
                "must not be empty",
            ));
        }

        if check.timeout == Some(std::time::Duration::ZERO) {
            errors.push(ValidationError::new(
                format!("{}.timeout", prefix),
                "must be positive",
            ));
        }

        if let Err(e) = Schedule::try_from(&check.schedule) {
            errors.push(ValidationError::new(
                format!("{}.schedule", prefix),
                e.to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_scheduler(config: &SchedulerConfig, errors: &mut Vec<ValidationError>) {
    if config.probe_timeout.is_zero() {
        errors.push(ValidationError::new(
            "scheduler.probe_timeout",
            "must be positive",
        ));
    }
    if config.shutdown_grace.is_zero() {
        errors.push(ValidationError::new(
            "scheduler.shutdown_grace",
            "must be positive",
        ));
    }
    if config.event_capacity == 0 {
        errors.push(ValidationError::new(
            "scheduler.event_capacity",
            "must be at least 1",
        ));
    }
    if config.restart_base_delay > config.restart_max_delay {
        errors.push(ValidationError::new(
            "scheduler.restart_base_delay",
            "must not exceed restart_max_delay",
        ));
    }
}
