//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EngineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = ?path, checks = config.checks.len(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const OBSERVED: &str = r#"
        [scheduler]
        probe_timeout = "2s"

        [observability]
        log_level = "debug"

        [[checks]]
        name = "postgres"
        type = "tcp"

        [checks.schedule]
        check_interval = "2500ms"
        downtime_interval = "25s"
        failure_attempts = 2
        success_attempts = 1

        [checks.options]
        address = "127.0.0.1:5432"
    "#;

    #[test]
    fn parses_observed_schedule() {
        let config = parse_config(OBSERVED).unwrap();
        assert_eq!(config.scheduler.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.observability.log_level, "debug");

        let check = &config.checks[0];
        assert_eq!(check.name, "postgres");
        assert_eq!(check.kind, "tcp");
        assert!(check.critical);
        assert_eq!(check.schedule.check_interval.as_millis(), 2500);
        assert_eq!(check.schedule.downtime_interval.as_secs(), 25);
        assert_eq!(check.schedule.failure_attempts, 2);
        assert_eq!(check.schedule.success_attempts, 1);
        assert_eq!(
            check.options.get("address").and_then(|v| v.as_str()),
            Some("127.0.0.1:5432")
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.checks.is_empty());
        assert_eq!(config.scheduler.shutdown_grace, Duration::from_secs(10));
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let err = parse_config(
            r#"
            [scheduler]
            probe_timeout = "soon"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn optional_durations_accept_humantime_strings() {
        let config = parse_config(
            r#"
            [scheduler]
            shutdown_grace = "1m 30s"

            [[checks]]
            name = "redis"
            type = "tcp"
            timeout = "750ms"

            [checks.schedule]
            initial_delay = "0ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.shutdown_grace, Duration::from_secs(90));
        let check = &config.checks[0];
        assert_eq!(check.timeout, Some(Duration::from_millis(750)));
        assert_eq!(check.schedule.initial_delay, Some(Duration::ZERO));
        assert_eq!(check.schedule.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn semantic_errors_are_collected() {
        let err = parse_config(
            r#"
            [[checks]]
            name = "redis"
            type = "tcp"
            [checks.schedule]
            check_interval = "0s"
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "checks[0].schedule");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(OBSERVED.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.checks.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
