//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable via `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("global subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(env.as_deref(), &config.log_level)
}

/// An unparsable environment directive falls back to the configured level.
fn filter_from(env: Option<&str>, level: &str) -> Result<EnvFilter, LoggingError> {
    if let Some(filter) = env.and_then(|directive| EnvFilter::try_new(directive).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| LoggingError::Filter {
        directive: level.to_string(),
        source,
    })
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json()))
        .with((!config.json).then(fmt::layer))
        .try_init()?;

    tracing::info!(
        level = %config.log_level,
        json = config.json,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_level_and_directives() {
        for directive in ["info", "health_scheduler=debug,warn"] {
            assert!(filter_from(None, directive).is_ok(), "{directive}");
        }
    }

    #[test]
    fn garbage_level_is_a_filter_error() {
        match filter_from(None, "health_scheduler=notalevel") {
            Err(LoggingError::Filter { directive, .. }) => {
                assert_eq!(directive, "health_scheduler=notalevel")
            }
            other => panic!("expected filter error, got {other:?}"),
        }
    }

    #[test]
    fn env_directive_overrides_configured_level() {
        let filter = filter_from(Some("debug"), "health_scheduler=notalevel").unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn unparsable_env_directive_falls_back_to_config() {
        let filter = filter_from(Some("health_scheduler=notalevel"), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn build_filter_reports_bad_config_level() {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return;
        }
        let config = ObservabilityConfig {
            log_level: "x=notalevel".to_string(),
            ..ObservabilityConfig::default()
        };
        assert!(matches!(build_filter(&config), Err(LoggingError::Filter { .. })));
    }

    #[test]
    fn second_init_is_rejected() {
        let config = ObservabilityConfig {
            log_level: "warn".to_string(),
            json: true,
        };
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(LoggingError::Init(_))));
    }
}
