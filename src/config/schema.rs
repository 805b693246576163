//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the health-check engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler housekeeping settings.
    pub scheduler: SchedulerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Health checks to register at startup.
    pub checks: Vec<HealthCheckConfig>,
}

/// Scheduler-wide settings shared by every registered check.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Probe timeout used when a check does not set its own.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// How long `shutdown` waits for in-flight probes before aborting them.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,

    /// Capacity of the state-change broadcast channel.
    pub event_capacity: usize,

    /// Base delay for restarting a check worker that crashed.
    #[serde(with = "humantime_serde")]
    pub restart_base_delay: Duration,

    /// Maximum delay between worker restarts.
    #[serde(with = "humantime_serde")]
    pub restart_max_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
            event_capacity: 64,
            restart_base_delay: Duration::from_millis(100),
            restart_max_delay: Duration::from_secs(30),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// A single health check definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    /// Unique check name.
    pub name: String,

    /// Probe type, resolved through the probe registry (e.g. "tcp").
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether this check counts towards aggregate service health.
    #[serde(default = "default_critical")]
    pub critical: bool,

    /// Per-check probe timeout; falls back to the scheduler default.
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Probing schedule and thresholds.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Probe-type specific options.
    #[serde(default)]
    pub options: toml::Table,
}

fn default_critical() -> bool {
    true
}

/// Raw schedule values as written in the config file.
///
/// Converted into a validated [`crate::health::Schedule`] via `TryFrom`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Spacing between probes while healthy (or unknown).
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,

    /// Spacing between probes while unhealthy.
    #[serde(with = "humantime_serde")]
    pub downtime_interval: Duration,

    /// Delay before the first probe; defaults to `check_interval`.
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_delay: Option<Duration>,

    /// Consecutive failures required to become unhealthy.
    pub failure_attempts: u32,

    /// Consecutive successes required to become healthy.
    pub success_attempts: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            downtime_interval: Duration::from_secs(30),
            initial_delay: None,
            failure_attempts: 3,
            success_attempts: 2,
        }
    }
}
