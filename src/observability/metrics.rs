//! Metrics collection.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding application.
//!
//! # Metrics
//! - `health_check_probes_total` (counter): probes by check, outcome
//! - `health_check_status` (gauge): 1=healthy, 0=unhealthy, -1=unknown
//! - `health_check_transitions_total` (counter): transitions by check, new state
//! - `health_check_worker_restarts_total` (counter): supervisor restarts by check

use crate::health::{HealthState, ProbeOutcome};

pub fn record_probe(check: &str, outcome: &ProbeOutcome) {
    metrics::counter!(
        "health_check_probes_total",
        "check" => check.to_string(),
        "outcome" => outcome.label()
    )
    .increment(1);
}

pub fn record_status(check: &str, state: HealthState) {
    let value = match state {
        HealthState::Healthy => 1.0,
        HealthState::Unhealthy => 0.0,
        HealthState::Unknown => -1.0,
    };
    metrics::gauge!("health_check_status", "check" => check.to_string()).set(value);
}

pub fn record_transition(check: &str, to: HealthState) {
    metrics::counter!(
        "health_check_transitions_total",
        "check" => check.to_string(),
        "state" => to.as_str()
    )
    .increment(1);
}

pub fn record_worker_restart(check: &str) {
    metrics::counter!(
        "health_check_worker_restarts_total",
        "check" => check.to_string()
    )
    .increment(1);
}

/// Metrics captured by a `DebuggingRecorder`, flattened for assertions.
#[cfg(test)]
pub(crate) fn captured(
    snapshotter: &metrics_util::debugging::Snapshotter,
) -> Vec<(String, Vec<(String, String)>, metrics_util::debugging::DebugValue)> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| {
            let key = key.key();
            let labels = key
                .labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect();
            (key.name().to_string(), labels, value)
        })
        .collect()
}
