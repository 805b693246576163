//! Per-dependency health state machine.
//!
//! # States
//! - Unknown: registered, threshold not yet reached in either direction
//! - Healthy: dependency is usable
//! - Unhealthy: dependency is failing
//!
//! # State Transitions
//! ```text
//! Unknown/Healthy → Unhealthy: consecutive failures >= failure_attempts
//! Unknown/Unhealthy → Healthy: consecutive successes >= success_attempts
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Counters reset on state transition
//! - Unknown counts as unhealthy for the success threshold

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::health::Schedule;

/// Externally visible health of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }

    /// `Some(true)` for healthy, `Some(false)` for unhealthy, `None` while unknown.
    pub fn is_healthy(&self) -> Option<bool> {
        match self {
            HealthState::Unknown => None,
            HealthState::Healthy => Some(true),
            HealthState::Unhealthy => Some(false),
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change produced by [`HealthCheckState::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
    pub at: SystemTime,
}

/// Consecutive-result tracker for a single dependency.
#[derive(Debug, Clone)]
pub struct HealthCheckState {
    state: HealthState,
    consecutive_successes: u32,
    consecutive_failures: u32,
    last_transition: Option<SystemTime>,
    success_attempts: u32,
    failure_attempts: u32,
}

impl HealthCheckState {
    /// Start in `Unknown` with zero counters.
    pub fn new(schedule: &Schedule) -> Self {
        Self {
            state: HealthState::Unknown,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_transition: None,
            success_attempts: schedule.success_attempts(),
            failure_attempts: schedule.failure_attempts(),
        }
    }

    /// Record a probe result. Returns the transition if the visible state changed.
    pub fn record(&mut self, healthy: bool, now: SystemTime) -> Option<Transition> {
        if healthy {
            self.mark_success(now)
        } else {
            self.mark_failure(now)
        }
    }

    fn mark_success(&mut self, now: SystemTime) -> Option<Transition> {
        self.consecutive_failures = 0;
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);

        if self.state != HealthState::Healthy
            && self.consecutive_successes >= self.success_attempts
        {
            self.consecutive_successes = 0;
            return Some(self.transition(HealthState::Healthy, now));
        }
        None
    }

    fn mark_failure(&mut self, now: SystemTime) -> Option<Transition> {
        self.consecutive_successes = 0;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.state != HealthState::Unhealthy
            && self.consecutive_failures >= self.failure_attempts
        {
            self.consecutive_failures = 0;
            return Some(self.transition(HealthState::Unhealthy, now));
        }
        None
    }

    fn transition(&mut self, to: HealthState, at: SystemTime) -> Transition {
        let from = self.state;
        self.state = to;
        self.last_transition = Some(at);
        Transition { from, to, at }
    }

    /// Delay until the next probe: downtime spacing while unhealthy.
    pub fn next_delay(&self, schedule: &Schedule) -> Duration {
        match self.state {
            HealthState::Unhealthy => schedule.downtime_interval(),
            HealthState::Unknown | HealthState::Healthy => schedule.check_interval(),
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Time of the most recent transition, `None` until the first one.
    pub fn last_transition(&self) -> Option<SystemTime> {
        self.last_transition
    }
}
