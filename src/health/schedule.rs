//! Probe timing and threshold configuration.

use std::time::Duration;

use thiserror::Error;

use crate::config::ScheduleConfig;

/// Reasons a [`Schedule`] cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("{field} must be positive")]
    NonPositiveDuration { field: &'static str },

    #[error("{field} must be at least 1, got {value}")]
    InvalidAttempts { field: &'static str, value: u32 },
}

/// Immutable, validated probing schedule for one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    check_interval: Duration,
    downtime_interval: Duration,
    initial_delay: Option<Duration>,
    failure_attempts: u32,
    success_attempts: u32,
}

impl Schedule {
    /// Build a schedule, rejecting zero intervals and attempt counts below 1.
    pub fn new(
        check_interval: Duration,
        downtime_interval: Duration,
        failure_attempts: u32,
        success_attempts: u32,
    ) -> Result<Self, ScheduleError> {
        if check_interval.is_zero() {
            return Err(ScheduleError::NonPositiveDuration {
                field: "check_interval",
            });
        }
        if downtime_interval.is_zero() {
            return Err(ScheduleError::NonPositiveDuration {
                field: "downtime_interval",
            });
        }
        if failure_attempts < 1 {
            return Err(ScheduleError::InvalidAttempts {
                field: "failure_attempts",
                value: failure_attempts,
            });
        }
        if success_attempts < 1 {
            return Err(ScheduleError::InvalidAttempts {
                field: "success_attempts",
                value: success_attempts,
            });
        }

        Ok(Self {
            check_interval,
            downtime_interval,
            initial_delay: None,
            failure_attempts,
            success_attempts,
        })
    }

    /// Delay the first probe by `delay` instead of `check_interval`.
    /// Zero means probe immediately after registration.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Spacing between probes while healthy or unknown.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Spacing between probes while unhealthy.
    pub fn downtime_interval(&self) -> Duration {
        self.downtime_interval
    }

    /// Delay before the first probe.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay.unwrap_or(self.check_interval)
    }

    /// Consecutive failures required to become unhealthy.
    pub fn failure_attempts(&self) -> u32 {
        self.failure_attempts
    }

    /// Consecutive successes required to become healthy.
    pub fn success_attempts(&self) -> u32 {
        self.success_attempts
    }
}

impl Default for Schedule {
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

impl TryFrom<&ScheduleConfig> for Schedule {
    type Error = ScheduleError;

    fn try_from(config: &ScheduleConfig) -> Result<Self, Self::Error> {
        let schedule = Schedule::new(
            config.check_interval,
            config.downtime_interval,
            config.failure_attempts,
            config.success_attempts,
        )?;
        Ok(match config.initial_delay {
            Some(delay) => schedule.with_initial_delay(delay),
            None => schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_observed_schedule() {
        let schedule =
            Schedule::new(Duration::from_millis(2500), Duration::from_secs(25), 2, 1).unwrap();
        assert_eq!(schedule.check_interval().as_millis(), 2500);
        assert_eq!(schedule.downtime_interval().as_secs(), 25);
        assert_eq!(schedule.failure_attempts(), 2);
        assert_eq!(schedule.success_attempts(), 1);
    }

    #[test]
    fn accepts_minimal_positive_values() {
        for (check_ms, down_ms, fail, ok) in [(1, 1, 1, 1), (10, 5, 7, 3), (60_000, 1, 1, 100)] {
            let schedule = Schedule::new(
                Duration::from_millis(check_ms),
                Duration::from_millis(down_ms),
                fail,
                ok,
            );
            assert!(schedule.is_ok(), "{check_ms} {down_ms} {fail} {ok}");
        }
    }

    #[test]
    fn rejects_zero_durations() {
        let err = Schedule::new(Duration::ZERO, Duration::from_secs(1), 1, 1).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::NonPositiveDuration {
                field: "check_interval"
            }
        );

        let err = Schedule::new(Duration::from_secs(1), Duration::ZERO, 1, 1).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::NonPositiveDuration {
                field: "downtime_interval"
            }
        );
    }

    #[test]
    fn rejects_zero_attempts() {
        let secs = Duration::from_secs(1);
        assert!(matches!(
            Schedule::new(secs, secs, 0, 1),
            Err(ScheduleError::InvalidAttempts {
                field: "failure_attempts",
                ..
            })
        ));
        assert!(matches!(
            Schedule::new(secs, secs, 1, 0),
            Err(ScheduleError::InvalidAttempts {
                field: "success_attempts",
                ..
            })
        ));
    }

    #[test]
    fn initial_delay_defaults_to_check_interval() {
        let schedule = Schedule::default();
        assert_eq!(schedule.initial_delay(), Duration::from_secs(5));

        let schedule = schedule.with_initial_delay(Duration::ZERO);
        assert_eq!(schedule.initial_delay(), Duration::ZERO);
    }

    #[test]
    fn converts_from_config() {
        let config = ScheduleConfig {
            initial_delay: Some(Duration::from_secs(1)),
            ..ScheduleConfig::default()
        };
        let schedule = Schedule::try_from(&config).unwrap();
        assert_eq!(schedule, Schedule::default().with_initial_delay(Duration::from_secs(1)));
    }
}
