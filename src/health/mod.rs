//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler (scheduler.rs):
//!     Per-check timer (check_interval, or downtime_interval while unhealthy)
//!     → run probe (probe.rs), errors/timeouts/panics become failures
//!     → update state.rs under the per-check lock
//!     → on transition: broadcast + listeners (events.rs)
//!
//! Configured checks:
//!     HealthCheckConfig → registry.rs (type → probe factory)
//!     ScheduleConfig → schedule.rs (validated Schedule)
//! ```
//!
//! # Design Decisions
//! - State transitions require consecutive successes/failures
//! - Health state is per-dependency; no lock spans dependencies
//! - Results are applied in completion order; removed checks ignore late results

pub mod events;
pub mod probe;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod state;

pub use events::{HealthSnapshot, StateChange, StateListener};
pub use probe::{run_probe, Probe, ProbeError, ProbeOutcome};
pub use registry::{ProbeBuildError, ProbeFactory, ProbeRegistry, TcpProbe};
pub use schedule::{Schedule, ScheduleError};
pub use scheduler::{CheckOptions, HealthCheckScheduler, SchedulerError};
pub use state::{HealthCheckState, HealthState, Transition};
