//! Periodic health-check scheduling with threshold-based state transitions.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                      HealthCheckScheduler                        │
//!   │                                                                  │
//!   │   register(name, probe, schedule)                                │
//!   │        │                                                         │
//!   │        ▼                                                         │
//!   │   ┌─────────────┐   sleep(interval)   ┌─────────┐                │
//!   │   │ supervisor  │──▶ worker loop ────▶│  probe  │                │
//!   │   │ (restarts   │        ▲            └────┬────┘                │
//!   │   │  w/ backoff)│        │                 │ outcome             │
//!   │   └─────────────┘        │                 ▼                     │
//!   │                          │        ┌──────────────────┐           │
//!   │                 next_delay ◀──────│ HealthCheckState │ per-check │
//!   │                                   │  (Mutex + flag)  │ lock      │
//!   │                                   └────────┬─────────┘           │
//!   │                                            │ transition          │
//!   │                                            ▼                     │
//!   │                        broadcast::Sender<StateChange> + listeners │
//!   │                                                                  │
//!   │  ┌────────────────────────────────────────────────────────────┐  │
//!   │  │  config (TOML) │ observability │ resilience │ lifecycle     │  │
//!   │  └────────────────────────────────────────────────────────────┘  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use health_scheduler::config::SchedulerConfig;
//! use health_scheduler::health::{HealthCheckScheduler, ProbeError, Schedule};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = HealthCheckScheduler::new(SchedulerConfig::default());
//! let schedule = Schedule::new(Duration::from_millis(2500), Duration::from_secs(25), 2, 1)?;
//! scheduler.register("cache", || async { Ok::<(), ProbeError>(()) }, schedule)?;
//!
//! let state = scheduler.current_state("cache")?;
//! println!("cache is {state}");
//! scheduler.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::EngineConfig;
pub use health::{HealthCheckScheduler, HealthState, Schedule};
