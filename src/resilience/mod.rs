//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Check worker crashes (panic in a listener or the worker itself):
//!     → supervisor observes the JoinError
//!     → backoff.rs (exponential delay + jitter)
//!     → worker restarted with preserved state
//! ```
//!
//! # Design Decisions
//! - A crashed worker is never silently dropped
//! - Jittered backoff prevents restart storms

pub mod backoff;

pub use backoff::calculate_backoff;
