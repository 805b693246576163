//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Deregister:
//!     entry removed → per-check Shutdown triggered → timer and in-flight probe dropped
//!
//! Engine shutdown:
//!     engine Shutdown triggered → workers stop at their next timer
//!     → in-flight probes awaited up to the grace period → stragglers aborted
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: forced abort after the grace period
//! - Signals are level-triggered so late subscribers never miss them

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
