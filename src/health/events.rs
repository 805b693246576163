//! State-change notifications.
//!
//! Transitions are published two ways: a `tokio::sync::broadcast` channel
//! for async consumers and synchronous [`StateListener`] callbacks.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::health::state::HealthState;

/// A dependency moved between health states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Registered dependency name.
    pub name: String,
    pub previous: HealthState,
    pub current: HealthState,
    /// Wall-clock time of the transition.
    pub at: SystemTime,
}

/// Callback invoked on every transition, from the dependency's worker task.
///
/// Implementations must not block. A panicking listener crashes the worker,
/// which is then restarted with backoff.
pub trait StateListener: Send + Sync + 'static {
    fn on_state_changed(&self, change: &StateChange);
}

impl<F> StateListener for F
where
    F: Fn(&StateChange) + Send + Sync + 'static,
{
    fn on_state_changed(&self, change: &StateChange) {
        self(change)
    }
}

/// Read-only copy of a dependency's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub name: String,
    pub state: HealthState,
    pub critical: bool,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub last_transition: Option<SystemTime>,
}
