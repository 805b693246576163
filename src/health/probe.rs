//! Probe abstraction and execution.
//!
//! A probe is any async function returning `Ok(())` when the dependency is
//! healthy. Errors, timeouts and panics are all recorded as failures.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// Error returned by a failing probe.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// A single health check invocation.
pub trait Probe: Send + Sync + 'static {
    fn check(&self) -> BoxFuture<'static, Result<(), ProbeError>>;
}

impl<F, Fut> Probe for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    fn check(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        Box::pin(self())
    }
}

/// Result of a single probe execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe returned `Ok(())`.
    Healthy,
    /// The probe returned an error.
    Unhealthy(String),
    /// The probe did not finish within its timeout.
    TimedOut,
    /// The probe panicked.
    Panicked,
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::Unhealthy(_) => "unhealthy",
            ProbeOutcome::TimedOut => "timeout",
            ProbeOutcome::Panicked => "panic",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Unhealthy(reason) => write!(f, "unhealthy: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Run `probe` once, bounded by `timeout`.
pub async fn run_probe(probe: &dyn Probe, timeout: Duration) -> ProbeOutcome {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| probe.check())) {
        Ok(future) => future,
        Err(_) => return ProbeOutcome::Panicked,
    };

    match tokio::time::timeout(timeout, AssertUnwindSafe(future).catch_unwind()).await {
        Ok(Ok(Ok(()))) => ProbeOutcome::Healthy,
        Ok(Ok(Err(e))) => ProbeOutcome::Unhealthy(e.to_string()),
        Ok(Err(_)) => ProbeOutcome::Panicked,
        Err(_) => ProbeOutcome::TimedOut,
    }
}
