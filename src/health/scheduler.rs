//! Health-check scheduler.
//!
//! Every registered dependency gets its own supervised worker task that
//! sleeps for the schedule's interval, runs the probe and applies the result
//! to the dependency's [`HealthCheckState`]. Dependencies share nothing but
//! the sharded name map, so a slow probe never delays another dependency.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{HealthCheckConfig, SchedulerConfig};
use crate::health::events::{HealthSnapshot, StateChange, StateListener};
use crate::health::probe::{run_probe, Probe, ProbeOutcome};
use crate::health::registry::{ProbeBuildError, ProbeRegistry};
use crate::health::schedule::{Schedule, ScheduleError};
use crate::health::state::{HealthCheckState, HealthState};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::resilience::calculate_backoff;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("health check '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("health check '{0}' is not registered")]
    NotFound(String),

    #[error("scheduler has been shut down")]
    ShutDown,

    #[error("{aborted} health check worker(s) did not finish within the shutdown grace period")]
    GracePeriodElapsed { aborted: usize },

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Probe(#[from] ProbeBuildError),
}

/// Per-check registration options.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    /// Counts towards [`HealthCheckScheduler::is_healthy`].
    pub critical: bool,
    /// Probe timeout; `None` uses the scheduler default.
    pub timeout: Option<Duration>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            critical: true,
            timeout: None,
        }
    }
}

/// State guarded by the per-check lock.
#[derive(Debug)]
struct Slot {
    state: HealthCheckState,
    removed: bool,
}

/// Everything a worker needs, shared with `tick`.
struct CheckContext {
    name: String,
    generation: u64,
    schedule: Schedule,
    critical: bool,
    timeout: Duration,
    probe: Arc<dyn Probe>,
    slot: Mutex<Slot>,
    events: broadcast::Sender<StateChange>,
    listeners: Arc<[Arc<dyn StateListener>]>,
}

/// Outcome of applying one probe result.
struct Applied {
    state: HealthState,
    change: Option<StateChange>,
    next_delay: Duration,
}

impl CheckContext {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a probe result. `None` if the check was removed meanwhile.
    fn apply(&self, outcome: &ProbeOutcome) -> Option<Applied> {
        let mut slot = self.lock();
        if slot.removed {
            debug!(check = %self.name, generation = self.generation, "discarding probe result for removed check");
            return None;
        }

        metrics::record_probe(&self.name, outcome);
        let change = slot
            .state
            .record(outcome.is_healthy(), SystemTime::now())
            .map(|t| StateChange {
                name: self.name.clone(),
                previous: t.from,
                current: t.to,
                at: t.at,
            });

        if !outcome.is_healthy() {
            debug!(
                check = %self.name,
                outcome = %outcome,
                consecutive_failures = slot.state.consecutive_failures(),
                "health probe failed"
            );
        }

        if let Some(change) = &change {
            match change.current {
                HealthState::Unhealthy => warn!(
                    check = %self.name,
                    previous = %change.previous,
                    threshold = self.schedule.failure_attempts(),
                    "health check marked unhealthy"
                ),
                _ => info!(
                    check = %self.name,
                    previous = %change.previous,
                    current = %change.current,
                    "health check state changed"
                ),
            }
            metrics::record_transition(&self.name, change.current);
            metrics::record_status(&self.name, change.current);
            // Sent under the lock so subscribers see transitions in apply order.
            let _ = self.events.send(change.clone());
        }

        Some(Applied {
            state: slot.state.state(),
            change,
            next_delay: slot.state.next_delay(&self.schedule),
        })
    }

    /// Call every listener; a panicking listener is logged and skipped.
    fn notify(&self, change: &StateChange) {
        for listener in self.listeners.iter() {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_state_changed(change)));
            if let Err(payload) = delivered {
                error!(
                    check = %self.name,
                    current = %change.current,
                    panic = panic_message(&*payload),
                    "state listener panicked"
                );
            }
        }
    }

    fn snapshot(&self) -> HealthSnapshot {
        let slot = self.lock();
        HealthSnapshot {
            name: self.name.clone(),
            state: slot.state.state(),
            critical: self.critical,
            consecutive_successes: slot.state.consecutive_successes(),
            consecutive_failures: slot.state.consecutive_failures(),
            last_transition: slot.state.last_transition(),
        }
    }
}

/// Map entry for one registered check.
struct Registration {
    context: Arc<CheckContext>,
    cancel: Shutdown,
    supervisor: JoinHandle<()>,
}

impl Registration {
    /// Mark removed under the check lock, then cancel its timer and probe.
    fn retire(&self) {
        self.context.lock().removed = true;
        self.cancel.trigger();
    }
}

struct Inner {
    config: SchedulerConfig,
    checks: DashMap<String, Registration>,
    events: broadcast::Sender<StateChange>,
    listeners: Arc<[Arc<dyn StateListener>]>,
    shutdown: Shutdown,
    next_generation: AtomicU64,
}

/// Periodic health-check scheduler.
///
/// Cheap to clone; all clones drive the same set of checks. Must be used
/// from within a tokio runtime.
#[derive(Clone)]
pub struct HealthCheckScheduler {
    inner: Arc<Inner>,
}

impl HealthCheckScheduler {
    /// Create a scheduler with no listeners.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_listeners(config, Vec::new())
    }

    /// Create a scheduler that calls `listeners` on every transition.
    pub fn with_listeners(config: SchedulerConfig, listeners: Vec<Arc<dyn StateListener>>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                checks: DashMap::new(),
                events,
                listeners: listeners.into(),
                shutdown: Shutdown::new(),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Register a critical check using the default probe timeout.
    pub fn register<P: Probe>(
        &self,
        name: impl Into<String>,
        probe: P,
        schedule: Schedule,
    ) -> Result<(), SchedulerError> {
        self.register_with(name, Arc::new(probe), schedule, CheckOptions::default())
    }

    /// Register a check with explicit options.
    pub fn register_with(
        &self,
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
        schedule: Schedule,
        options: CheckOptions,
    ) -> Result<(), SchedulerError> {
        let name = name.into();
        if self.inner.shutdown.is_triggered() {
            return Err(SchedulerError::ShutDown);
        }

        match self.inner.checks.entry(name.clone()) {
            Entry::Occupied(_) => Err(SchedulerError::DuplicateRegistration(name)),
            // Re-checked under the shard lock so `shutdown` cannot miss the entry.
            Entry::Vacant(_) if self.inner.shutdown.is_triggered() => Err(SchedulerError::ShutDown),
            Entry::Vacant(vacant) => {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                let context = Arc::new(CheckContext {
                    name: name.clone(),
                    generation,
                    schedule,
                    critical: options.critical,
                    timeout: options.timeout.unwrap_or(self.inner.config.probe_timeout),
                    probe,
                    slot: Mutex::new(Slot {
                        state: HealthCheckState::new(&schedule),
                        removed: false,
                    }),
                    events: self.inner.events.clone(),
                    listeners: self.inner.listeners.clone(),
                });
                let cancel = Shutdown::new();
                let supervisor = tokio::spawn(supervise(
                    context.clone(),
                    cancel.subscribe(),
                    self.inner.shutdown.subscribe(),
                    self.inner.config.clone(),
                ));
                metrics::record_status(&name, HealthState::Unknown);
                vacant.insert(Registration {
                    context,
                    cancel,
                    supervisor,
                });
                info!(
                    check = %name,
                    generation,
                    check_interval = ?schedule.check_interval(),
                    downtime_interval = ?schedule.downtime_interval(),
                    "health check registered"
                );
                Ok(())
            }
        }
    }

    /// Register a configured check, building its probe through `registry`.
    pub fn register_from_config(
        &self,
        config: &HealthCheckConfig,
        registry: &ProbeRegistry,
    ) -> Result<(), SchedulerError> {
        let schedule = Schedule::try_from(&config.schedule)?;
        let probe = registry.build(config)?;
        self.register_with(
            config.name.clone(),
            probe,
            schedule,
            CheckOptions {
                critical: config.critical,
                timeout: config.timeout,
            },
        )
    }

    /// Stop probing `name` and drop its state.
    ///
    /// Cancels the pending timer and any in-flight probe; a result that
    /// completes concurrently is discarded. Errors with `NotFound` if absent.
    pub fn deregister(&self, name: &str) -> Result<(), SchedulerError> {
        let (_, registration) = self
            .inner
            .checks
            .remove(name)
            .ok_or_else(|| SchedulerError::NotFound(name.to_string()))?;
        registration.retire();
        info!(check = %name, generation = registration.context.generation, "health check deregistered");
        Ok(())
    }

    /// Current health of `name`. Side-effect free.
    pub fn current_state(&self, name: &str) -> Result<HealthState, SchedulerError> {
        self.with_context(name, |ctx| ctx.lock().state.state())
    }

    /// Full state of `name`, including counters.
    pub fn snapshot(&self, name: &str) -> Result<HealthSnapshot, SchedulerError> {
        self.with_context(name, CheckContext::snapshot)
    }

    /// Snapshots of every registered check, sorted by name.
    pub fn snapshots(&self) -> Vec<HealthSnapshot> {
        let contexts: Vec<Arc<CheckContext>> = self
            .inner
            .checks
            .iter()
            .map(|r| r.value().context.clone())
            .collect();
        let mut snapshots: Vec<_> = contexts.iter().map(|ctx| ctx.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Names of registered checks, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.checks.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.checks.contains_key(name)
    }

    /// True when every critical check is healthy. Unknown counts as not healthy.
    pub fn is_healthy(&self) -> bool {
        self.snapshots()
            .iter()
            .filter(|s| s.critical)
            .all(|s| s.state == HealthState::Healthy)
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.events.subscribe()
    }

    /// Probe `name` immediately and apply the result.
    ///
    /// Independent of the periodic timer, which keeps its own pace. Returns
    /// `NotFound` if the check is absent or was removed while probing.
    pub async fn tick(&self, name: &str) -> Result<HealthState, SchedulerError> {
        let context = self.context(name)?;
        let outcome = run_probe(context.probe.as_ref(), context.timeout).await;
        let applied = context
            .apply(&outcome)
            .ok_or_else(|| SchedulerError::NotFound(name.to_string()))?;
        if let Some(change) = &applied.change {
            context.notify(change);
        }
        Ok(applied.state)
    }

    /// Stop every check.
    ///
    /// New registrations are rejected from here on. Pending timers stop at
    /// once; in-flight probes get the configured grace period to finish
    /// before their workers are aborted.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.inner.shutdown.trigger();

        let names: Vec<String> = self.inner.checks.iter().map(|r| r.key().clone()).collect();
        let mut supervisors = Vec::with_capacity(names.len());
        // Per-check cancel tokens stay alive until the workers finish, so an
        // in-flight probe is not cancelled by the token being dropped.
        let mut cancels = Vec::with_capacity(names.len());
        for name in names {
            if let Some((_, registration)) = self.inner.checks.remove(&name) {
                supervisors.push(registration.supervisor);
                cancels.push(registration.cancel);
            }
        }

        let total = supervisors.len();
        info!(checks = total, grace = ?self.inner.config.shutdown_grace, "shutting down health checks");

        let aborts: Vec<_> = supervisors.iter().map(|h| h.abort_handle()).collect();
        let drained =
            tokio::time::timeout(self.inner.config.shutdown_grace, join_all(supervisors)).await;

        let result = match drained {
            Ok(_) => {
                info!("all health checks stopped");
                Ok(())
            }
            Err(_) => {
                let aborted = aborts.iter().filter(|h| !h.is_finished()).count();
                for handle in &aborts {
                    handle.abort();
                }
                warn!(aborted, "shutdown grace period elapsed, aborting health checks");
                Err(SchedulerError::GracePeriodElapsed { aborted })
            }
        };
        drop(cancels);
        result
    }

    fn context(&self, name: &str) -> Result<Arc<CheckContext>, SchedulerError> {
        self.inner
            .checks
            .get(name)
            .map(|r| r.value().context.clone())
            .ok_or_else(|| SchedulerError::NotFound(name.to_string()))
    }

    fn with_context<T>(
        &self,
        name: &str,
        f: impl FnOnce(&CheckContext) -> T,
    ) -> Result<T, SchedulerError> {
        let context = self.context(name)?;
        Ok(f(&context))
    }
}

/// Aborts the worker when the supervisor itself is aborted.
struct WorkerHandle(JoinHandle<()>);

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Keep the check worker running until cancelled.
///
/// A restarted worker resumes from the check's current state, so the next
/// probe follows the interval for that state.
async fn supervise(
    context: Arc<CheckContext>,
    cancel: ShutdownSignal,
    engine: ShutdownSignal,
    config: SchedulerConfig,
) {
    let mut started = false;
    let name = context.name.clone();
    restart_on_panic(&name, cancel.clone(), engine.clone(), &config, || {
        let delay = if started {
            context.lock().state.next_delay(&context.schedule)
        } else {
            context.schedule.initial_delay()
        };
        started = true;
        tokio::spawn(run_worker(context.clone(), cancel.clone(), engine.clone(), delay))
    })
    .await;
    debug!(check = %name, "health check supervisor exiting");
}

/// Respawn a worker with backoff each time it panics.
///
/// The backoff starts over once a worker has stayed up for at least
/// `restart_max_delay`. Returns the number of restarts.
async fn restart_on_panic<F>(
    name: &str,
    mut cancel: ShutdownSignal,
    mut engine: ShutdownSignal,
    config: &SchedulerConfig,
    mut spawn: F,
) -> u32
where
    F: FnMut() -> JoinHandle<()>,
{
    let mut attempt = 0u32;
    let mut restarts = 0u32;

    loop {
        let spawned_at = Instant::now();
        let mut worker = WorkerHandle(spawn());

        match (&mut worker.0).await {
            Err(e) if e.is_panic() => {
                if cancel.is_triggered() || engine.is_triggered() {
                    break;
                }
                if spawned_at.elapsed() >= config.restart_max_delay {
                    attempt = 0;
                }
                attempt = attempt.saturating_add(1);
                restarts = restarts.saturating_add(1);
                let backoff =
                    calculate_backoff(attempt, config.restart_base_delay, config.restart_max_delay);
                let payload = e.into_panic();
                error!(
                    check = %name,
                    attempt,
                    backoff = ?backoff,
                    panic = panic_message(&*payload),
                    "health check worker crashed, restarting"
                );
                drop(payload);
                metrics::record_worker_restart(name);

                tokio::select! {
                    biased;
                    _ = cancel.recv() => break,
                    _ = engine.recv() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
            _ => break,
        }
    }
    restarts
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// The timer loop for a single check.
async fn run_worker(
    context: Arc<CheckContext>,
    mut cancel: ShutdownSignal,
    mut engine: ShutdownSignal,
    mut delay: Duration,
) {
    debug!(check = %context.name, first_probe_in = ?delay, "health check loop starting");

    loop {
        tokio::select! {
            biased;
            _ = cancel.recv() => break,
            _ = engine.recv() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        // Engine shutdown lets an in-flight probe finish; deregistration does not.
        let outcome = tokio::select! {
            biased;
            _ = cancel.recv() => break,
            outcome = run_probe(context.probe.as_ref(), context.timeout) => outcome,
        };

        let Some(applied) = context.apply(&outcome) else {
            break;
        };
        if let Some(change) = &applied.change {
            context.notify(change);
        }
        delay = applied.next_delay;
    }

    debug!(check = %context.name, "health check loop stopped");
}
