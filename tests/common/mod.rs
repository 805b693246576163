//! Shared utilities for scheduler integration tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use health_scheduler::config::SchedulerConfig;
use health_scheduler::health::{Probe, ProbeError, Schedule};
use tokio::net::TcpListener;
use tokio::time::Instant;

/// Build a schedule from millisecond intervals.
#[allow(dead_code)]
pub fn schedule(check_ms: u64, downtime_ms: u64, failure_attempts: u32, success_attempts: u32) -> Schedule {
    Schedule::new(
        Duration::from_millis(check_ms),
        Duration::from_millis(downtime_ms),
        failure_attempts,
        success_attempts,
    )
    .unwrap()
}

/// Scheduler config with a short restart backoff.
#[allow(dead_code)]
pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        probe_timeout: Duration::from_secs(3600),
        shutdown_grace: Duration::from_secs(5),
        event_capacity: 64,
        restart_base_delay: Duration::from_millis(100),
        restart_max_delay: Duration::from_secs(1),
    }
}

/// Records the time of every probe invocation.
#[derive(Clone, Default)]
pub struct ProbeLog {
    calls: Arc<Mutex<Vec<Instant>>>,
}

#[allow(dead_code)]
impl ProbeLog {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Spacing between consecutive probes.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    fn record(&self) {
        self.calls.lock().unwrap().push(Instant::now());
    }
}

/// A probe that replays `script` (true = healthy) and then repeats `then`.
#[allow(dead_code)]
pub fn scripted_probe(script: Vec<bool>, then: bool) -> (impl Probe, ProbeLog) {
    let log = ProbeLog::default();
    let script = Arc::new(Mutex::new(VecDeque::from(script)));
    let probe_log = log.clone();

    let probe = move || {
        probe_log.record();
        let healthy = script.lock().unwrap().pop_front().unwrap_or(then);
        async move {
            if healthy {
                Ok::<(), ProbeError>(())
            } else {
                Err::<(), ProbeError>("scripted failure".into())
            }
        }
    };
    (probe, log)
}

/// A probe that always returns the same result.
#[allow(dead_code)]
pub fn constant_probe(healthy: bool) -> (impl Probe, ProbeLog) {
    scripted_probe(Vec::new(), healthy)
}

/// Start a TCP listener that accepts and immediately closes connections.
#[allow(dead_code)]
pub async fn start_mock_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => drop(socket),
                Err(_) => break,
            }
        }
    });
    addr
}
