//! Probe type registry.
//!
//! Maps the `type` discriminator of a configured check to a factory that
//! builds its probe from the check's `options` table. Populated explicitly at
//! startup; `with_builtins` adds the probe types shipped with this crate.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::HealthCheckConfig;
use crate::health::probe::{Probe, ProbeError};

/// Builds a probe from probe-specific options.
pub type ProbeFactory = fn(&toml::Table) -> Result<Arc<dyn Probe>, ProbeBuildError>;

#[derive(Debug, Error)]
pub enum ProbeBuildError {
    #[error("unknown probe type '{0}'")]
    UnknownType(String),

    #[error("invalid options for '{kind}' probe: {reason}")]
    InvalidOptions { kind: &'static str, reason: String },
}

/// Registry of probe factories keyed by type name.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    factories: HashMap<String, ProbeFactory>,
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ProbeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in probe types (`tcp`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("tcp", TcpProbe::from_options);
        registry
    }

    /// Add or replace the factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: ProbeFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build the probe for a configured check.
    pub fn build(&self, config: &HealthCheckConfig) -> Result<Arc<dyn Probe>, ProbeBuildError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| ProbeBuildError::UnknownType(config.kind.clone()))?;
        factory(&config.options)
    }
}

/// Healthy when a TCP connection to `address` can be established.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: Arc<str>,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Arc::from(address.into()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn from_options(options: &toml::Table) -> Result<Arc<dyn Probe>, ProbeBuildError> {
        let address = options
            .get("address")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ProbeBuildError::InvalidOptions {
                kind: "tcp",
                reason: "missing string option 'address'".to_string(),
            })?;
        Ok(Arc::new(TcpProbe::new(address)))
    }
}

impl Probe for TcpProbe {
    fn check(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        let address = self.address.clone();
        Box::pin(async move {
            let stream = TcpStream::connect(&*address).await?;
            drop(stream);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use crate::health::probe::{run_probe, ProbeOutcome};
    use std::time::Duration;

    fn check(kind: &str, options: toml::Table) -> HealthCheckConfig {
        HealthCheckConfig {
            name: "db".to_string(),
            kind: kind.to_string(),
            critical: true,
            timeout: None,
            schedule: ScheduleConfig::default(),
            options,
        }
    }

    fn address_options(address: &str) -> toml::Table {
        let mut options = toml::Table::new();
        options.insert("address".to_string(), toml::Value::String(address.to_string()));
        options
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = ProbeRegistry::with_builtins();
        let Err(err) = registry.build(&check("carrier-pigeon", toml::Table::new())) else {
            panic!("unknown type must not build");
        };
        assert!(matches!(err, ProbeBuildError::UnknownType(kind) if kind == "carrier-pigeon"));
    }

    #[test]
    fn tcp_requires_address() {
        let registry = ProbeRegistry::with_builtins();
        let Err(err) = registry.build(&check("tcp", toml::Table::new())) else {
            panic!("tcp without address must not build");
        };
        assert!(matches!(err, ProbeBuildError::InvalidOptions { kind: "tcp", .. }));
    }

    #[test]
    fn custom_factories_can_be_registered() {
        fn always_ok(_: &toml::Table) -> Result<Arc<dyn Probe>, ProbeBuildError> {
            Ok(Arc::new(|| async { Ok::<(), ProbeError>(()) }))
        }

        let mut registry = ProbeRegistry::new();
        assert!(!registry.contains("noop"));
        registry.register("noop", always_ok);
        assert!(registry.build(&check("noop", toml::Table::new())).is_ok());
    }

    #[tokio::test]
    async fn tcp_probe_succeeds_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let registry = ProbeRegistry::with_builtins();
        let probe = registry.build(&check("tcp", address_options(&addr.to_string()))).unwrap();
        let outcome = run_probe(probe.as_ref(), Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Healthy);
    }

    #[tokio::test]
    async fn tcp_probe_fails_against_closed_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new(addr.to_string());
        let outcome = run_probe(&probe, Duration::from_secs(2)).await;
        assert!(!outcome.is_healthy());
    }
}
