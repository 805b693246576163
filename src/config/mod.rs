//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, durations via humantime-serde)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → ScheduleConfig → health::Schedule per check
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::EngineConfig;
pub use schema::HealthCheckConfig;
pub use schema::ObservabilityConfig;
pub use schema::ScheduleConfig;
pub use schema::SchedulerConfig;
pub use validation::{validate_config, ValidationError};
