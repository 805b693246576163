//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler and check workers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON)
//!     → Any metrics recorder installed by the application
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError};
