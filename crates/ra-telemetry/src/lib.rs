//! # Remote-Accel Telemetry
//!
//! Structured logging and Prometheus metrics for the agent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ra_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RA_SERVICE_NAME` | `ra-agent` | Service name in startup logs |
//! | `RA_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `RA_JSON_LOGS` | `false` | JSON log output |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, record_request, register_metrics, ConnectionGuard,
    CONNECTIONS_ACTIVE, DECODE_FAILURES, REQUESTS_TOTAL, REQUEST_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the logging subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
