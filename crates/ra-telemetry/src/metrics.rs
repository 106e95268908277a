//! Prometheus metrics for the agent.
//!
//! All metrics follow the naming convention: `ra_agent_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every agent metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REQUEST METRICS
    // =========================================================================

    /// Dispatched requests by operation and result code
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ra_agent_requests_total", "Requests dispatched by operation and result"),
        &["op", "result"]
    ).expect("metric creation failed");

    /// Requests whose header could not be read
    pub static ref DECODE_FAILURES: IntCounter = IntCounter::new(
        "ra_agent_decode_failures_total",
        "Requests rejected before dispatch because they could not be decoded"
    ).expect("metric creation failed");

    /// Time from request text to response text
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ra_agent_request_duration_seconds",
            "Time spent dispatching a request, driver call included"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("bucket layout is valid")),
        &["op"]
    ).expect("metric creation failed");

    // =========================================================================
    // CONNECTION METRICS
    // =========================================================================

    /// Open client connections
    pub static ref CONNECTIONS_ACTIVE: IntGauge = IntGauge::new(
        "ra_agent_connections_active",
        "Number of currently connected clients"
    ).expect("metric creation failed");
}

/// Register all metrics with `REGISTRY`. Calling it again is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(DECODE_FAILURES.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(CONNECTIONS_ACTIVE.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Count one dispatched request and observe its duration.
pub fn record_request(op: &str, result: &str, elapsed: Duration) {
    REQUESTS_TOTAL.with_label_values(&[op, result]).inc();
    REQUEST_DURATION
        .with_label_values(&[op])
        .observe(elapsed.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Tracks one open connection in `CONNECTIONS_ACTIVE` while alive.
pub struct ConnectionGuard(());

impl ConnectionGuard {
    pub fn open() -> Self {
        CONNECTIONS_ACTIVE.inc();
        Self(())
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        CONNECTIONS_ACTIVE.dec();
    }
}
