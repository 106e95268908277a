//! # Remote-Accel Agent
//!
//! Serves the simulated accelerator farm over TCP.
//!
//! ## Startup Sequence
//!
//! 1. Load telemetry configuration and install logging
//! 2. Load and validate agent configuration
//! 3. Bind the listener, and the metrics listener when `RA_METRICS_ADDR` is set
//! 4. Serve until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use ra_agent::{AgentConfig, AgentServer, SimulatedDriver};
use ra_telemetry::{init_telemetry, TelemetryConfig};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = AgentConfig::from_env();
    config.validate().context("invalid agent configuration")?;
    let addr = config.socket_addr()?;
    let devices = config.device_count()?;

    let driver = Arc::new(SimulatedDriver::new(devices));
    let server = Arc::new(
        AgentServer::new(driver, config.host_name()?, config.format())
            .with_max_frame_len(config.frame_limit()?),
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, devices, "Agent is running. Press Ctrl+C to stop.");

    let metrics_handle = match config.metrics_socket_addr()? {
        Some(metrics_addr) => {
            let metrics_listener = TcpListener::bind(metrics_addr)
                .await
                .with_context(|| format!("failed to bind metrics endpoint {metrics_addr}"))?;
            let serving = Arc::clone(&server);
            Some(tokio::spawn(async move { serving.run_metrics(metrics_listener).await }))
        }
        None => None,
    };

    let serving = Arc::clone(&server);
    let handle = tokio::spawn(async move { serving.run(listener).await });

    tokio::signal::ctrl_c().await.context("failed to wait for Ctrl+C")?;
    server.shutdown();

    match handle.await {
        Ok(Ok(())) => info!("Shutdown complete"),
        Ok(Err(e)) => error!(error = %e, "server stopped with an error"),
        Err(e) => error!(error = %e, "server task failed"),
    }
    if let Some(handle) = metrics_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "metrics endpoint stopped with an error"),
            Err(e) => error!(error = %e, "metrics task failed"),
        }
    }
    Ok(())
}
