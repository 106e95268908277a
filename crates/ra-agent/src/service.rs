//! # Agent Service
//!
//! Line-delimited JSON over TCP. Every connection owns one
//! `RemoteContext`; its requests are answered in order, one at a time, and
//! the context is released when the connection ends. Driver calls run on
//! the blocking pool so a slow device never stalls the accept loop.
//!
//! A request line longer than the frame limit closes the connection before
//! any of it is decoded.

use crate::admin::admin_router;
use crate::config::DEFAULT_MAX_FRAME_LEN;
use crate::framing::to_frame;
use futures::StreamExt;
use ra_03_dispatch::{DeviceDriver, DispatchError, RemoteContext};
use ra_telemetry::{record_request, ConnectionGuard, DECODE_FAILURES};
use shared_types::{HostName, WireFormat};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Answers one encoded request and records request metrics.
pub fn handle_line<D: DeviceDriver>(
    ctx: &RemoteContext<D>,
    line: &str,
) -> Result<String, DispatchError> {
    let start = Instant::now();
    match ctx.handle_request(line) {
        Ok(outcome) => {
            record_request(outcome.op.name(), outcome.result.as_str(), start.elapsed());
            Ok(outcome.response)
        }
        Err(err) => {
            DECODE_FAILURES.inc();
            Err(err)
        }
    }
}

/// TCP front end of the agent.
pub struct AgentServer<D: DeviceDriver> {
    driver: Arc<D>,
    hostname: HostName,
    format: WireFormat,
    max_frame_len: usize,
    shutdown_tx: watch::Sender<bool>,
}

impl<D: DeviceDriver> AgentServer<D> {
    pub fn new(driver: Arc<D>, hostname: HostName, format: WireFormat) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            driver,
            hostname,
            format,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            shutdown_tx,
        }
    }

    /// Caps the length of one request line.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Accepts connections until `shutdown` is called.
    pub async fn run(&self, listener: TcpListener) -> io::Result<()> {
        let mut shutdown = self.shutdown_tx.subscribe();
        info!(addr = %listener.local_addr()?, host = %self.hostname, "agent listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let ctx = RemoteContext::new(Arc::clone(&self.driver), self.hostname, self.format);
                        let conn_shutdown = self.shutdown_tx.subscribe();
                        tokio::spawn(serve_connection(ctx, stream, peer, self.max_frame_len, conn_shutdown));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                _ = shutdown.changed() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Serves `/health` and `/metrics` until `shutdown` is called.
    pub async fn run_metrics(&self, listener: TcpListener) -> io::Result<()> {
        let mut shutdown = self.shutdown_tx.subscribe();
        info!(addr = %listener.local_addr()?, "metrics endpoint listening");
        axum::serve(listener, admin_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
    }

    /// Stops the accept loop and every connection.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

async fn serve_connection<D: DeviceDriver>(
    ctx: RemoteContext<D>,
    stream: TcpStream,
    peer: SocketAddr,
    max_frame_len: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let _connection = ConnectionGuard::open();
    let ctx = Arc::new(ctx);
    info!(%peer, "client connected");

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(max_frame_len));

    loop {
        let line = tokio::select! {
            line = lines.next() => line,
            _ = shutdown.changed() => break,
        };
        let line = match line {
            Some(Ok(line)) => line,
            None => break,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(%peer, max_frame_len, "request exceeds frame limit, closing connection");
                DECODE_FAILURES.inc();
                break;
            }
            Some(Err(e)) => {
                warn!(%peer, error = %e, "read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let worker = Arc::clone(&ctx);
        let reply = tokio::task::spawn_blocking(move || handle_line(&worker, &line)).await;
        let text = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                // Nothing to correlate a reply with.
                warn!(%peer, error = %e, "undecodable request, closing connection");
                break;
            }
            Err(e) => {
                error!(%peer, error = %e, "dispatch task failed");
                break;
            }
        };
        if let Err(e) = write_half.write_all(to_frame(&text).as_bytes()).await {
            warn!(%peer, error = %e, "write failed");
            break;
        }
    }

    // Native teardown calls the driver.
    if let Err(e) = tokio::task::spawn_blocking(move || ctx.release()).await {
        error!(%peer, error = %e, "context release task failed");
    }
    debug!(%peer, "client disconnected");
}
