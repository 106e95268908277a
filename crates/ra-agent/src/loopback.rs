//! In-process transport: the client and the agent context share a process.

use crate::service::handle_line;
use ra_03_dispatch::{DeviceDriver, RemoteContext};
use ra_04_proxy::{Transport, TransportError};
use std::sync::Arc;

/// Hands each request straight to a `RemoteContext`.
pub struct LoopbackTransport<D: DeviceDriver> {
    ctx: Arc<RemoteContext<D>>,
}

impl<D: DeviceDriver> LoopbackTransport<D> {
    pub fn new(ctx: Arc<RemoteContext<D>>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<RemoteContext<D>> {
        &self.ctx
    }
}

impl<D: DeviceDriver> Transport for LoopbackTransport<D> {
    fn send_and_receive(&self, request: &str) -> Result<String, TransportError> {
        handle_line(&self.ctx, request).map_err(|e| TransportError::Io(e.to_string()))
    }
}
