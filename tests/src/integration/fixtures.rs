//! Agent and client setup shared by the scenarios.

use ra_03_dispatch::RemoteContext;
use ra_04_proxy::{ClientConfig, RemoteClient, Token};
use ra_agent::{LoopbackTransport, SimulatedDriver};
use shared_types::{HostName, WireFormat};
use std::sync::Arc;

pub type LoopbackClient = RemoteClient<LoopbackTransport<SimulatedDriver>>;

/// One agent session backed by a simulated accelerator farm.
pub struct Agent {
    pub driver: Arc<SimulatedDriver>,
    pub ctx: Arc<RemoteContext<SimulatedDriver>>,
}

impl Agent {
    pub fn new(devices: usize) -> Self {
        let driver = Arc::new(SimulatedDriver::new(devices));
        let ctx = Arc::new(RemoteContext::new(
            Arc::clone(&driver),
            host("agent"),
            WireFormat::Compact,
        ));
        Self { driver, ctx }
    }

    /// A client sharing this session.
    pub fn client(&self, name: &str) -> LoopbackClient {
        RemoteClient::new(
            LoopbackTransport::new(Arc::clone(&self.ctx)),
            ClientConfig::new(name).unwrap(),
        )
    }
}

pub fn host(name: &str) -> HostName {
    HostName::new(name).unwrap()
}

pub fn tokens(client: &LoopbackClient) -> Vec<Token> {
    client.enumerate(&[], 16).unwrap().tokens
}
