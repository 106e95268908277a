//! # Network Sessions
//!
//! The client over the line-delimited TCP transport against a running
//! agent server. Each connection is its own session.

use super::fixtures::host;
use ra_04_proxy::{ClientConfig, RemoteClient, RemoteError};
use ra_agent::{AgentServer, SimulatedDriver, TcpTransport};
use shared_types::{ResultCode, WireFormat};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn start_agent(devices: usize) -> (Arc<SimulatedDriver>, Arc<AgentServer<SimulatedDriver>>, SocketAddr) {
    let driver = Arc::new(SimulatedDriver::new(devices));
    let server = Arc::new(AgentServer::new(
        Arc::clone(&driver),
        host("agent"),
        WireFormat::Compact,
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.run(listener).await });
    (driver, server, addr)
}

fn connect(addr: SocketAddr, name: &str) -> RemoteClient<TcpTransport> {
    let transport = TcpTransport::connect(addr, Some(Duration::from_secs(5))).unwrap();
    RemoteClient::new(transport, ClientConfig::new(name).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connections_are_separate_sessions() {
    let (driver, server, addr) = start_agent(1).await;

    tokio::task::spawn_blocking(move || {
        let first = connect(addr, "first");
        let second = connect(addr, "second");
        let token = first.enumerate(&[], 1).unwrap().tokens[0];
        let handle = first.open(token, 0).unwrap();
        first.map_mmio(handle, 0).unwrap();
        first.write_mmio32(handle, 0, 0x10, 0x5a5a).unwrap();

        // The device is opened exclusively by the first session.
        let other = second.enumerate(&[], 1).unwrap().tokens[0];
        assert_eq!(
            second.open(other, 0).unwrap_err(),
            RemoteError::Remote(ResultCode::Busy)
        );

        first.close(handle).unwrap();
        let handle = second.open(other, 0).unwrap();
        second.map_mmio(handle, 0).unwrap();
        assert_eq!(second.read_mmio32(handle, 0, 0x10).unwrap(), 0x5a5a);
    })
    .await
    .unwrap();

    for _ in 0..100 {
        if driver.outstanding().total() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(driver.outstanding().total(), 0);
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_error_registers_over_tcp() {
    let (driver, server, addr) = start_agent(1).await;
    driver.inject_error(0, 1, 0x4).unwrap();

    tokio::task::spawn_blocking(move || {
        let client = connect(addr, "client");
        let token = client.enumerate(&[], 1).unwrap().tokens[0];
        let info = client.get_error_info(token, 1).unwrap();
        assert!(info.can_clear);
        assert_eq!(client.read_error(token, 1).unwrap(), 0x4);
        client.clear_all_errors(token).unwrap();
        assert_eq!(client.read_error(token, 1).unwrap(), 0);
    })
    .await
    .unwrap();
    server.shutdown();
}
