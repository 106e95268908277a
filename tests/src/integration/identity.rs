//! # Identity Resolution
//!
//! Identities the agent never issued, identities issued by another session,
//! and identities created and released from many threads at once.

use super::fixtures::{host, tokens, Agent};
use ra_01_codec::requests::HandleRequest;
use ra_01_codec::{decode_response, encode_request, Request, RequestBody};
use ra_02_registry::{Registry, RegistryKind, RemoteIdGenerator};
use ra_03_dispatch::OPEN_SHARED;
use ra_04_proxy::ProxyRef;
use ra_agent::handle_line;
use shared_types::{RemoteId, ResultCode, WireFormat};
use std::sync::Arc;
use std::thread;

fn reset_via_raw_request(agent: &Agent, handle_id: RemoteId) -> ResultCode {
    let request = Request::new(
        99,
        1,
        host("raw"),
        RequestBody::Reset(HandleRequest { handle_id }),
    );
    let text = encode_request(&request, WireFormat::Compact).unwrap();
    let reply = handle_line(&agent.ctx, &text).unwrap();
    let response = decode_response(&reply).unwrap();
    assert_eq!(response.header.request_id, 99);
    response.result
}

#[test]
fn test_unknown_identity_is_not_found_without_driver_calls() {
    let agent = Agent::new(1);
    let calls = agent.driver.calls();

    let result = reset_via_raw_request(&agent, RemoteId::new(host("agent"), 0xdead_beef));

    assert_eq!(result, ResultCode::NotFound);
    assert_eq!(agent.driver.calls(), calls);
}

#[test]
fn test_identity_from_another_session_is_not_found() {
    let first = Agent::new(1);
    let second = Agent::new(1);
    let client = first.client("client");
    let handle = client.open(tokens(&client)[0], 0).unwrap();
    let handle_id = client.remote_id(ProxyRef::Handle(handle)).unwrap();

    assert_eq!(reset_via_raw_request(&second, handle_id), ResultCode::NotFound);
    assert_eq!(reset_via_raw_request(&first, handle_id), ResultCode::Ok);
}

#[test]
fn test_closed_handle_identity_is_not_found() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let handle = client.open(tokens(&client)[0], 0).unwrap();
    let handle_id = client.remote_id(ProxyRef::Handle(handle)).unwrap();
    client.close(handle).unwrap();

    assert_eq!(reset_via_raw_request(&agent, handle_id), ResultCode::NotFound);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_parallel_sessions_never_see_each_others_registers() {
    let agent = Arc::new(Agent::new(2));
    let workers: Vec<_> = (0..8u64)
        .map(|worker| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || {
                let client = agent.client(&format!("worker-{worker}"));
                let token = tokens(&client)[(worker % 2) as usize];
                for round in 0..20u64 {
                    let handle = client.open(token, OPEN_SHARED).unwrap();
                    client.map_mmio(handle, 0).unwrap();
                    let value = (worker << 32) | round;
                    client.write_mmio64(handle, 0, 0x40, value).unwrap();
                    assert_eq!(client.read_mmio64(handle, 0, 0x40).unwrap(), value);
                    client.close(handle).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    let left = agent.driver.outstanding();
    assert_eq!((left.handles, left.mappings), (0, 0));
}

#[test]
fn test_registry_lookup_under_concurrent_churn() {
    let registry = Arc::new(Registry::<u64>::new(RegistryKind::Handle));
    let ids = Arc::new(RemoteIdGenerator::new(host("agent")));

    let workers: Vec<_> = (0..8u64)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            let ids = Arc::clone(&ids);
            thread::spawn(move || {
                for round in 0..500u64 {
                    let id = ids.next_id();
                    let value = (worker << 32) | round;
                    registry.insert(id, value).unwrap();
                    assert_eq!(*registry.lookup(&id).unwrap(), value);
                    assert_eq!(*registry.remove(&id).unwrap(), value);
                    assert!(registry.lookup(&id).is_err());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert!(registry.is_empty());
}
