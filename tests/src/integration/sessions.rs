//! # Session Flows
//!
//! Client calls travelling through the loopback transport into an agent
//! context and the simulated driver behind it.
//!
//! 1. **Discovery**: enumerate with and without filters
//! 2. **Handles**: independent opens, close cascade
//! 3. **Tokens**: destroy semantics and clones
//! 4. **Release**: the session ends under a live client

use super::fixtures::{tokens, Agent};
use ra_02_registry::RegistryKind;
use ra_03_dispatch::OPEN_SHARED;
use ra_04_proxy::{ProxyRef, RemoteError};
use shared_types::{Properties, ResultCode};

// =============================================================================
// DISCOVERY
// =============================================================================

#[test]
fn test_enumerate_with_no_matching_device() {
    let agent = Agent::new(2);
    let client = agent.client("client");
    let filter = Properties {
        vendor_id: Some(0x1172),
        ..Properties::default()
    };

    let found = client.enumerate(&[filter], 8).unwrap();

    assert!(found.tokens.is_empty());
    assert_eq!(found.num_matches, 0);
    assert_eq!(client.live_proxies(), 0);
    assert_eq!(agent.ctx.live_identities(), 0);
}

#[test]
fn test_enumerate_filter_selects_one_device() {
    let agent = Agent::new(3);
    let client = agent.client("client");
    let all = tokens(&client);
    let wanted = client.cached_properties(all[2]).unwrap();
    let filter = Properties {
        bus: wanted.bus,
        ..Properties::default()
    };

    let found = client.enumerate(&[filter], 8).unwrap();

    assert_eq!(found.num_matches, 1);
    assert_eq!(client.cached_properties(found.tokens[0]).unwrap().bus, wanted.bus);
}

// =============================================================================
// HANDLES
// =============================================================================

#[test]
fn test_two_opens_are_independent() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let token = tokens(&client)[0];

    let first = client.open(token, OPEN_SHARED).unwrap();
    let second = client.open(token, OPEN_SHARED).unwrap();
    let first_id = client.remote_id(ProxyRef::Handle(first)).unwrap();
    let second_id = client.remote_id(ProxyRef::Handle(second)).unwrap();
    assert_ne!(first_id, second_id);

    client.map_mmio(second, 0).unwrap();
    client.write_mmio64(second, 0, 0x20, 7).unwrap();
    client.close(first).unwrap();

    assert!(!agent.ctx.is_live(RegistryKind::Handle, &first_id));
    assert_eq!(client.read_mmio64(second, 0, 0x20).unwrap(), 7);
}

#[test]
fn test_read_from_unmapped_region_is_invalid_param() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let handle = client.open(tokens(&client)[0], 0).unwrap();
    let calls = agent.driver.calls();

    assert_eq!(
        client.read_mmio32(handle, 0, 0x10).unwrap_err(),
        RemoteError::Remote(ResultCode::InvalidParam)
    );
    assert_eq!(agent.driver.calls(), calls);
}

#[test]
fn test_close_leaves_no_child_identity_resolvable() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let handle = client.open(tokens(&client)[0], 0).unwrap();
    let mmio = client.map_mmio(handle, 1).unwrap();
    let buffer = client.prepare_buffer(handle, 4096, None, 0).unwrap();
    let object = client.handle_get_object(handle, "errors", 0).unwrap();

    let children = [
        (RegistryKind::Mmio, client.remote_id(ProxyRef::Mmio(mmio)).unwrap()),
        (RegistryKind::Buffer, client.remote_id(ProxyRef::Buffer(buffer)).unwrap()),
        (RegistryKind::Sysobject, client.remote_id(ProxyRef::Sysobject(object)).unwrap()),
    ];

    client.close(handle).unwrap();

    for (kind, id) in children {
        assert!(!agent.ctx.is_live(kind, &id), "{kind} {id} still live");
    }
    let left = agent.driver.outstanding();
    assert_eq!((left.handles, left.mappings, left.buffers), (0, 0, 0));
    assert_eq!(client.get_io_address(buffer).unwrap_err(), RemoteError::StaleProxy);
}

#[test]
fn test_unmap_then_remap_issues_new_identity() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let handle = client.open(tokens(&client)[0], 0).unwrap();

    let before = client.map_mmio(handle, 0).unwrap();
    let before_id = client.remote_id(ProxyRef::Mmio(before)).unwrap();
    client.unmap_mmio(handle, 0).unwrap();
    assert!(client.mapping(handle, 0).is_none());

    let after = client.map_mmio(handle, 0).unwrap();
    assert_ne!(client.remote_id(ProxyRef::Mmio(after)).unwrap(), before_id);
    assert!(!agent.ctx.is_live(RegistryKind::Mmio, &before_id));
}

// =============================================================================
// TOKENS
// =============================================================================

#[test]
fn test_destroy_token_keeps_handle_and_drops_token_objects() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let token = tokens(&client)[0];
    let handle = client.open(token, 0).unwrap();
    let token_object = client.token_get_object(token, "id", 0).unwrap();
    let handle_object = client.handle_get_object(handle, "id", 0).unwrap();

    client.destroy_token(token).unwrap();

    assert_eq!(client.get_properties(token).unwrap_err(), RemoteError::StaleProxy);
    assert_eq!(client.object_read64(token_object, 0).unwrap_err(), RemoteError::StaleProxy);
    client.object_read64(handle_object, 0).unwrap();
    client.reset(handle).unwrap();
    client.get_properties_from_handle(handle).unwrap();
}

#[test]
fn test_clone_survives_destroying_the_source() {
    let agent = Agent::new(1);
    let client = agent.client("client");
    let token = tokens(&client)[0];
    let copy = client.clone_token(token).unwrap();
    assert_ne!(
        client.remote_id(ProxyRef::Token(token)),
        client.remote_id(ProxyRef::Token(copy))
    );

    client.destroy_token(token).unwrap();

    let handle = client.open(copy, 0).unwrap();
    client.close(handle).unwrap();
}

// =============================================================================
// RELEASE
// =============================================================================

#[test]
fn test_release_frees_driver_resources_and_ends_session() {
    let agent = Agent::new(2);
    let client = agent.client("client");
    for token in tokens(&client) {
        let handle = client.open(token, OPEN_SHARED).unwrap();
        client.map_mmio(handle, 0).unwrap();
        client.prepare_buffer(handle, 8192, None, 0).unwrap();
        client.handle_get_object(handle, "errors/first_error", 0).unwrap();
    }
    assert!(agent.driver.outstanding().total() > 0);

    agent.ctx.release();

    assert_eq!(agent.driver.outstanding().total(), 0);
    assert_eq!(agent.ctx.live_identities(), 0);
    assert_eq!(
        client.enumerate(&[], 1).unwrap_err(),
        RemoteError::Remote(ResultCode::NoDaemon)
    );
    assert_eq!(client.live_proxies(), 0);
}
