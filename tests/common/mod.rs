//! Shared fixtures and invariant checkers for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;

use dispatch_registry::handler::HandlerModule;
use dispatch_registry::protocol::{Address, DispatchKey};
use dispatch_registry::Registry;

pub const OWNER: Address = Address::new([0xEE; 20]);
pub const CALLER: Address = Address::new([0xCC; 20]);

pub fn key(v: u32) -> DispatchKey {
    DispatchKey::from_u32(v)
}

pub fn addr(v: u64) -> Address {
    Address::from_u64(v)
}

/// Module exporting `keys` without routes.
pub fn exporting(name: &str, keys: &[u32]) -> HandlerModule {
    keys.iter()
        .fold(HandlerModule::builder(name), |b, k| b.export(key(*k)))
        .build()
}

/// Owned registry at address 0xD1 with no deployments.
pub fn empty_registry() -> Registry {
    Registry::builder()
        .address(addr(0xD1))
        .owner(OWNER)
        .build()
        .expect("no deployments to conflict")
}

/// Install a subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Forward and backward walks agree with each other and with `group_count`.
pub fn assert_list_integrity(registry: &Registry) {
    let store = registry.store();
    let list = registry.list();

    if list.group_count == 0 {
        assert_eq!(list.head, None, "empty list must have no head");
        assert_eq!(list.tail, None, "empty list must have no tail");
        return;
    }

    let mut forward = Vec::new();
    let mut cursor = list.head;
    while let Some(k) = cursor {
        assert!(forward.len() <= list.group_count, "forward walk does not terminate");
        let node = store.node(k).expect("linked head must be registered");
        forward.push(k);
        cursor = node.next;
    }

    let mut backward = Vec::new();
    let mut cursor = list.tail;
    while let Some(k) = cursor {
        assert!(backward.len() <= list.group_count, "backward walk does not terminate");
        let node = store.node(k).expect("linked head must be registered");
        backward.push(k);
        cursor = node.prev;
    }
    backward.reverse();

    assert_eq!(forward.len(), list.group_count);
    assert_eq!(forward, backward);
    assert_eq!(forward.last().copied(), list.tail);
}

/// `key_count` equals the number of registered keys.
pub fn assert_count_consistency(registry: &Registry) {
    let registered = registry.store().nodes().count();
    assert_eq!(registry.list().key_count, registered);
}

/// Every group key maps to exactly its handler and appears in one group.
pub fn assert_uniqueness(registry: &Registry) {
    let mut seen = HashSet::new();
    for group in registry.groups().expect("groups must import") {
        for k in &group.keys {
            assert!(seen.insert(*k), "key {} appears in two groups", k);
            assert_eq!(registry.handler_for(*k), Some(group.handler));
        }
    }
}

/// All structural invariants.
pub fn assert_invariants(registry: &Registry) {
    assert_list_integrity(registry);
    assert_count_consistency(registry);
    assert_uniqueness(registry);
}
