//! Integration tests for dispatch-registry.
//!
//! End-to-end upgrade, dispatch and introspection through the public API,
//! with structural invariants checked after every mutation.

mod common;

use bytes::Bytes;
use common::*;
use dispatch_registry::handler::{HandlerModule, Revert};
use dispatch_registry::protocol::build_call;
use dispatch_registry::{ErrorKind, Registry, RegistryError, RegistryEvent, UpgradePlan};

const A: u64 = 0xA;
const B: u64 = 0xB;
const A2: u64 = 0xA2;

/// Registry with A = [1,2,3] and B = [4,5] added, events drained.
fn registry_ab() -> Registry {
    let mut registry = empty_registry();
    registry.deploy(addr(A), exporting("a", &[1, 2, 3])).unwrap();
    registry.deploy(addr(B), exporting("b", &[4, 5])).unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(A)).add(addr(B)))
        .unwrap();
    registry.take_events();
    registry
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_add_two_groups() {
    init_tracing();
    let mut registry = empty_registry();
    registry.deploy(addr(A), exporting("a", &[1, 2, 3])).unwrap();
    registry.deploy(addr(B), exporting("b", &[4, 5])).unwrap();

    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(A)).add(addr(B)))
        .unwrap();

    let list = registry.list();
    assert_eq!(list.group_count, 2);
    assert_eq!(list.key_count, 5);
    assert_eq!(registry.handler_for(key(4)), Some(addr(B)));
    assert_eq!(registry.handlers(), vec![addr(A), addr(B)]);
    assert_invariants(&registry);

    assert_eq!(
        registry.take_events(),
        vec![
            RegistryEvent::GroupAdded {
                handler: addr(A),
                head: key(1),
                keys: 3
            },
            RegistryEvent::GroupAdded {
                handler: addr(B),
                head: key(4),
                keys: 2
            },
            RegistryEvent::Upgraded {
                added: 2,
                replaced: 0,
                removed: 0,
                init: None
            },
        ]
    );
}

#[test]
fn test_replace_with_changed_keys() {
    let mut registry = registry_ab();
    registry.deploy(addr(A2), exporting("a2", &[1, 2, 6])).unwrap();

    registry
        .upgrade(OWNER, UpgradePlan::new().replace(addr(A), addr(A2)))
        .unwrap();

    assert_eq!(registry.handler_for(key(3)), None);
    assert_eq!(registry.handler_for(key(6)), Some(addr(A2)));
    assert_eq!(registry.handler_for(key(1)), Some(addr(A2)));
    assert_eq!(registry.list().key_count, 5);
    assert_eq!(registry.handlers(), vec![addr(A2), addr(B)]);
    assert_invariants(&registry);
}

#[test]
fn test_remove_then_dispatch_fails() {
    let mut registry = registry_ab();
    registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(B)))
        .unwrap();

    assert_eq!(registry.list().group_count, 1);
    assert_eq!(registry.list().key_count, 3);
    assert_invariants(&registry);

    let err = registry
        .dispatch(CALLER, 0, build_call(key(4), &[]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::NoHandlerForKey(k) if k == key(4)));
    assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[test]
fn test_empty_key_list_changes_nothing() {
    let mut registry = registry_ab();
    registry.deploy(addr(0xE), exporting("empty", &[])).unwrap();
    let before = registry.list();

    let err = registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0xE)))
        .unwrap_err();

    assert!(matches!(err, RegistryError::EmptyKeyList(a) if a == addr(0xE)));
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(registry.list(), before);
    assert!(registry.take_events().is_empty());
}

#[test]
fn test_foreign_key_conflict_changes_nothing() {
    let mut registry = registry_ab();
    // Second key belongs to B.
    registry.deploy(addr(A2), exporting("a2", &[1, 4, 7])).unwrap();
    let before = registry.list();

    let err = registry
        .upgrade(OWNER, UpgradePlan::new().replace(addr(A), addr(A2)))
        .unwrap_err();

    assert!(matches!(
        err,
        RegistryError::ForeignKeyConflict { key: k, owner } if k == key(4) && owner == addr(B)
    ));
    assert_eq!(registry.list(), before);
    assert_eq!(registry.handler_for(key(1)), Some(addr(A)));
    assert_eq!(registry.handler_for(key(7)), None);
    assert_invariants(&registry);
}

#[test]
fn test_replace_onto_registered_handler_conflicts() {
    let mut registry = registry_ab();
    let before = registry.list();

    let err = registry
        .upgrade(OWNER, UpgradePlan::new().replace(addr(A), addr(B)))
        .unwrap_err();

    assert!(matches!(
        err,
        RegistryError::ForeignKeyConflict { key: k, owner } if k == key(4) && owner == addr(B)
    ));
    assert_eq!(registry.list(), before);
    assert_eq!(registry.handlers(), vec![addr(A), addr(B)]);
    assert_eq!(registry.handler_for(key(1)), Some(addr(A)));
    assert!(registry.take_events().is_empty());
    assert_invariants(&registry);
}

#[test]
fn test_redeploy_cannot_strand_registered_keys() {
    let mut registry = registry_ab();

    let err = registry
        .deploy(addr(A), exporting("a-swapped", &[3]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::CodeAlreadyDeployed(a) if a == addr(A)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        registry.keys_for(addr(A)).unwrap(),
        vec![key(1), key(2), key(3)]
    );

    registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(A)))
        .unwrap();
    assert_eq!(registry.handler_for(key(1)), None);
    assert_eq!(registry.handler_for(key(2)), None);
    assert_eq!(registry.handlers(), vec![addr(B)]);
    assert_invariants(&registry);
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn test_drain_restores_empty_registry() {
    let mut registry = registry_ab();
    registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(A)).remove(addr(B)))
        .unwrap();

    let list = registry.list();
    assert_eq!((list.head, list.tail), (None, None));
    assert_eq!((list.group_count, list.key_count), (0, 0));
    assert!(registry.handlers().is_empty());
    assert_invariants(&registry);
}

#[test]
fn test_replace_only_group_then_remove() {
    let mut registry = empty_registry();
    registry.deploy(addr(A), exporting("a", &[1, 2])).unwrap();
    registry.deploy(addr(A2), exporting("a2", &[8])).unwrap();
    registry.upgrade(OWNER, UpgradePlan::new().add(addr(A))).unwrap();

    registry
        .upgrade(OWNER, UpgradePlan::new().replace(addr(A), addr(A2)))
        .unwrap();
    assert_eq!(registry.list().head, Some(key(8)));
    assert_eq!(registry.list().tail, Some(key(8)));
    assert_invariants(&registry);

    registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(A2)))
        .unwrap();
    assert!(registry.list().is_empty());
    assert_invariants(&registry);
}

#[test]
fn test_single_key_groups() {
    let mut registry = empty_registry();
    for (a, k) in [(1, 10), (2, 20), (3, 30)] {
        registry.deploy(addr(a), exporting("one", &[k])).unwrap();
    }
    registry
        .upgrade(
            OWNER,
            UpgradePlan::new().add(addr(1)).add(addr(2)).add(addr(3)),
        )
        .unwrap();
    assert_invariants(&registry);

    registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(2)))
        .unwrap();
    assert_eq!(registry.handlers(), vec![addr(1), addr(3)]);
    assert_invariants(&registry);
}

#[test]
fn test_replace_middle_group_with_new_head() {
    let mut registry = empty_registry();
    registry.deploy(addr(1), exporting("first", &[1])).unwrap();
    registry.deploy(addr(2), exporting("middle", &[2, 3])).unwrap();
    registry.deploy(addr(3), exporting("last", &[4])).unwrap();
    registry.deploy(addr(4), exporting("middle-v2", &[5, 3])).unwrap();
    registry
        .upgrade(
            OWNER,
            UpgradePlan::new().add(addr(1)).add(addr(2)).add(addr(3)),
        )
        .unwrap();

    registry
        .upgrade(OWNER, UpgradePlan::new().replace(addr(2), addr(4)))
        .unwrap();

    assert_eq!(registry.handlers(), vec![addr(1), addr(4), addr(3)]);
    assert_eq!(registry.handler_for(key(2)), None);
    assert_eq!(registry.handler_for(key(3)), Some(addr(4)));
    assert_invariants(&registry);
}

#[test]
fn test_duplicate_key_on_add() {
    let mut registry = registry_ab();
    registry.deploy(addr(0xC), exporting("c", &[9, 5])).unwrap();

    let err = registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0xC)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateKey(k) if k == key(5)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(registry.handler_for(key(9)), None);
    assert_invariants(&registry);
}

#[test]
fn test_add_handler_without_code() {
    let mut registry = empty_registry();
    let err = registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0x404)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::NoCodeAtAddress(a) if a == addr(0x404)));
}

#[test]
fn test_empty_plan_still_emits_upgraded() {
    let mut registry = empty_registry();
    registry.upgrade(OWNER, UpgradePlan::new()).unwrap();
    assert_eq!(
        registry.take_events(),
        vec![RegistryEvent::Upgraded {
            added: 0,
            replaced: 0,
            removed: 0,
            init: None
        }]
    );
}

// ============================================================================
// All-or-nothing upgrades
// ============================================================================

#[test]
fn test_failure_late_in_plan_unwinds_earlier_steps() {
    let mut registry = registry_ab();
    registry.deploy(addr(0xC), exporting("c", &[9])).unwrap();
    registry.deploy(addr(0xD), exporting("d", &[10])).unwrap();

    // Add succeeds, remove of an unregistered handler fails.
    let err = registry
        .upgrade(
            OWNER,
            UpgradePlan::new()
                .add(addr(0xC))
                .remove(addr(B))
                .remove(addr(0xD)),
        )
        .unwrap_err();

    assert!(matches!(err, RegistryError::NotRegistered(a) if a == addr(0xD)));
    assert_eq!(registry.handler_for(key(9)), None);
    assert_eq!(registry.handler_for(key(4)), Some(addr(B)));
    assert_eq!(registry.handlers(), vec![addr(A), addr(B)]);
    assert!(registry.take_events().is_empty());
    assert_invariants(&registry);
}

#[test]
fn test_unauthorized_caller() {
    let mut registry = registry_ab();
    let err = registry
        .upgrade(CALLER, UpgradePlan::new().remove(addr(A)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { caller } if caller == CALLER));
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(registry.list().group_count, 2);
}

#[test]
fn test_ownership_transfer_moves_mutation_rights() {
    let mut registry = registry_ab();
    registry.transfer_ownership(OWNER, CALLER).unwrap();

    assert!(registry
        .upgrade(OWNER, UpgradePlan::new().remove(addr(A)))
        .is_err());
    registry
        .upgrade(CALLER, UpgradePlan::new().remove(addr(A)))
        .unwrap();

    registry.renounce_ownership(CALLER).unwrap();
    let err = registry
        .upgrade(CALLER, UpgradePlan::new().remove(addr(B)))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { .. }));
}

// ============================================================================
// Initializer and metadata
// ============================================================================

fn initializer() -> HandlerModule {
    HandlerModule::builder("init")
        .route(key(0x100), |ctx, args| {
            ctx.store(&b"version"[..], Bytes::copy_from_slice(args));
            Ok(Bytes::new())
        })
        .route(key(0x101), |ctx, _args| {
            ctx.store(&b"version"[..], &b"broken"[..]);
            Err(Revert::msg("init failed"))
        })
        .build()
}

#[test]
fn test_initializer_runs_in_registry_context() {
    let mut registry = registry_ab();
    registry.deploy(addr(0x1717), initializer()).unwrap();

    registry
        .upgrade(
            OWNER,
            UpgradePlan::new().init(addr(0x1717), build_call(key(0x100), b"v2")),
        )
        .unwrap();

    assert_eq!(registry.store().load(b"version").unwrap().as_ref(), b"v2");
    assert_eq!(
        registry.take_events().last(),
        Some(&RegistryEvent::Upgraded {
            added: 0,
            replaced: 0,
            removed: 0,
            init: Some(addr(0x1717))
        })
    );
}

#[test]
fn test_failing_initializer_unwinds_upgrade() {
    let mut registry = registry_ab();
    registry.deploy(addr(0x1717), initializer()).unwrap();
    registry.deploy(addr(0xC), exporting("c", &[9])).unwrap();

    let err = registry
        .upgrade(
            OWNER,
            UpgradePlan::new()
                .add(addr(0xC))
                .init(addr(0x1717), build_call(key(0x101), &[])),
        )
        .unwrap_err();

    assert!(matches!(err, RegistryError::DelegateFailed(_)));
    assert_eq!(err.revert_data().unwrap().as_ref(), b"init failed");
    assert_eq!(registry.handler_for(key(9)), None);
    assert!(registry.store().load(b"version").is_none());
    assert!(!registry.is_forwarding());
}

#[test]
fn test_initializer_without_code() {
    let mut registry = registry_ab();
    let err = registry
        .upgrade(OWNER, UpgradePlan::new().init(addr(0x404), Bytes::new()))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DelegateNoCode(a) if a == addr(0x404)));
    assert_eq!(err.kind(), ErrorKind::Delegation);
}

#[test]
fn test_metadata_recorded_under_tag() {
    let mut registry = registry_ab();
    registry
        .upgrade(
            OWNER,
            UpgradePlan::new().tag("v2").metadata(&b"notes"[..]),
        )
        .unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().metadata(&b"untagged"[..]))
        .unwrap();
    registry.upgrade(OWNER, UpgradePlan::new().tag("v3")).unwrap();

    assert_eq!(registry.metadata("v2").unwrap().as_ref(), b"notes");
    assert_eq!(registry.metadata("").unwrap().as_ref(), b"untagged");
    assert!(registry.metadata("v3").is_none());

    let events = registry.take_events();
    assert_eq!(
        events[0],
        RegistryEvent::MetadataRecorded {
            tag: "v2".to_string()
        }
    );
    assert!(matches!(events[1], RegistryEvent::Upgraded { .. }));
}

// ============================================================================
// Dispatch
// ============================================================================

fn counter() -> HandlerModule {
    HandlerModule::builder("counter")
        .typed(key(0x10), |ctx, amount: u64| {
            let total = ctx
                .load(b"total")
                .and_then(|b| <[u8; 8]>::try_from(b.as_ref()).ok())
                .map(u64::from_be_bytes)
                .unwrap_or(0)
                + amount;
            ctx.store(&b"total"[..], total.to_be_bytes().to_vec());
            Ok(total)
        })
        .build()
}

#[test]
fn test_typed_route_state_lands_in_registry() {
    use dispatch_registry::codec::MsgPackCodec;

    let mut registry = empty_registry();
    registry.deploy(addr(0xC0), counter()).unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0xC0)))
        .unwrap();

    for expected in [5u64, 10] {
        let args = MsgPackCodec::encode(&5u64).unwrap();
        let out = registry
            .dispatch(CALLER, 0, build_call(key(0x10), &args))
            .unwrap();
        let total: u64 = MsgPackCodec::decode(&out).unwrap();
        assert_eq!(total, expected);
    }
    assert_eq!(
        registry.store().load(b"total").unwrap().as_ref(),
        &10u64.to_be_bytes()
    );
}

#[test]
fn test_bad_typed_arguments_revert() {
    let mut registry = empty_registry();
    registry.deploy(addr(0xC0), counter()).unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0xC0)))
        .unwrap();

    let err = registry
        .dispatch(CALLER, 0, build_call(key(0x10), &[0xc1]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forwarding);
}

#[test]
fn test_forwarded_call_cannot_upgrade() {
    let mut registry = empty_registry();
    registry
        .deploy(
            addr(0x5),
            HandlerModule::builder("sneaky")
                .route(key(0x50), |ctx, _args| {
                    ctx.upgrade(UpgradePlan::new().remove(addr(0x5)))?;
                    Ok(Bytes::new())
                })
                .build(),
        )
        .unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0x5)))
        .unwrap();

    // Even the owner's call is refused mid-forward.
    let err = registry
        .dispatch(OWNER, 0, build_call(key(0x50), &[]))
        .unwrap_err();
    assert_eq!(
        err.revert_data().unwrap().as_ref(),
        RegistryError::ReentrantMutation.to_string().as_bytes()
    );
    assert_eq!(registry.handler_for(key(0x50)), Some(addr(0x5)));
    assert!(!registry.is_forwarding());
}

#[test]
fn test_nested_failure_only_unwinds_inner_call() {
    let mut registry = empty_registry();
    registry
        .deploy(
            addr(0x6),
            HandlerModule::builder("nested")
                .route(key(0x60), |ctx, _args| {
                    ctx.store(&b"outer"[..], &b"1"[..]);
                    let inner = ctx.call_self(build_call(key(0x61), &[]));
                    assert!(inner.is_err());
                    Ok(Bytes::new())
                })
                .route(key(0x61), |ctx, _args| {
                    assert_eq!(ctx.caller(), ctx.registry_address());
                    ctx.store(&b"inner"[..], &b"1"[..]);
                    Err(Revert::msg("inner"))
                })
                .build(),
        )
        .unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0x6)))
        .unwrap();

    registry
        .dispatch(CALLER, 0, build_call(key(0x60), &[]))
        .unwrap();
    assert!(registry.store().load(b"outer").is_some());
    assert!(registry.store().load(b"inner").is_none());
}

#[test]
fn test_revert_bubbles_verbatim_through_nested_calls() {
    let mut registry = empty_registry();
    registry
        .deploy(
            addr(0x7),
            HandlerModule::builder("bubble")
                .route(key(0x70), |ctx, _args| {
                    let out = ctx.call_self(build_call(key(0x71), &[]))?;
                    Ok(out)
                })
                .route(key(0x71), |_ctx, _args| {
                    Err(Revert::new(Bytes::from_static(&[0x08, 0xc3, 0x79, 0xa0])))
                })
                .build(),
        )
        .unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(0x7)))
        .unwrap();

    let err = registry
        .dispatch(CALLER, 0, build_call(key(0x70), &[]))
        .unwrap_err();
    assert_eq!(
        err.revert_data().unwrap().as_ref(),
        &[0x08, 0xc3, 0x79, 0xa0]
    );
}

#[test]
fn test_exported_key_without_route_reverts() {
    let mut registry = registry_ab();
    let err = registry
        .dispatch(CALLER, 0, build_call(key(2), &[]))
        .unwrap_err();
    assert!(matches!(err, RegistryError::HandlerReverted(_)));
}

#[test]
fn test_bare_value_transfer_is_noop() {
    let mut registry = registry_ab();
    let out = registry.dispatch(CALLER, 1_000, Bytes::new()).unwrap();
    assert!(out.is_empty());
    assert!(registry.take_events().is_empty());
}

// ============================================================================
// Invariants across a longer sequence
// ============================================================================

#[test]
fn test_invariants_hold_across_mixed_upgrades() {
    let mut registry = empty_registry();
    let groups: [(u64, &[u32]); 6] = [
        (1, &[1, 2]),
        (2, &[3]),
        (3, &[4, 5, 6]),
        (4, &[7, 8]),
        (5, &[3, 9]),
        (6, &[10, 4, 5]),
    ];
    for (a, keys) in groups {
        registry.deploy(addr(a), exporting("g", keys)).unwrap();
    }

    let plans = [
        UpgradePlan::new().add(addr(1)).add(addr(2)).add(addr(3)),
        UpgradePlan::new().add(addr(4)).replace(addr(2), addr(5)),
        UpgradePlan::new().replace(addr(3), addr(6)).remove(addr(1)),
        UpgradePlan::new().remove(addr(4)),
        UpgradePlan::new().add(addr(1)).remove(addr(5)),
        UpgradePlan::new().remove(addr(6)).remove(addr(1)),
    ];
    for plan in plans {
        registry.upgrade(OWNER, plan).unwrap();
        assert_invariants(&registry);
    }
    assert!(registry.list().is_empty());
}
