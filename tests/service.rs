//! Integration tests for the async registry service.

mod common;

use bytes::Bytes;
use common::*;
use dispatch_registry::handler::HandlerModule;
use dispatch_registry::protocol::build_call;
use dispatch_registry::{
    RegistryError, RegistryEvent, RegistryService, ServiceConfig, UpgradePlan,
};

fn echo() -> HandlerModule {
    HandlerModule::builder("echo")
        .route(key(0xEC), |_ctx, args| Ok(Bytes::copy_from_slice(args)))
        .export(key(0xED))
        .build()
}

#[tokio::test]
async fn test_upgrade_and_dispatch_through_handle() {
    init_tracing();
    let (handle, _task) = RegistryService::spawn(empty_registry(), ServiceConfig::default());

    handle.deploy(addr(1), echo()).await.unwrap();
    handle
        .upgrade(OWNER, UpgradePlan::new().add(addr(1)))
        .await
        .unwrap();

    let out = handle
        .dispatch(CALLER, 0, build_call(key(0xEC), b"hello"))
        .await
        .unwrap();
    assert_eq!(out.as_ref(), b"hello");

    assert_eq!(handle.handler_for(key(0xED)).await.unwrap(), Some(addr(1)));
    assert_eq!(
        handle.keys_for(addr(1)).await.unwrap(),
        vec![key(0xEC), key(0xED)]
    );
    assert_eq!(handle.handlers().await.unwrap(), vec![addr(1)]);
    assert_eq!(handle.groups().await.unwrap().len(), 1);
    assert_eq!(handle.list().await.unwrap().key_count, 2);
}

#[tokio::test]
async fn test_errors_cross_the_channel() {
    let (handle, _task) = RegistryService::spawn(empty_registry(), ServiceConfig::default());

    let err = handle
        .upgrade(CALLER, UpgradePlan::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { .. }));

    let err = handle
        .dispatch(CALLER, 0, build_call(key(1), &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NoHandlerForKey(_)));
}

#[tokio::test]
async fn test_redeploy_through_handle_is_refused() {
    let (handle, _task) = RegistryService::spawn(empty_registry(), ServiceConfig::default());
    handle.deploy(addr(1), echo()).await.unwrap();

    let err = handle.deploy(addr(1), echo()).await.unwrap_err();
    assert!(matches!(err, RegistryError::CodeAlreadyDeployed(a) if a == addr(1)));
}

#[tokio::test]
async fn test_events_drained_through_handle() {
    let (handle, _task) = RegistryService::spawn(empty_registry(), ServiceConfig::default());
    handle.deploy(addr(1), echo()).await.unwrap();
    handle
        .upgrade(OWNER, UpgradePlan::new().add(addr(1)))
        .await
        .unwrap();

    let events = handle.take_events().await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], RegistryEvent::GroupAdded { .. }));
    assert!(handle.take_events().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_are_serialized() {
    let mut registry = empty_registry();
    registry
        .deploy(
            addr(2),
            HandlerModule::builder("counter")
                .route(key(0x10), |ctx, _args| {
                    let n = ctx.load(b"n").map(|b| b.len()).unwrap_or(0);
                    ctx.store(&b"n"[..], vec![0u8; n + 1]);
                    Ok(Bytes::new())
                })
                .build(),
        )
        .unwrap();
    registry
        .upgrade(OWNER, UpgradePlan::new().add(addr(2)))
        .unwrap();

    let config = ServiceConfig::default().with_channel_capacity(8);
    let (handle, task) = RegistryService::spawn(registry, config);

    let mut callers = Vec::new();
    for i in 0..16u64 {
        let handle = handle.clone();
        callers.push(tokio::spawn(async move {
            for _ in 0..10 {
                handle
                    .dispatch(addr(100 + i), 0, build_call(key(0x10), &[]))
                    .await
                    .unwrap();
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    drop(handle);
    let registry = task.await.unwrap();
    assert_eq!(registry.store().load(b"n").unwrap().len(), 160);
}

#[tokio::test]
async fn test_closed_service() {
    let (handle, task) = RegistryService::spawn(empty_registry(), ServiceConfig::default());
    task.abort();
    let _ = task.await;

    assert!(handle.is_closed());
    let err = handle.handlers().await.unwrap_err();
    assert!(matches!(err, RegistryError::ServiceClosed));
}
