//! Serialized registry service.
//!
//! Moves a [`Registry`] into a dedicated tokio task and feeds it requests
//! over an mpsc channel, one at a time. Callers hold a cloneable
//! [`RegistryHandle`] and get their answers back on oneshot channels.
//!
//! # Architecture
//!
//! ```text
//! Caller 1 ─┐
//! Caller 2 ─┼─► mpsc::Sender<Request> ─► Service Task (owns Registry)
//! Caller N ─┘                                   │
//!           ◄──────── oneshot replies ──────────┘
//! ```
//!
//! The task ends when every handle is dropped and hands the registry back
//! through its `JoinHandle`.
//!
//! Committed events stay queued inside the task until a caller drains them
//! with [`RegistryHandle::take_events`].

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::handler::Handler;
use crate::introspect::HandlerGroup;
use crate::mutation::UpgradePlan;
use crate::protocol::{Address, DispatchKey};
use crate::registry::Registry;
use crate::store::RegistryList;

/// Default request channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for the service task.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of the request queue.
    pub channel_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServiceConfig {
    /// Set the request queue capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

type Reply<T> = oneshot::Sender<T>;

/// A request processed by the service task.
enum Request {
    Dispatch {
        caller: Address,
        value: u128,
        input: Bytes,
        reply: Reply<Result<Bytes>>,
    },
    Upgrade {
        caller: Address,
        plan: UpgradePlan,
        reply: Reply<Result<()>>,
    },
    Deploy {
        address: Address,
        handler: Arc<dyn Handler>,
        reply: Reply<Result<()>>,
    },
    HandlerFor {
        key: DispatchKey,
        reply: Reply<Option<Address>>,
    },
    KeysFor {
        handler: Address,
        reply: Reply<Result<Vec<DispatchKey>>>,
    },
    Handlers {
        reply: Reply<Vec<Address>>,
    },
    Groups {
        reply: Reply<Result<Vec<HandlerGroup>>>,
    },
    List {
        reply: Reply<RegistryList>,
    },
    TakeEvents {
        reply: Reply<Vec<RegistryEvent>>,
    },
}

/// Entry point for spawning the service task.
pub struct RegistryService;

impl RegistryService {
    /// Spawn the service task. Must be called within a tokio runtime.
    pub fn spawn(registry: Registry, config: ServiceConfig) -> (RegistryHandle, JoinHandle<Registry>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let task = tokio::spawn(service_loop(rx, registry));
        (RegistryHandle { tx }, task)
    }
}

/// Deliver `value`, logging when the caller has gone away.
fn deliver<T>(reply: Reply<T>, value: T, request: &'static str) {
    if reply.send(value).is_err() {
        tracing::error!(request, "reply receiver dropped");
    }
}

async fn service_loop(mut rx: mpsc::Receiver<Request>, mut registry: Registry) -> Registry {
    tracing::debug!(address = %registry.address(), "registry service started");

    while let Some(request) = rx.recv().await {
        match request {
            Request::Dispatch {
                caller,
                value,
                input,
                reply,
            } => deliver(reply, registry.dispatch(caller, value, input), "dispatch"),
            Request::Upgrade {
                caller,
                plan,
                reply,
            } => deliver(reply, registry.upgrade(caller, plan), "upgrade"),
            Request::Deploy {
                address,
                handler,
                reply,
            } => deliver(reply, registry.deploy_arc(address, handler), "deploy"),
            Request::HandlerFor { key, reply } => {
                deliver(reply, registry.handler_for(key), "handler_for")
            }
            Request::KeysFor { handler, reply } => {
                deliver(reply, registry.keys_for(handler), "keys_for")
            }
            Request::Handlers { reply } => deliver(reply, registry.handlers(), "handlers"),
            Request::Groups { reply } => deliver(reply, registry.groups(), "groups"),
            Request::List { reply } => deliver(reply, registry.list(), "list"),
            Request::TakeEvents { reply } => {
                deliver(reply, registry.take_events(), "take_events")
            }
        }
    }

    tracing::debug!("registry service stopped");
    registry
}

/// Cloneable handle to a running service.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<Request>,
}

impl RegistryHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| RegistryError::ServiceClosed)?;
        rx.await.map_err(|_| RegistryError::ServiceClosed)
    }

    /// Route an invocation. See [`Registry::dispatch`].
    pub async fn dispatch(
        &self,
        caller: Address,
        value: u128,
        input: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let input = input.into();
        self.request(|reply| Request::Dispatch {
            caller,
            value,
            input,
            reply,
        })
        .await?
    }

    /// Apply an upgrade plan. See [`Registry::upgrade`].
    pub async fn upgrade(&self, caller: Address, plan: UpgradePlan) -> Result<()> {
        self.request(|reply| Request::Upgrade {
            caller,
            plan,
            reply,
        })
        .await?
    }

    /// Deploy handler code. See [`Registry::deploy`].
    pub async fn deploy<H: Handler>(&self, address: Address, handler: H) -> Result<()> {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        self.request(|reply| Request::Deploy {
            address,
            handler,
            reply,
        })
        .await?
    }

    /// Handler bound to `key`.
    pub async fn handler_for(&self, key: DispatchKey) -> Result<Option<Address>> {
        self.request(|reply| Request::HandlerFor { key, reply }).await
    }

    /// Keys served by `handler`.
    pub async fn keys_for(&self, handler: Address) -> Result<Vec<DispatchKey>> {
        self.request(|reply| Request::KeysFor { handler, reply })
            .await?
    }

    /// Registered handlers in list order.
    pub async fn handlers(&self) -> Result<Vec<Address>> {
        self.request(|reply| Request::Handlers { reply }).await
    }

    /// Every registered handler with its keys.
    pub async fn groups(&self) -> Result<Vec<HandlerGroup>> {
        self.request(|reply| Request::Groups { reply }).await?
    }

    /// List metadata.
    pub async fn list(&self) -> Result<RegistryList> {
        self.request(|reply| Request::List { reply }).await
    }

    /// Drain committed events.
    pub async fn take_events(&self) -> Result<Vec<RegistryEvent>> {
        self.request(|reply| Request::TakeEvents { reply }).await
    }

    /// Check if the service task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
