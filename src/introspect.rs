//! Read-only introspection of the registry index.
//!
//! Walks the group list from its head, bounded by `group_count`, and
//! re-imports each handler's keys on demand. Nothing here writes.

use bytes::Bytes;
use serde::Serialize;

use crate::codec::KeyCodec;
use crate::error::Result;
use crate::handler::Deployments;
use crate::protocol::{Address, DispatchKey};
use crate::registry::Registry;
use crate::store::{HandlerNode, RegistryList, RegistryStore};

/// One registered handler and the keys it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerGroup {
    /// Address of the registered handler.
    pub handler: Address,
    /// Keys the handler exports, group-head first.
    pub keys: Vec<DispatchKey>,
}

/// Read view over a store and its deployments.
#[derive(Clone, Copy)]
pub struct Introspector<'a> {
    store: &'a RegistryStore,
    deployments: &'a Deployments,
}

impl<'a> Introspector<'a> {
    pub fn new(store: &'a RegistryStore, deployments: &'a Deployments) -> Self {
        Self { store, deployments }
    }

    /// Handler bound to `key`.
    #[inline]
    pub fn handler_for(&self, key: DispatchKey) -> Option<Address> {
        self.store.handler_of(key)
    }

    /// Keys served by `handler`; empty unless its group-head is bound to it.
    pub fn keys_for(&self, handler: Address) -> Result<Vec<DispatchKey>> {
        if !self.deployments.has_code(handler) {
            return Ok(Vec::new());
        }
        let keys = KeyCodec::import_keys(self.deployments, handler)?;
        if self.store.handler_of(keys.head()) != Some(handler) {
            return Ok(Vec::new());
        }
        Ok(keys.to_vec())
    }

    /// Group-heads in list order.
    pub fn walk(&self) -> GroupWalk<'a> {
        let list = self.store.list();
        GroupWalk {
            store: self.store,
            cursor: list.head,
            remaining: list.group_count,
        }
    }

    /// Registered handlers in list order.
    pub fn handlers(&self) -> Vec<Address> {
        self.walk().map(|(_, node)| node.handler).collect()
    }

    /// Every registered handler with its keys, in list order.
    pub fn groups(&self) -> Result<Vec<HandlerGroup>> {
        self.walk()
            .map(|(_, node)| {
                let keys = KeyCodec::import_keys(self.deployments, node.handler)?;
                Ok(HandlerGroup {
                    handler: node.handler,
                    keys: keys.to_vec(),
                })
            })
            .collect()
    }
}

/// Iterator over `(group-head, node)` pairs in list order.
pub struct GroupWalk<'a> {
    store: &'a RegistryStore,
    cursor: Option<DispatchKey>,
    remaining: usize,
}

impl<'a> Iterator for GroupWalk<'a> {
    type Item = (DispatchKey, &'a HandlerNode);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.cursor?;
        let node = self.store.node(key)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some((key, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl Registry {
    /// Read view over this registry.
    pub fn introspect(&self) -> Introspector<'_> {
        Introspector::new(self.store(), self.deployments())
    }

    /// Handler bound to `key`.
    pub fn handler_for(&self, key: DispatchKey) -> Option<Address> {
        self.introspect().handler_for(key)
    }

    /// Keys served by `handler`; empty if it is not registered.
    pub fn keys_for(&self, handler: Address) -> Result<Vec<DispatchKey>> {
        self.introspect().keys_for(handler)
    }

    /// Registered handlers in list order.
    pub fn handlers(&self) -> Vec<Address> {
        self.introspect().handlers()
    }

    /// Every registered handler with its keys, in list order.
    pub fn groups(&self) -> Result<Vec<HandlerGroup>> {
        self.introspect().groups()
    }

    /// List metadata.
    pub fn list(&self) -> RegistryList {
        *self.store().list()
    }

    /// Upgrade metadata recorded under `tag`.
    pub fn metadata(&self, tag: &str) -> Option<Bytes> {
        self.store().metadata(tag).cloned()
    }
}
