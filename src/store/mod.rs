//! Registry store - the persistent state behind a registry.
//!
//! Holds:
//! - the key index: [`DispatchKey`] -> [`HandlerNode`]
//! - list metadata ([`RegistryList`]): head/tail group-heads and counts
//! - persistent slots written by forwarded handler code
//! - upgrade metadata records and pending events
//!
//! Handler groups form a doubly-linked list threaded through the index: only
//! group-head nodes carry `prev`/`next` pointers, every other key of a group
//! is a plain node holding just the handler address.
//!
//! The store is an ordinary owned value. Components receive it explicitly,
//! so tests can build as many isolated stores as they like.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::store::{HandlerNode, RegistryStore};
//! use dispatch_registry::protocol::{Address, DispatchKey};
//!
//! let mut store = RegistryStore::new();
//! let key = DispatchKey::from_u32(1);
//!
//! let cp = store.checkpoint();
//! store.put_node(key, HandlerNode::plain(Address::from_u64(1)));
//! store.revert(cp);
//!
//! assert!(store.node(key).is_none());
//! ```

mod journal;

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::events::RegistryEvent;
use crate::protocol::{Address, DispatchKey};
use journal::{Entry, Journal};

pub use journal::Checkpoint;

/// Index entry for one registered key.
///
/// `prev` and `next` are only meaningful on group-heads; plain keys leave
/// them `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerNode {
    /// Handler bound to the key. Never zero for a stored node.
    pub handler: Address,
    /// Previous group-head in list order.
    pub prev: Option<DispatchKey>,
    /// Next group-head in list order.
    pub next: Option<DispatchKey>,
}

impl HandlerNode {
    /// Node for a non-head key.
    #[inline]
    pub fn plain(handler: Address) -> Self {
        Self {
            handler,
            prev: None,
            next: None,
        }
    }

    /// Node for a group-head.
    #[inline]
    pub fn head(handler: Address, prev: Option<DispatchKey>, next: Option<DispatchKey>) -> Self {
        Self {
            handler,
            prev,
            next,
        }
    }
}

/// List metadata.
///
/// When `group_count == 0`, `head` and `tail` are both `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryList {
    /// First group-head.
    pub head: Option<DispatchKey>,
    /// Last group-head.
    pub tail: Option<DispatchKey>,
    /// Number of linked groups.
    pub group_count: usize,
    /// Number of registered keys.
    pub key_count: usize,
}

impl RegistryList {
    /// Check if no group is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.group_count == 0
    }
}

/// Owned persistent state of one registry.
#[derive(Debug, Default)]
pub struct RegistryStore {
    nodes: HashMap<DispatchKey, HandlerNode>,
    list: RegistryList,
    slots: HashMap<Bytes, Bytes>,
    metadata: HashMap<String, Bytes>,
    /// Unbounded; grows until the owner calls `take_events`.
    events: Vec<RegistryEvent>,
    journal: Journal,
}

impl RegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Key index
    // ------------------------------------------------------------------

    /// Node for `key`, if registered.
    #[inline]
    pub fn node(&self, key: DispatchKey) -> Option<&HandlerNode> {
        self.nodes.get(&key)
    }

    /// Handler bound to `key`, if registered.
    #[inline]
    pub fn handler_of(&self, key: DispatchKey) -> Option<Address> {
        self.nodes.get(&key).map(|n| n.handler)
    }

    /// Check if `key` is registered.
    #[inline]
    pub fn contains(&self, key: DispatchKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Iterate every registered key and its node (unordered).
    pub fn nodes(&self) -> impl Iterator<Item = (DispatchKey, &HandlerNode)> + '_ {
        self.nodes.iter().map(|(k, n)| (*k, n))
    }

    /// Insert or overwrite the node for `key`.
    pub fn put_node(&mut self, key: DispatchKey, node: HandlerNode) {
        debug_assert!(!node.handler.is_zero(), "stored nodes must have a handler");
        let previous = self.nodes.insert(key, node);
        self.journal.record(Entry::Node { key, previous });
    }

    /// Delete the node for `key`. Returns the removed node.
    pub fn delete_node(&mut self, key: DispatchKey) -> Option<HandlerNode> {
        let previous = self.nodes.remove(&key);
        if previous.is_some() {
            self.journal.record(Entry::Node { key, previous });
        }
        previous
    }

    /// Point an existing group-head's `next` at `next`.
    pub(crate) fn set_next(&mut self, key: DispatchKey, next: Option<DispatchKey>) {
        if let Some(mut node) = self.nodes.get(&key).copied() {
            node.next = next;
            self.put_node(key, node);
        }
    }

    /// Point an existing group-head's `prev` at `prev`.
    pub(crate) fn set_prev(&mut self, key: DispatchKey, prev: Option<DispatchKey>) {
        if let Some(mut node) = self.nodes.get(&key).copied() {
            node.prev = prev;
            self.put_node(key, node);
        }
    }

    // ------------------------------------------------------------------
    // List metadata
    // ------------------------------------------------------------------

    /// Current list metadata.
    #[inline]
    pub fn list(&self) -> &RegistryList {
        &self.list
    }

    /// Overwrite list metadata.
    pub fn set_list(&mut self, list: RegistryList) {
        if list != self.list {
            let previous = std::mem::replace(&mut self.list, list);
            self.journal.record(Entry::List(previous));
        }
    }

    // ------------------------------------------------------------------
    // Persistent slots
    // ------------------------------------------------------------------

    /// Value stored in `slot`.
    #[inline]
    pub fn load(&self, slot: &[u8]) -> Option<&Bytes> {
        self.slots.get(slot)
    }

    /// Write `value` into `slot`.
    pub fn store(&mut self, slot: Bytes, value: Bytes) {
        let previous = self.slots.insert(slot.clone(), value);
        self.journal.record(Entry::Slot { slot, previous });
    }

    /// Clear `slot`.
    pub fn clear(&mut self, slot: &[u8]) {
        if let Some((slot, previous)) = self.slots.remove_entry(slot) {
            self.journal.record(Entry::Slot {
                slot,
                previous: Some(previous),
            });
        }
    }

    // ------------------------------------------------------------------
    // Metadata records and events
    // ------------------------------------------------------------------

    /// Metadata recorded under `tag`.
    #[inline]
    pub fn metadata(&self, tag: &str) -> Option<&Bytes> {
        self.metadata.get(tag)
    }

    /// Record `value` under `tag`.
    pub fn record_metadata(&mut self, tag: String, value: Bytes) {
        let previous = self.metadata.insert(tag.clone(), value);
        self.journal.record(Entry::Metadata { tag, previous });
    }

    /// Append an event. It stays queued until [`take_events`](Self::take_events).
    pub fn emit(&mut self, event: RegistryEvent) {
        self.events.push(event);
        self.journal.record(Entry::Event);
    }

    /// Events emitted so far and not yet taken.
    #[inline]
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Drain committed events.
    ///
    /// Nothing else removes events, so long-lived owners should call this
    /// after each upgrade or batch of dispatches.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        if self.journal.depth() > 0 {
            // Events of an open scope may still be unwound.
            return Vec::new();
        }
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Journal scopes
    // ------------------------------------------------------------------

    /// Open a journal scope. Scopes nest.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.journal.open()
    }

    /// Keep every write made since `cp`.
    pub fn commit(&mut self, cp: Checkpoint) {
        self.journal.close(cp);
    }

    /// Undo every write made since `cp`, newest first.
    pub fn revert(&mut self, cp: Checkpoint) {
        while let Some(entry) = self.journal.pop_above(cp) {
            match entry {
                Entry::Node { key, previous } => match previous {
                    Some(node) => {
                        self.nodes.insert(key, node);
                    }
                    None => {
                        self.nodes.remove(&key);
                    }
                },
                Entry::List(previous) => self.list = previous,
                Entry::Slot { slot, previous } => match previous {
                    Some(value) => {
                        self.slots.insert(slot, value);
                    }
                    None => {
                        self.slots.remove(&slot);
                    }
                },
                Entry::Metadata { tag, previous } => match previous {
                    Some(value) => {
                        self.metadata.insert(tag, value);
                    }
                    None => {
                        self.metadata.remove(&tag);
                    }
                },
                Entry::Event => {
                    self.events.pop();
                }
            }
        }
        self.journal.close(cp);
    }

    /// Number of open journal scopes.
    #[inline]
    pub fn scope_depth(&self) -> usize {
        self.journal.depth()
    }

    #[cfg(test)]
    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }
}
