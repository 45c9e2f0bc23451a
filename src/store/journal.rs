//! Undo journal backing all-or-nothing invocations.
//!
//! Every store write made while a checkpoint is open records the value it
//! overwrote. Reverting pops entries back to the checkpoint mark and restores
//! them in reverse order. Writes made with no open checkpoint are not
//! journaled.

use bytes::Bytes;

use super::{HandlerNode, RegistryList};
use crate::protocol::DispatchKey;

/// Prior state overwritten by one store write.
#[derive(Debug, Clone)]
pub(crate) enum Entry {
    /// A node was inserted, overwritten or deleted.
    Node {
        key: DispatchKey,
        previous: Option<HandlerNode>,
    },
    /// List metadata was overwritten.
    List(RegistryList),
    /// A persistent slot was written or cleared.
    Slot {
        slot: Bytes,
        previous: Option<Bytes>,
    },
    /// A metadata record was written.
    Metadata {
        tag: String,
        previous: Option<Bytes>,
    },
    /// An event was appended.
    Event,
}

/// Handle to an open journal scope.
///
/// Must be closed with exactly one of [`RegistryStore::commit`] or
/// [`RegistryStore::revert`], innermost first.
///
/// [`RegistryStore::commit`]: super::RegistryStore::commit
/// [`RegistryStore::revert`]: super::RegistryStore::revert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a checkpoint must be committed or reverted"]
pub struct Checkpoint {
    pub(crate) mark: usize,
    pub(crate) depth: usize,
}

/// Stack of undo entries plus the number of open scopes.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<Entry>,
    depth: usize,
}

impl Journal {
    /// Open a scope.
    pub(crate) fn open(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            mark: self.entries.len(),
            depth: self.depth,
        }
    }

    /// Close a scope, keeping its entries for any enclosing scope.
    pub(crate) fn close(&mut self, cp: Checkpoint) {
        debug_assert_eq!(cp.depth, self.depth, "checkpoints closed out of order");
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.entries.clear();
        }
    }

    /// Pop the next entry above the checkpoint mark, newest first.
    pub(crate) fn pop_above(&mut self, cp: Checkpoint) -> Option<Entry> {
        if self.entries.len() > cp.mark {
            self.entries.pop()
        } else {
            None
        }
    }

    /// Record an overwritten value if a scope is open.
    #[inline]
    pub(crate) fn record(&mut self, entry: Entry) {
        if self.depth > 0 {
            self.entries.push(entry);
        }
    }

    /// Number of open scopes.
    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Number of pending undo entries.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
