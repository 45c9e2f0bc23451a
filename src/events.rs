//! Registry notifications.
//!
//! Events are written through the store journal, so an invocation that
//! unwinds also discards every event it emitted.

use serde::{Deserialize, Serialize};

use crate::protocol::{Address, DispatchKey};

/// A notification emitted by a committed registry change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A handler group was linked in.
    GroupAdded {
        handler: Address,
        head: DispatchKey,
        keys: usize,
    },
    /// One handler's group was rebound to another handler.
    GroupReplaced {
        old: Address,
        new: Address,
        head: DispatchKey,
    },
    /// A handler group was unlinked and its keys deleted.
    GroupRemoved {
        handler: Address,
        head: DispatchKey,
        keys: usize,
    },
    /// An upgrade call completed.
    Upgraded {
        added: usize,
        replaced: usize,
        removed: usize,
        init: Option<Address>,
    },
    /// Upgrade metadata was recorded under a tag.
    MetadataRecorded { tag: String },
    /// The authorized principal changed.
    OwnershipTransferred {
        previous: Option<Address>,
        current: Option<Address>,
    },
}
