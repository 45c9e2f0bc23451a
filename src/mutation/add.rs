//! Streaming group addition.
//!
//! A group-head's `next` pointer is only known once the following group has
//! been imported, so each head node is held back for one iteration and
//! written exactly once: when the next head is known, or with `next = None`
//! after the loop.

use crate::codec::KeyCodec;
use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::handler::Deployments;
use crate::protocol::{Address, DispatchKey};
use crate::store::{HandlerNode, RegistryStore};

/// A group whose head node has not been written yet.
struct Pending {
    head: DispatchKey,
    handler: Address,
    prev: Option<DispatchKey>,
    keys: usize,
}

impl Pending {
    /// Write the held-back head node and announce the group.
    fn flush(self, store: &mut RegistryStore, next: Option<DispatchKey>) {
        store.put_node(self.head, HandlerNode::head(self.handler, self.prev, next));
        tracing::debug!(handler = %self.handler, head = %self.head, keys = self.keys, "group added");
        store.emit(RegistryEvent::GroupAdded {
            handler: self.handler,
            head: self.head,
            keys: self.keys,
        });
    }
}

/// Append one group per handler to the tail of the list, in order.
///
/// # Errors
///
/// - key import failures (`NoCodeAtAddress`, `QueryFailed`,
///   `MalformedKeyEncoding`, `EmptyKeyList`)
/// - `DuplicateKey` if any imported key is already registered, or repeats
///   within the batch
///
/// Writes made before a failure are left for the caller's checkpoint to undo.
pub(crate) fn add_groups(
    store: &mut RegistryStore,
    deployments: &Deployments,
    handlers: &[Address],
) -> Result<()> {
    if handlers.is_empty() {
        return Ok(());
    }

    let mut list = *store.list();
    let mut pending: Option<Pending> = None;
    let mut added_keys = 0usize;

    for &handler in handlers {
        let keys = KeyCodec::import_keys(deployments, handler)?;
        let head = keys.head();

        let pending_head = pending.as_ref().map(|p| p.head);
        if store.contains(head) || pending_head == Some(head) {
            return Err(RegistryError::DuplicateKey(head));
        }

        let prev = match pending.take() {
            Some(previous) => {
                let previous_head = previous.head;
                previous.flush(store, Some(head));
                Some(previous_head)
            }
            None => {
                // First group of the batch links behind the current tail.
                match list.tail {
                    Some(tail) => store.set_next(tail, Some(head)),
                    None => list.head = Some(head),
                }
                list.tail
            }
        };

        for key in keys.iter().skip(1) {
            if key == head || store.contains(key) {
                return Err(RegistryError::DuplicateKey(key));
            }
            store.put_node(key, HandlerNode::plain(handler));
        }

        added_keys += keys.len();
        pending = Some(Pending {
            head,
            handler,
            prev,
            keys: keys.len(),
        });
    }

    if let Some(last) = pending {
        list.tail = Some(last.head);
        last.flush(store, None);
    }

    list.group_count += handlers.len();
    list.key_count += added_keys;
    store.set_list(list);
    Ok(())
}
