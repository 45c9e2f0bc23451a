//! Group removal.
//!
//! Only the group-head is checked against the handler. The remaining keys
//! are trusted to belong to it: handler key exports must be pure and fixed
//! for the handler's lifetime.

use crate::codec::KeyCodec;
use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::handler::Deployments;
use crate::protocol::Address;
use crate::store::RegistryStore;

/// Unlink and delete the group of each handler.
///
/// # Errors
///
/// - key import failures
/// - `NotRegistered` if a handler's group-head is not bound to it
pub(crate) fn remove_groups(
    store: &mut RegistryStore,
    deployments: &Deployments,
    handlers: &[Address],
) -> Result<()> {
    if handlers.is_empty() {
        return Ok(());
    }

    let mut list = *store.list();

    for &handler in handlers {
        let keys = KeyCodec::import_keys(deployments, handler)?;
        let head = keys.head();
        let node = match store.node(head) {
            Some(node) if node.handler == handler => *node,
            _ => return Err(RegistryError::NotRegistered(handler)),
        };

        match node.prev {
            Some(prev) => store.set_next(prev, node.next),
            None => list.head = node.next,
        }
        match node.next {
            Some(next) => store.set_prev(next, node.prev),
            None => list.tail = node.prev,
        }

        for key in keys.iter() {
            store.delete_node(key);
        }
        list.key_count = list.key_count.saturating_sub(keys.len());

        tracing::debug!(%handler, %head, keys = keys.len(), "group removed");
        store.emit(RegistryEvent::GroupRemoved {
            handler,
            head,
            keys: keys.len(),
        });
    }

    list.group_count = list.group_count.saturating_sub(handlers.len());
    store.set_list(list);
    Ok(())
}
