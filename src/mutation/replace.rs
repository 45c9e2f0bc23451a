//! Group replacement.
//!
//! The new group takes over the old group's list position. When both groups
//! share a head the node is rewritten in place; otherwise the new head node
//! inherits the old head's pointers and the neighbours are relinked.

use crate::codec::KeyCodec;
use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::handler::Deployments;
use crate::protocol::{Address, KeyList};
use crate::store::{HandlerNode, RegistryList, RegistryStore};

/// Replace each `(old, new)` pair in order.
///
/// # Errors
///
/// - `SelfReplacement` if `old == new`
/// - key import failures for either handler
/// - `OldHandlerNotRegistered` if the old group-head is not bound to `old`
/// - `ForeignKeyConflict` if a new key is bound to any handler but `old`
pub(crate) fn replace_groups(
    store: &mut RegistryStore,
    deployments: &Deployments,
    pairs: &[(Address, Address)],
) -> Result<()> {
    for &(old, new) in pairs {
        replace_one(store, deployments, old, new)?;
    }
    Ok(())
}

fn replace_one(
    store: &mut RegistryStore,
    deployments: &Deployments,
    old: Address,
    new: Address,
) -> Result<()> {
    if old == new {
        return Err(RegistryError::SelfReplacement(old));
    }

    let old_keys = KeyCodec::import_keys(deployments, old)?;
    let new_keys = KeyCodec::import_keys(deployments, new)?;

    let old_head = old_keys.head();
    let new_head = new_keys.head();
    let node = match store.node(old_head) {
        Some(node) if node.handler == old => *node,
        _ => return Err(RegistryError::OldHandlerNotRegistered(old)),
    };

    let mut list = *store.list();

    if old_head == new_head {
        store.put_node(new_head, HandlerNode { handler: new, ..node });

        if old_keys.packed() == new_keys.packed() {
            for key in new_keys.iter().skip(1) {
                store.put_node(key, HandlerNode::plain(new));
            }
        } else {
            reconcile(store, &mut list, &new_keys, 1, old, new)?;
            retire(store, &mut list, &old_keys, 1, old);
        }
    } else {
        match store.handler_of(new_head) {
            None => list.key_count += 1,
            Some(owner) if owner == old => {}
            Some(owner) => {
                return Err(RegistryError::ForeignKeyConflict {
                    key: new_head,
                    owner,
                })
            }
        }

        store.put_node(new_head, HandlerNode::head(new, node.prev, node.next));
        match node.prev {
            Some(prev) => store.set_next(prev, Some(new_head)),
            None => list.head = Some(new_head),
        }
        match node.next {
            Some(next) => store.set_prev(next, Some(new_head)),
            None => list.tail = Some(new_head),
        }

        reconcile(store, &mut list, &new_keys, 1, old, new)?;
        retire(store, &mut list, &old_keys, 0, old);
    }

    store.set_list(list);
    tracing::debug!(%old, %new, head = %new_head, "group replaced");
    store.emit(RegistryEvent::GroupReplaced {
        old,
        new,
        head: new_head,
    });
    Ok(())
}

/// Bind every key of `keys` from index `from` on to `new`.
fn reconcile(
    store: &mut RegistryStore,
    list: &mut RegistryList,
    keys: &KeyList,
    from: usize,
    old: Address,
    new: Address,
) -> Result<()> {
    for key in keys.iter().skip(from) {
        match store.handler_of(key) {
            None => list.key_count += 1,
            Some(owner) if owner == old => {}
            Some(owner) => return Err(RegistryError::ForeignKeyConflict { key, owner }),
        }
        store.put_node(key, HandlerNode::plain(new));
    }
    Ok(())
}

/// Delete every key of `keys` from index `from` on still bound to `old`.
fn retire(
    store: &mut RegistryStore,
    list: &mut RegistryList,
    keys: &KeyList,
    from: usize,
    old: Address,
) {
    for key in keys.iter().skip(from) {
        if store.handler_of(key) == Some(old) {
            store.delete_node(key);
            list.key_count = list.key_count.saturating_sub(1);
        }
    }
}
