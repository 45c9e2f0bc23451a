//! Mutation engine - the single upgrade entry point.
//!
//! An [`UpgradePlan`] runs add, then replace, then remove, then the optional
//! initializer, then the optional metadata record. The whole plan executes
//! inside one store checkpoint: any failure unwinds everything.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use dispatch_registry::UpgradePlan;
//! use dispatch_registry::protocol::Address;
//!
//! let plan = UpgradePlan::new()
//!     .add(Address::from_u64(10))
//!     .replace(Address::from_u64(11), Address::from_u64(12))
//!     .tag("v2")
//!     .metadata(Bytes::from_static(b"release notes"));
//!
//! let json = plan.to_json().unwrap();
//! assert_eq!(UpgradePlan::from_json(&json).unwrap(), plan);
//! ```

pub(crate) mod add;
pub(crate) mod remove;
pub(crate) mod replace;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::MsgPackCodec;
use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::handler::CallContext;
use crate::protocol::Address;
use crate::registry::Registry;

/// Post-upgrade initializer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    /// Handler whose code runs in the registry's context.
    pub target: Address,
    /// Raw input passed to it.
    #[serde(default)]
    pub input: Bytes,
}

/// One batched registry upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradePlan {
    /// Handlers whose groups are appended, in order.
    pub add: Vec<Address>,
    /// `(old, new)` replacement pairs, in order.
    pub replace: Vec<(Address, Address)>,
    /// Handlers whose groups are removed.
    pub remove: Vec<Address>,
    /// Optional initializer.
    pub init: Option<Delegate>,
    /// Metadata tag (empty when absent).
    pub tag: Option<String>,
    /// Metadata payload; recorded only when present.
    pub metadata: Option<Bytes>,
}

impl UpgradePlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler group.
    pub fn add(mut self, handler: Address) -> Self {
        self.add.push(handler);
        self
    }

    /// Replace `old`'s group with `new`'s.
    pub fn replace(mut self, old: Address, new: Address) -> Self {
        self.replace.push((old, new));
        self
    }

    /// Remove a handler group.
    pub fn remove(mut self, handler: Address) -> Self {
        self.remove.push(handler);
        self
    }

    /// Run `target` with `input` after the index changes.
    pub fn init(mut self, target: Address, input: impl Into<Bytes>) -> Self {
        self.init = Some(Delegate {
            target,
            input: input.into(),
        });
        self
    }

    /// Set the metadata tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the metadata payload.
    pub fn metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Check if the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.replace.is_empty()
            && self.remove.is_empty()
            && self.init.is_none()
            && self.metadata.is_none()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to MsgPack.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Parse from MsgPack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        MsgPackCodec::decode(bytes)
    }
}

impl Registry {
    /// Apply `plan` on behalf of `caller`.
    ///
    /// Either every step succeeds and the changes are committed, or the
    /// registry is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `ReentrantMutation` while a forwarded call is in flight
    /// - `Unauthorized` if the guard rejects `caller`
    /// - any add/replace/remove failure
    /// - `DelegateNoCode` / `DelegateFailed` from the initializer
    pub fn upgrade(&mut self, caller: Address, plan: UpgradePlan) -> Result<()> {
        if self.is_forwarding() {
            return Err(RegistryError::ReentrantMutation);
        }
        if !self.is_authorized(&caller) {
            return Err(RegistryError::Unauthorized { caller });
        }

        let cp = self.store_mut().checkpoint();
        match self.apply_upgrade(caller, plan) {
            Ok(()) => {
                self.store_mut().commit(cp);
                Ok(())
            }
            Err(e) => {
                self.store_mut().revert(cp);
                tracing::warn!(%caller, error = %e, "upgrade unwound");
                Err(e)
            }
        }
    }

    fn apply_upgrade(&mut self, caller: Address, plan: UpgradePlan) -> Result<()> {
        let UpgradePlan {
            add,
            replace,
            remove,
            init,
            tag,
            metadata,
        } = plan;

        {
            let (store, deployments) = self.parts_mut();
            add::add_groups(store, deployments, &add)?;
            replace::replace_groups(store, deployments, &replace)?;
            remove::remove_groups(store, deployments, &remove)?;
        }

        let init_target = match init {
            Some(delegate) => {
                let target = delegate.target;
                self.run_initializer(caller, delegate)?;
                Some(target)
            }
            None => None,
        };

        if let Some(value) = metadata {
            let tag = tag.unwrap_or_default();
            let store = self.store_mut();
            store.record_metadata(tag.clone(), value);
            store.emit(RegistryEvent::MetadataRecorded { tag });
        }

        tracing::debug!(
            added = add.len(),
            replaced = replace.len(),
            removed = remove.len(),
            init = ?init_target,
            "upgrade applied"
        );
        self.store_mut().emit(RegistryEvent::Upgraded {
            added: add.len(),
            replaced: replace.len(),
            removed: remove.len(),
            init: init_target,
        });
        Ok(())
    }

    /// Run the initializer in the registry's context.
    fn run_initializer(&mut self, caller: Address, delegate: Delegate) -> Result<()> {
        let code = self
            .deployments()
            .code_at(delegate.target)
            .ok_or(RegistryError::DelegateNoCode(delegate.target))?;

        self.enter_forwarding();
        let result = {
            let mut ctx = CallContext::new(self, caller, 0);
            code.invoke(&mut ctx, &delegate.input)
        };
        self.exit_forwarding();

        result
            .map(|_| ())
            .map_err(|revert| RegistryError::DelegateFailed(revert.into_bytes()))
    }
}
