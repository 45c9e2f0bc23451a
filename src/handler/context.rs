//! Call context for forwarded handler code.
//!
//! A handler invoked through the registry runs as if it were the registry's
//! own code: it sees the original caller, and every slot it writes lands in
//! the registry's store (journaled, so a failing call leaves no trace).
//!
//! Provides:
//! - `caller` / `value` / `registry_address` - invocation identity
//! - `load` / `store` / `clear` - persistent slots
//! - `handler_for` - read-only key lookup
//! - `call_self` - nested dispatch through the registry
//! - `upgrade` - mutation attempt (always refused while forwarding)
//!
//! # Example
//!
//! ```ignore
//! fn bump(ctx: &mut CallContext<'_>, _args: &[u8]) -> HandlerResult {
//!     let hits = ctx.load(b"hits").map(|b| b.len()).unwrap_or(0);
//!     ctx.store(&b"hits"[..], vec![0u8; hits + 1]);
//!     Ok(Bytes::new())
//! }
//! ```

use bytes::Bytes;

use crate::error::Result;
use crate::mutation::UpgradePlan;
use crate::protocol::{Address, DispatchKey};
use crate::registry::Registry;

/// Context passed to [`Handler::invoke`](super::Handler::invoke).
pub struct CallContext<'a> {
    /// Registry whose state the call executes against.
    registry: &'a mut Registry,
    /// Original caller.
    caller: Address,
    /// Value attached to the invocation.
    value: u128,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(registry: &'a mut Registry, caller: Address, value: u128) -> Self {
        Self {
            registry,
            caller,
            value,
        }
    }

    /// The original caller.
    #[inline]
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Value attached to the invocation.
    #[inline]
    pub fn value(&self) -> u128 {
        self.value
    }

    /// The registry's own address.
    #[inline]
    pub fn registry_address(&self) -> Address {
        self.registry.address()
    }

    /// Read a persistent slot (cheap `Bytes` clone).
    pub fn load(&self, slot: &[u8]) -> Option<Bytes> {
        self.registry.store().load(slot).cloned()
    }

    /// Write a persistent slot.
    pub fn store(&mut self, slot: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.registry.store_mut().store(slot.into(), value.into());
    }

    /// Clear a persistent slot.
    pub fn clear(&mut self, slot: &[u8]) {
        self.registry.store_mut().clear(slot);
    }

    /// Handler currently bound to `key`.
    pub fn handler_for(&self, key: DispatchKey) -> Option<Address> {
        self.registry.store().handler_of(key)
    }

    /// Dispatch `input` through the registry, with the registry itself as
    /// caller. A failing nested call only unwinds its own writes.
    pub fn call_self(&mut self, input: impl Into<Bytes>) -> Result<Bytes> {
        let caller = self.registry.address();
        self.registry.dispatch(caller, 0, input)
    }

    /// Attempt a registry upgrade as the original caller.
    ///
    /// Mutation is refused while any forwarded call is in flight, so this
    /// always fails with [`RegistryError::ReentrantMutation`].
    ///
    /// [`RegistryError::ReentrantMutation`]: crate::RegistryError::ReentrantMutation
    pub fn upgrade(&mut self, plan: UpgradePlan) -> Result<()> {
        let caller = self.caller;
        self.registry.upgrade(caller, plan)
    }
}
