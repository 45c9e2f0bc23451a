//! Registry - the store, the deployed code, and the guard, owned together.
//!
//! The [`RegistryBuilder`] provides a fluent API for assembling a registry.
//! Operations live next to their algorithms:
//! - [`Registry::upgrade`] in [`crate::mutation`]
//! - [`Registry::dispatch`] in [`crate::dispatch`]
//! - [`Registry::handler_for`] and friends in [`crate::introspect`]
//!
//! # Example
//!
//! ```
//! use dispatch_registry::{Registry, UpgradePlan};
//! use dispatch_registry::handler::HandlerModule;
//! use dispatch_registry::protocol::{Address, DispatchKey};
//!
//! let owner = Address::from_u64(1);
//! let facet = Address::from_u64(10);
//!
//! let mut registry = Registry::builder()
//!     .address(Address::from_u64(0xD1))
//!     .owner(owner)
//!     .deploy(facet, HandlerModule::builder("a").export(DispatchKey::from_u32(1)).build())
//!     .build()
//!     .unwrap();
//!
//! registry.upgrade(owner, UpgradePlan::new().add(facet)).unwrap();
//! assert_eq!(registry.handler_for(DispatchKey::from_u32(1)), Some(facet));
//! ```

use std::sync::Arc;

use crate::auth::{AuthorizationGuard, SingleOwner};
use crate::error::Result;
use crate::events::RegistryEvent;
use crate::handler::{Deployments, Handler};
use crate::protocol::Address;
use crate::store::RegistryStore;

/// A dispatch registry.
pub struct Registry {
    /// The registry's own identity.
    address: Address,
    /// Persistent state.
    store: RegistryStore,
    /// Deployed handler code.
    deployments: Deployments,
    /// Gate for mutation entry points.
    guard: Box<dyn AuthorizationGuard>,
    /// Forwarded calls currently in flight.
    forwarding: usize,
}

impl Registry {
    /// Create a registry builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Assemble a registry from its parts.
    pub fn new(
        address: Address,
        store: RegistryStore,
        deployments: Deployments,
        guard: impl AuthorizationGuard,
    ) -> Self {
        Self {
            address,
            store,
            deployments,
            guard: Box::new(guard),
            forwarding: 0,
        }
    }

    /// The registry's own address.
    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Read access to the store.
    #[inline]
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    #[inline]
    pub(crate) fn store_mut(&mut self) -> &mut RegistryStore {
        &mut self.store
    }

    /// Deployed handler code.
    #[inline]
    pub fn deployments(&self) -> &Deployments {
        &self.deployments
    }

    /// Deploy handler code at `address`. Does not register any key.
    ///
    /// # Errors
    ///
    /// `CodeAlreadyDeployed` if `address` already has code.
    pub fn deploy<H: Handler>(&mut self, address: Address, handler: H) -> Result<()> {
        self.deployments.deploy(address, handler)
    }

    /// Deploy already shared handler code at `address`.
    pub fn deploy_arc(&mut self, address: Address, handler: Arc<dyn Handler>) -> Result<()> {
        self.deployments.deploy_arc(address, handler)
    }

    /// Principal currently allowed to mutate.
    pub fn owner(&self) -> Option<Address> {
        self.guard.current_principal()
    }

    /// Hand mutation rights to `new_owner`.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.set_principal(caller, Some(new_owner))
    }

    /// Give up mutation rights for good.
    pub fn renounce_ownership(&mut self, caller: Address) -> Result<()> {
        self.set_principal(caller, None)
    }

    fn set_principal(&mut self, caller: Address, next: Option<Address>) -> Result<()> {
        let previous = self.guard.current_principal();
        self.guard.transfer(&caller, next)?;
        let current = self.guard.current_principal();
        tracing::debug!(?previous, ?current, "ownership transferred");
        self.store
            .emit(RegistryEvent::OwnershipTransferred { previous, current });
        Ok(())
    }

    /// Check whether `caller` passes the guard.
    #[inline]
    pub(crate) fn is_authorized(&self, caller: &Address) -> bool {
        self.guard.authorize(caller)
    }

    /// Check if a forwarded call is in flight.
    #[inline]
    pub fn is_forwarding(&self) -> bool {
        self.forwarding > 0
    }

    #[inline]
    pub(crate) fn enter_forwarding(&mut self) {
        self.forwarding += 1;
    }

    #[inline]
    pub(crate) fn exit_forwarding(&mut self) {
        self.forwarding = self.forwarding.saturating_sub(1);
    }

    /// Drain committed events. Events queue up until drained.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.store.take_events()
    }

    /// Split borrow used by the mutation engine.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (&mut RegistryStore, &Deployments) {
        (&mut self.store, &self.deployments)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("address", &self.address)
            .field("list", self.store.list())
            .field("deployments", &self.deployments)
            .field("owner", &self.guard.current_principal())
            .finish()
    }
}

/// Builder for [`Registry`].
///
/// Defaults: zero registry address, empty store, no deployments, and a
/// renounced [`SingleOwner`] guard (nobody can mutate) unless `owner` or
/// `guard` is set.
pub struct RegistryBuilder {
    address: Address,
    store: RegistryStore,
    deployments: Vec<(Address, Arc<dyn Handler>)>,
    guard: Option<Box<dyn AuthorizationGuard>>,
}

impl RegistryBuilder {
    /// Create a new registry builder.
    pub fn new() -> Self {
        Self {
            address: Address::ZERO,
            store: RegistryStore::new(),
            deployments: Vec::new(),
            guard: None,
        }
    }

    /// Set the registry's own address.
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Use a [`SingleOwner`] guard owned by `owner`.
    pub fn owner(mut self, owner: Address) -> Self {
        self.guard = Some(Box::new(SingleOwner::new(owner)));
        self
    }

    /// Use a custom guard.
    pub fn guard(mut self, guard: impl AuthorizationGuard) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Start from an existing store.
    pub fn store(mut self, store: RegistryStore) -> Self {
        self.store = store;
        self
    }

    /// Deploy handler code at `address` when the registry is built.
    pub fn deploy<H: Handler>(mut self, address: Address, handler: H) -> Self {
        self.deployments.push((address, Arc::new(handler)));
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    ///
    /// `CodeAlreadyDeployed` if two deployments name the same address.
    pub fn build(self) -> Result<Registry> {
        let mut deployments = Deployments::new();
        for (address, handler) in self.deployments {
            deployments.deploy_arc(address, handler)?;
        }
        Ok(Registry {
            address: self.address,
            store: self.store,
            deployments,
            guard: self
                .guard
                .unwrap_or_else(|| Box::new(SingleOwner::renounced())),
            forwarding: 0,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
