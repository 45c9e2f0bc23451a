//! Deployed handler code, by address.
//!
//! Stands in for "executable code at an address": an address with no entry
//! here has no code, and key imports from it fail with `NoCodeAtAddress`.
//! Code at an address is immutable once deployed. Deploying code never
//! touches the registry store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Handler;
use crate::error::{RegistryError, Result};
use crate::protocol::Address;

/// Map from address to deployed handler.
#[derive(Clone, Default)]
pub struct Deployments {
    code: HashMap<Address, Arc<dyn Handler>>,
}

impl Deployments {
    /// Create an empty set of deployments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy `handler` at `address`.
    ///
    /// # Errors
    ///
    /// `CodeAlreadyDeployed` if `address` already has code.
    pub fn deploy<H: Handler>(&mut self, address: Address, handler: H) -> Result<()> {
        self.deploy_arc(address, Arc::new(handler))
    }

    /// Deploy an already shared handler.
    pub fn deploy_arc(&mut self, address: Address, handler: Arc<dyn Handler>) -> Result<()> {
        match self.code.entry(address) {
            Entry::Occupied(_) => Err(RegistryError::CodeAlreadyDeployed(address)),
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    /// Code deployed at `address`.
    #[inline]
    pub fn code_at(&self, address: Address) -> Option<Arc<dyn Handler>> {
        self.code.get(&address).cloned()
    }

    /// Check if `address` has code.
    #[inline]
    pub fn has_code(&self, address: Address) -> bool {
        self.code.contains_key(&address)
    }

    /// Number of deployed handlers.
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if nothing is deployed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Debug for Deployments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.code.keys()).finish()
    }
}
