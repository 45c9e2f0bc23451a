//! Authorization guard for mutation entry points.
//!
//! The registry only consumes [`AuthorizationGuard::current_principal`] and
//! [`AuthorizationGuard::authorize`]. [`SingleOwner`] is the stock guard: one
//! owner address that may transfer or renounce its role.

use crate::error::{RegistryError, Result};
use crate::protocol::Address;

/// Gate for registry mutations.
pub trait AuthorizationGuard: Send + Sync + 'static {
    /// The principal currently allowed to mutate, if any.
    fn current_principal(&self) -> Option<Address>;

    /// Check whether `caller` may mutate.
    fn authorize(&self, caller: &Address) -> bool {
        self.current_principal().as_ref() == Some(caller)
    }

    /// Hand the role to `new_principal` (`None` renounces it).
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless `caller` is the current principal.
    fn transfer(&mut self, caller: &Address, new_principal: Option<Address>) -> Result<()>;
}

/// Single-owner guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleOwner {
    owner: Option<Address>,
}

impl SingleOwner {
    /// Guard owned by `owner`. The zero address means nobody.
    pub fn new(owner: Address) -> Self {
        Self {
            owner: (!owner.is_zero()).then_some(owner),
        }
    }

    /// Guard nobody can pass.
    pub fn renounced() -> Self {
        Self { owner: None }
    }
}

impl AuthorizationGuard for SingleOwner {
    fn current_principal(&self) -> Option<Address> {
        self.owner
    }

    fn transfer(&mut self, caller: &Address, new_principal: Option<Address>) -> Result<()> {
        if !self.authorize(caller) {
            return Err(RegistryError::Unauthorized { caller: *caller });
        }
        self.owner = new_principal.filter(|a| !a.is_zero());
        Ok(())
    }
}
