//! Dispatcher - routes an invocation to the handler bound to its key.
//!
//! The forwarded call runs in the registry's own context: it sees the
//! original caller and value, and its slot writes land in the registry store.
//! Each dispatch opens a store checkpoint, so a failing handler leaves no
//! trace and its failure bytes reach the caller unchanged.

use bytes::Bytes;

use crate::error::{RegistryError, Result};
use crate::handler::CallContext;
use crate::protocol::{Address, Call};
use crate::registry::Registry;

impl Registry {
    /// Route `input` to the handler bound to its leading key.
    ///
    /// Empty input is a bare value transfer and returns empty output.
    ///
    /// # Errors
    ///
    /// - `NoHandlerForKey` if the key is unregistered (nothing is forwarded)
    /// - `NoCodeAtAddress` if the bound handler has no deployed code
    /// - `HandlerReverted` carrying the handler's failure bytes verbatim
    pub fn dispatch(
        &mut self,
        caller: Address,
        value: u128,
        input: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let input = input.into();
        let Some(call) = Call::parse(input.clone()) else {
            tracing::trace!(%caller, value, "bare value transfer");
            return Ok(Bytes::new());
        };

        let key = call.key();
        let handler = self
            .store()
            .handler_of(key)
            .ok_or(RegistryError::NoHandlerForKey(key))?;
        let code = self
            .deployments()
            .code_at(handler)
            .ok_or(RegistryError::NoCodeAtAddress(handler))?;

        tracing::trace!(%caller, %key, %handler, "forwarding call");

        let cp = self.store_mut().checkpoint();
        self.enter_forwarding();
        let result = {
            let mut ctx = CallContext::new(self, caller, value);
            code.invoke(&mut ctx, &input)
        };
        self.exit_forwarding();

        match result {
            Ok(output) => {
                self.store_mut().commit(cp);
                Ok(output)
            }
            Err(revert) => {
                self.store_mut().revert(cp);
                tracing::warn!(%key, %handler, bytes = revert.data().len(), "call reverted");
                Err(RegistryError::HandlerReverted(revert.into_bytes()))
            }
        }
    }
}
