//! Key codec - imports a handler's exported key list.
//!
//! Queries the deployed handler for its key-list envelope and validates it
//! into a [`KeyList`]. Validation failures are reported against the handler
//! that produced them.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::codec::KeyCodec;
//! use dispatch_registry::handler::{Deployments, HandlerModule};
//! use dispatch_registry::protocol::{Address, DispatchKey};
//!
//! let mut deployments = Deployments::new();
//! let addr = Address::from_u64(1);
//! deployments.deploy(
//!     addr,
//!     HandlerModule::builder("a")
//!         .export(DispatchKey::from_u32(1))
//!         .export(DispatchKey::from_u32(2))
//!         .build(),
//! ).unwrap();
//!
//! let keys = KeyCodec::import_keys(&deployments, addr).unwrap();
//! assert_eq!(keys.len(), 2);
//! assert_eq!(KeyCodec::decode_at(keys.packed(), 1), DispatchKey::from_u32(2));
//! ```

use crate::error::{RegistryError, Result};
use crate::handler::Deployments;
use crate::protocol::{self, decode_key_list, Address, DispatchKey, EnvelopeError, KeyList};

/// Codec for handler key lists.
pub struct KeyCodec;

impl KeyCodec {
    /// Key at `index` of a packed buffer, without decoding the rest.
    ///
    /// # Panics
    ///
    /// Panics if `index >= packed.len() / 4`.
    #[inline]
    pub fn decode_at(packed: &[u8], index: usize) -> DispatchKey {
        protocol::decode_at(packed, index)
    }

    /// Query `handler` for its exported keys.
    ///
    /// # Errors
    ///
    /// - `NoCodeAtAddress` if nothing is deployed at `handler`
    /// - `QueryFailed` if the query itself fails
    /// - `MalformedKeyEncoding` if the envelope is short, misaligned or
    ///   length-inconsistent
    /// - `EmptyKeyList` if the envelope holds zero keys
    pub fn import_keys(deployments: &Deployments, handler: Address) -> Result<KeyList> {
        let code = deployments
            .code_at(handler)
            .ok_or(RegistryError::NoCodeAtAddress(handler))?;

        let envelope = code
            .exported_keys()
            .map_err(|revert| RegistryError::QueryFailed {
                handler,
                reason: revert.into_bytes(),
            })?;

        decode_key_list(envelope).map_err(|e| match e {
            EnvelopeError::Empty => RegistryError::EmptyKeyList(handler),
            other => RegistryError::MalformedKeyEncoding {
                handler,
                reason: other.to_string(),
            },
        })
    }
}
