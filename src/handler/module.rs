//! Handler trait and the [`HandlerModule`] builder.
//!
//! A handler is an independently deployed module. It answers two questions:
//! which dispatch keys it serves ([`Handler::exported_keys`]), and what a
//! forwarded call does ([`Handler::invoke`]).
//!
//! [`HandlerModule`] builds handlers from closures keyed by dispatch key.
//! The first key registered becomes the group-head.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::handler::{HandlerModule, Revert};
//! use dispatch_registry::protocol::DispatchKey;
//!
//! let counter = HandlerModule::builder("counter")
//!     .typed(DispatchKey::from_u32(0x01), |ctx, by: u64| {
//!         let current = ctx
//!             .load(b"count")
//!             .map(|b| u64::from_be_bytes(b[..8].try_into().unwrap_or([0; 8])))
//!             .unwrap_or(0);
//!         let next = current + by;
//!         ctx.store(&b"count"[..], next.to_be_bytes().to_vec());
//!         Ok::<_, Revert>(next)
//!     })
//!     .export(DispatchKey::from_u32(0x02))
//!     .build();
//!
//! assert_eq!(counter.keys().len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CallContext;
use crate::codec::MsgPackCodec;
use crate::error::RegistryError;
use crate::protocol::{encode_key_list, DispatchKey, KEY_SIZE};

/// Raw failure data raised by a handler.
///
/// The registry never interprets it; the dispatcher hands it back to the
/// original caller byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revert(Bytes);

impl Revert {
    /// Create from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Create from a UTF-8 message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Bytes::from(message.into()))
    }

    /// Raw failure bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    /// Into raw failure bytes.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<RegistryError> for Revert {
    /// Bubble a nested failure: forwarded failure data passes through
    /// unchanged, anything else becomes its message.
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::HandlerReverted(data) | RegistryError::DelegateFailed(data) => {
                Self(data)
            }
            other => Self::msg(other.to_string()),
        }
    }
}

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<Bytes, Revert>;

/// Trait for deployed handler modules.
pub trait Handler: Send + Sync + 'static {
    /// Key-list envelope naming every key this handler serves.
    ///
    /// Must be side-effect free and return the same answer for the whole
    /// deployed lifetime of the handler.
    fn exported_keys(&self) -> std::result::Result<Bytes, Revert>;

    /// Execute a forwarded call. `input` is the full invocation, key included.
    fn invoke(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> HandlerResult;
}

type RouteFn = dyn Fn(&mut CallContext<'_>, &[u8]) -> HandlerResult + Send + Sync;

/// Handler assembled from per-key closures.
pub struct HandlerModule {
    name: String,
    keys: Vec<DispatchKey>,
    routes: HashMap<DispatchKey, Box<RouteFn>>,
}

impl HandlerModule {
    /// Start building a module.
    pub fn builder(name: &str) -> HandlerModuleBuilder {
        HandlerModuleBuilder {
            module: HandlerModule {
                name: name.to_string(),
                keys: Vec::new(),
                routes: HashMap::new(),
            },
        }
    }

    /// Module name (diagnostics only).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exported keys in export order.
    pub fn keys(&self) -> &[DispatchKey] {
        &self.keys
    }
}

impl fmt::Debug for HandlerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerModule")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Handler for HandlerModule {
    fn exported_keys(&self) -> std::result::Result<Bytes, Revert> {
        Ok(encode_key_list(&self.keys))
    }

    fn invoke(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> HandlerResult {
        let key = DispatchKey::from_prefix(input);
        let args = input.get(KEY_SIZE..).unwrap_or(&[]);
        match self.routes.get(&key) {
            Some(route) => route(ctx, args),
            None => Err(Revert::msg(format!("{}: no route for key {}", self.name, key))),
        }
    }
}

/// Builder for [`HandlerModule`].
pub struct HandlerModuleBuilder {
    module: HandlerModule,
}

impl HandlerModuleBuilder {
    /// Register a raw route. The closure receives the argument bytes
    /// following the key.
    pub fn route<F>(mut self, key: DispatchKey, handler: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, &[u8]) -> HandlerResult + Send + Sync + 'static,
    {
        if !self.module.keys.contains(&key) {
            self.module.keys.push(key);
        }
        self.module.routes.insert(key, Box::new(handler));
        self
    }

    /// Register a typed route.
    ///
    /// Arguments are decoded from MsgPack and the return value encoded back
    /// to MsgPack. Malformed arguments revert with the decode error message.
    pub fn typed<F, T, R>(self, key: DispatchKey, handler: F) -> Self
    where
        F: Fn(&mut CallContext<'_>, T) -> std::result::Result<R, Revert> + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
    {
        self.route(key, move |ctx, args| {
            let parsed: T = MsgPackCodec::decode(args).map_err(|e| Revert::msg(e.to_string()))?;
            let output = handler(ctx, parsed)?;
            MsgPackCodec::encode_bytes(&output).map_err(|e| Revert::msg(e.to_string()))
        })
    }

    /// Export a key without a route. Invoking it reverts.
    pub fn export(mut self, key: DispatchKey) -> Self {
        if !self.module.keys.contains(&key) {
            self.module.keys.push(key);
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> HandlerModule {
        self.module
    }
}
