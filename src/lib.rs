//! # dispatch-registry
//!
//! Upgradeable dispatch registry: routes invocations to independently
//! deployed handlers by a 4-byte dispatch key, and lets an authorized
//! principal add, replace and remove whole handler groups atomically.
//!
//! ## Architecture
//!
//! - **Store**: key index plus a doubly-linked list of group-heads, with an
//!   undo journal for all-or-nothing invocations
//! - **Mutation engine**: one [`UpgradePlan`] runs add, replace, remove, an
//!   optional initializer and an optional metadata record
//! - **Dispatcher**: forwards calls in the registry's own context
//! - **Service**: a tokio task that serializes access to a registry
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use dispatch_registry::{Registry, UpgradePlan};
//! use dispatch_registry::handler::HandlerModule;
//! use dispatch_registry::protocol::{build_call, Address, DispatchKey};
//!
//! let owner = Address::from_u64(1);
//! let facet = Address::from_u64(10);
//! let ping = DispatchKey::from_u32(0x5049_4e47);
//!
//! let mut registry = Registry::builder()
//!     .owner(owner)
//!     .deploy(
//!         facet,
//!         HandlerModule::builder("ping")
//!             .route(ping, |_ctx, _args| Ok(Bytes::from_static(b"pong")))
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! registry.upgrade(owner, UpgradePlan::new().add(facet)).unwrap();
//! let out = registry.dispatch(Address::from_u64(2), 0, build_call(ping, &[])).unwrap();
//! assert_eq!(out.as_ref(), b"pong");
//! ```

pub mod auth;
pub mod codec;
pub mod error;
pub mod events;
pub mod handler;
pub mod introspect;
pub mod mutation;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod store;

mod dispatch;

pub use auth::{AuthorizationGuard, SingleOwner};
pub use error::{ErrorKind, RegistryError, Result};
pub use events::RegistryEvent;
pub use introspect::HandlerGroup;
pub use mutation::{Delegate, UpgradePlan};
pub use registry::{Registry, RegistryBuilder};
pub use service::{RegistryHandle, RegistryService, ServiceConfig};
