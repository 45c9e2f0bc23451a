//! Handler module - deployed handler code and its call context.
//!
//! Provides:
//! - [`Handler`] - the trait every deployed module implements
//! - [`HandlerModule`] - builds handlers from per-key closures
//! - [`CallContext`] - the registry context a forwarded call runs in
//! - [`Deployments`] - handler code by address
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use dispatch_registry::handler::{Deployments, HandlerModule};
//! use dispatch_registry::protocol::{Address, DispatchKey};
//!
//! let mut deployments = Deployments::new();
//!
//! // Raw route: receives argument bytes, returns output bytes
//! let echo = HandlerModule::builder("echo")
//!     .route(DispatchKey::from_u32(0x01), |_ctx, args| Ok(Bytes::copy_from_slice(args)))
//!     .build();
//!
//! deployments.deploy(Address::from_u64(1), echo).unwrap();
//! assert!(deployments.has_code(Address::from_u64(1)));
//! ```

mod context;
mod deployments;
mod module;

pub use context::CallContext;
pub use deployments::Deployments;
pub use module::{Handler, HandlerModule, HandlerModuleBuilder, HandlerResult, Revert};
