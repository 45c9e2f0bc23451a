//! Error types for dispatch-registry.

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::{Address, DispatchKey};

/// Coarse classification of [`RegistryError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller is not permitted to perform the operation.
    Authorization,
    /// A handler exported a malformed, misaligned or empty key list.
    Encoding,
    /// The requested mutation conflicts with the current index.
    Conflict,
    /// A dispatched key has no handler.
    Resolution,
    /// A forwarded call failed inside the handler.
    Forwarding,
    /// The optional post-upgrade initializer is missing or failed.
    Delegation,
    /// Serialization of an upgrade plan failed.
    Serialization,
    /// The registry service is no longer running.
    Service,
}

/// Main error type for all registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Caller is not the authorized principal.
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Address },

    /// A mutation was attempted while a forwarded call was in flight.
    #[error("Mutation attempted during forwarded call")]
    ReentrantMutation,

    /// No handler is deployed at the address.
    #[error("No code at address: {0}")]
    NoCodeAtAddress(Address),

    /// The handler's key-list query failed.
    #[error("Key query failed for handler {handler}")]
    QueryFailed { handler: Address, reason: Bytes },

    /// The key-list envelope could not be decoded.
    #[error("Malformed key encoding from {handler}: {reason}")]
    MalformedKeyEncoding { handler: Address, reason: String },

    /// The handler exported zero keys.
    #[error("Empty key list from handler {0}")]
    EmptyKeyList(Address),

    /// Code is already deployed at the address.
    #[error("Code already deployed at address: {0}")]
    CodeAlreadyDeployed(Address),

    /// Key is already registered.
    #[error("Duplicate key: {0}")]
    DuplicateKey(DispatchKey),

    /// Replacement pair names the same handler twice.
    #[error("Handler {0} cannot replace itself")]
    SelfReplacement(Address),

    /// The old handler of a replacement pair does not own its group-head.
    #[error("Old handler not registered: {0}")]
    OldHandlerNotRegistered(Address),

    /// Key belongs to a handler outside the replacement pair.
    #[error("Key {key} already belongs to handler {owner}")]
    ForeignKeyConflict { key: DispatchKey, owner: Address },

    /// Handler does not own its group-head.
    #[error("Handler not registered: {0}")]
    NotRegistered(Address),

    /// No handler is bound to the dispatched key.
    #[error("No handler for key: {0}")]
    NoHandlerForKey(DispatchKey),

    /// The forwarded call failed; payload is the handler's raw failure data.
    #[error("Handler reverted ({} bytes)", .0.len())]
    HandlerReverted(Bytes),

    /// The initializer target has no deployed code.
    #[error("Initializer has no code: {0}")]
    DelegateNoCode(Address),

    /// The initializer call failed; payload is its raw failure data.
    #[error("Initializer reverted ({} bytes)", .0.len())]
    DelegateFailed(Bytes),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// The registry service task has stopped.
    #[error("Registry service closed")]
    ServiceClosed,
}

impl RegistryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } | Self::ReentrantMutation => ErrorKind::Authorization,
            Self::NoCodeAtAddress(_)
            | Self::QueryFailed { .. }
            | Self::MalformedKeyEncoding { .. }
            | Self::EmptyKeyList(_) => ErrorKind::Encoding,
            Self::CodeAlreadyDeployed(_)
            | Self::DuplicateKey(_)
            | Self::SelfReplacement(_)
            | Self::OldHandlerNotRegistered(_)
            | Self::ForeignKeyConflict { .. }
            | Self::NotRegistered(_) => ErrorKind::Conflict,
            Self::NoHandlerForKey(_) => ErrorKind::Resolution,
            Self::HandlerReverted(_) => ErrorKind::Forwarding,
            Self::DelegateNoCode(_) | Self::DelegateFailed(_) => ErrorKind::Delegation,
            Self::Json(_) | Self::MsgPackEncode(_) | Self::MsgPackDecode(_) => {
                ErrorKind::Serialization
            }
            Self::ServiceClosed => ErrorKind::Service,
        }
    }

    /// Raw failure bytes of a forwarded or delegated call, if any.
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Self::HandlerReverted(data) | Self::DelegateFailed(data) => Some(data),
            _ => None,
        }
    }
}

/// Result type alias using RegistryError.
pub type Result<T> = std::result::Result<T, RegistryError>;
