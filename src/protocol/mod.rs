//! Protocol module - identifiers, key-list envelope, and invocation framing.
//!
//! This module implements the byte-level formats the registry speaks:
//! - 4-byte dispatch keys and 20-byte addresses
//! - Length-prefixed key-list envelope returned by handler introspection
//! - Invocation framing (key + arguments)

mod frame;
mod ids;
mod wire_format;

pub use frame::{build_call, Call};
pub use ids::{Address, DispatchKey, ParseIdError, ADDRESS_SIZE, KEY_SIZE};
pub use wire_format::{
    decode_at, decode_key_list, encode_key_list, EnvelopeError, KeyList, ENVELOPE_HEADER_SIZE,
};
