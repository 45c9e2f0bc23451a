//! Codec module - key-list import and payload serialization.
//!
//! - [`KeyCodec`] - queries a handler for its packed key list and validates it
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`) for
//!   typed handler arguments and upgrade plans
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&(7u64, "seven")).unwrap();
//! let decoded: (u64, String) = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, (7, "seven".to_string()));
//! ```

mod keys;
mod msgpack;

pub use keys::KeyCodec;
pub use msgpack::MsgPackCodec;
