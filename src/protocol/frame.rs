//! Invocation framing.
//!
//! An invocation is a 4-byte dispatch key followed by argument bytes.
//! Uses `bytes::Bytes` so the argument slice shares the caller's buffer.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::protocol::{Call, DispatchKey};
//!
//! let call = Call::new(DispatchKey::from_u32(0x11), b"args");
//! let input = call.encode();
//! assert_eq!(&input[..4], &[0, 0, 0, 0x11]);
//!
//! let parsed = Call::parse(input).unwrap();
//! assert_eq!(parsed.key(), DispatchKey::from_u32(0x11));
//! assert_eq!(parsed.args(), b"args");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::ids::{DispatchKey, KEY_SIZE};

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    key: DispatchKey,
    args: Bytes,
}

impl Call {
    /// Create a call from a key and argument bytes (copies the arguments).
    pub fn new(key: DispatchKey, args: &[u8]) -> Self {
        Self {
            key,
            args: Bytes::copy_from_slice(args),
        }
    }

    /// Parse raw invocation input.
    ///
    /// Returns `None` for empty input (a bare value transfer). Input shorter
    /// than a key is zero-padded to form the key and carries no arguments.
    pub fn parse(input: Bytes) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        let key = DispatchKey::from_prefix(&input);
        let args = if input.len() > KEY_SIZE {
            input.slice(KEY_SIZE..)
        } else {
            Bytes::new()
        };
        Some(Self { key, args })
    }

    /// The dispatch key.
    #[inline]
    pub fn key(&self) -> DispatchKey {
        self.key
    }

    /// Argument bytes following the key.
    #[inline]
    pub fn args(&self) -> &[u8] {
        &self.args
    }

    /// Encode back to invocation input.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(KEY_SIZE + self.args.len());
        buf.put_slice(self.key.as_bytes());
        buf.put_slice(&self.args);
        buf.freeze()
    }
}

/// Build invocation input from a key and argument bytes.
pub fn build_call(key: DispatchKey, args: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(KEY_SIZE + args.len());
    buf.put_slice(key.as_bytes());
    buf.put_slice(args);
    buf.freeze()
}
