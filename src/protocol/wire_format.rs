//! Key-list envelope encoding and decoding.
//!
//! Handlers describe themselves with a length-prefixed list of packed keys:
//! ```text
//! ┌────────────────┬───────────────────────────────┐
//! │ Byte length N  │ Packed keys                   │
//! │ 4 bytes u32 BE │ N bytes, 4 bytes per key      │
//! └────────────────┴───────────────────────────────┘
//! ```
//!
//! The first key is the group-head. Keys are never copied out of the
//! envelope: [`KeyList`] is a zero-copy `Bytes` slice with positional access.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::ids::{DispatchKey, KEY_SIZE};

/// Envelope header size in bytes (the minimum envelope).
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Reasons a key-list envelope is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Fewer bytes than the envelope header.
    #[error("envelope is {0} bytes, shorter than the {ENVELOPE_HEADER_SIZE}-byte header")]
    TooShort(usize),
    /// Declared length disagrees with the bytes that follow the header.
    #[error("declared {declared} key bytes but {available} follow the header")]
    LengthMismatch { declared: usize, available: usize },
    /// Key bytes are not a whole number of keys.
    #[error("{0} key bytes is not a multiple of {KEY_SIZE}")]
    Misaligned(usize),
    /// Envelope is well formed but holds no keys.
    #[error("envelope holds no keys")]
    Empty,
}

/// Read the key at `index` straight out of a packed buffer.
///
/// # Panics
///
/// Panics if `index >= packed.len() / 4`. Callers bound-check first.
#[inline]
pub fn decode_at(packed: &[u8], index: usize) -> DispatchKey {
    let at = index * KEY_SIZE;
    let b = &packed[at..at + KEY_SIZE];
    DispatchKey::new([b[0], b[1], b[2], b[3]])
}

/// Packed, validated list of dispatch keys exported by one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyList {
    packed: Bytes,
}

impl KeyList {
    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.packed.len() / KEY_SIZE
    }

    /// Always false for a decoded list; kept for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// The group-head (first key).
    #[inline]
    pub fn head(&self) -> DispatchKey {
        decode_at(&self.packed, 0)
    }

    /// Key at `index`, or `None` when out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<DispatchKey> {
        (index < self.len()).then(|| decode_at(&self.packed, index))
    }

    /// Key at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn decode_at(&self, index: usize) -> DispatchKey {
        decode_at(&self.packed, index)
    }

    /// Iterate keys in export order.
    pub fn iter(&self) -> impl Iterator<Item = DispatchKey> + '_ {
        self.packed
            .chunks_exact(KEY_SIZE)
            .map(|b| DispatchKey::new([b[0], b[1], b[2], b[3]]))
    }

    /// Packed key bytes (without the envelope header).
    #[inline]
    pub fn packed(&self) -> &Bytes {
        &self.packed
    }

    /// Collect into a vector.
    pub fn to_vec(&self) -> Vec<DispatchKey> {
        self.iter().collect()
    }
}

/// Build a key-list envelope.
///
/// # Example
///
/// ```
/// use dispatch_registry::protocol::{decode_key_list, encode_key_list, DispatchKey};
///
/// let keys = [DispatchKey::from_u32(1), DispatchKey::from_u32(2)];
/// let envelope = encode_key_list(&keys);
/// assert_eq!(envelope.len(), 4 + 8);
///
/// let list = decode_key_list(envelope).unwrap();
/// assert_eq!(list.head(), keys[0]);
/// ```
pub fn encode_key_list(keys: &[DispatchKey]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + keys.len() * KEY_SIZE);
    buf.put_u32((keys.len() * KEY_SIZE) as u32);
    for key in keys {
        buf.put_slice(key.as_bytes());
    }
    buf.freeze()
}

/// Decode and validate a key-list envelope.
///
/// Checks, in order: minimum envelope size, declared length against the
/// trailing bytes, 4-byte alignment, and a non-empty list.
pub fn decode_key_list(envelope: Bytes) -> Result<KeyList, EnvelopeError> {
    if envelope.len() < ENVELOPE_HEADER_SIZE {
        return Err(EnvelopeError::TooShort(envelope.len()));
    }

    let declared = u32::from_be_bytes([envelope[0], envelope[1], envelope[2], envelope[3]]) as usize;
    let available = envelope.len() - ENVELOPE_HEADER_SIZE;
    if declared != available {
        return Err(EnvelopeError::LengthMismatch {
            declared,
            available,
        });
    }

    if declared % KEY_SIZE != 0 {
        return Err(EnvelopeError::Misaligned(declared));
    }

    if declared == 0 {
        return Err(EnvelopeError::Empty);
    }

    Ok(KeyList {
        packed: envelope.slice(ENVELOPE_HEADER_SIZE..),
    })
}
