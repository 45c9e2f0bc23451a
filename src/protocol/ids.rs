//! Fixed-width identifiers: dispatch keys and addresses.
//!
//! Both are plain byte arrays rendered as `0x`-prefixed lowercase hex.
//!
//! # Example
//!
//! ```
//! use dispatch_registry::protocol::{Address, DispatchKey};
//!
//! let key = DispatchKey::from_u32(0xa9059cbb);
//! assert_eq!(key.to_string(), "0xa9059cbb");
//!
//! let handler = Address::from_u64(7);
//! assert!(!handler.is_zero());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Dispatch key size in bytes (fixed, exactly 4).
pub const KEY_SIZE: usize = 4;

/// Address size in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Error parsing a hex-encoded key or address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    /// Wrong number of hex digits.
    #[error("expected {expected} hex digits, got {actual}")]
    Length { expected: usize, actual: usize },
    /// A character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit in {0:?}")]
    Digit(String),
}

/// Parse `0x`-optional hex into a fixed-size byte array.
fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { .. } => ParseIdError::Digit(s.to_string()),
        _ => ParseIdError::Length {
            expected: N * 2,
            actual: digits.len(),
        },
    })?;
    Ok(out)
}

/// Opaque 4-byte identifier selecting which handler processes an invocation.
///
/// The key space is not collision-free; uniqueness inside a registry is
/// enforced by the registry itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchKey([u8; KEY_SIZE]);

impl DispatchKey {
    /// Create a key from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a key from a Big Endian integer.
    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Read a key from the first 4 bytes of `buf`, zero-padding short input.
    pub fn from_prefix(buf: &[u8]) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        let n = buf.len().min(KEY_SIZE);
        bytes[..n].copy_from_slice(&buf[..n]);
        Self(bytes)
    }

    /// Raw key bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Key as a Big Endian integer.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for DispatchKey {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<[u8; KEY_SIZE]> for DispatchKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchKey({})", self)
    }
}

impl FromStr for DispatchKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<KEY_SIZE>(s).map(Self)
    }
}

/// 20-byte identity of a handler, caller, principal or the registry itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// The zero address ("none").
    pub const ZERO: Address = Address([0u8; ADDRESS_SIZE]);

    /// Create an address from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create an address whose low 8 bytes hold `value` (Big Endian).
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[ADDRESS_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Raw address bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Check if this is the zero address.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_SIZE]
    }
}

impl From<[u8; ADDRESS_SIZE]> for Address {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex::<ADDRESS_SIZE>(s).map(Self)
    }
}

// Both identifiers serialize as their `0x` hex form, in every format.

impl Serialize for DispatchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DispatchKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
