use crate::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte contract storage key, big-endian on the interpreter stack.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageKey(pub [u8; 32]);

impl StorageKey {
    /// Build from a raw 32-byte array.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a `U256` stack value.
    #[must_use]
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }

    /// Interpret as a `U256`.
    #[must_use]
    pub fn to_u256(self) -> U256 {
        U256::from_big_endian(&self.0)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:0x{}", hex_prefix(&self.0))
    }
}

/// A 32-byte contract storage value. Missing slots read as `ZERO` (§4
/// storage idempotence / zero-default invariant).
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageValue(pub [u8; 32]);

impl StorageValue {
    /// The zero value returned for an unwritten slot.
    pub const ZERO: StorageValue = StorageValue([0u8; 32]);

    /// Build from a `U256` stack value.
    #[must_use]
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }

    /// Interpret as a `U256`.
    #[must_use]
    pub fn to_u256(self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Whether this is the zero value.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl Default for StorageValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "val:0x{}", hex_prefix(&self.0))
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    format!(
        "{:02x}{:02x}..{:02x}{:02x}",
        bytes[0], bytes[1], bytes[30], bytes[31]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_value_reads_back_as_zero() {
        assert!(StorageValue::ZERO.is_zero());
        assert!(StorageValue::default().is_zero());
    }

    #[test]
    fn u256_roundtrip() {
        let value = StorageValue::from_u256(U256::from(2));
        assert_eq!(value.to_u256(), U256::from(2));
        assert!(!value.is_zero());
    }
}
