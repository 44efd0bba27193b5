//! # Cascoin Core Value Objects
//!
//! Shared newtypes used across the interpreter, store, envelope codec,
//! reputation compositor, and block processor. Kept dependency-free of any
//! one of those crates so all of them can depend on it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod address;
mod bytes;
mod hash;
mod storage;

pub use address::Address;
pub use bytes::Bytes;
pub use hash::Hash;
pub use storage::{StorageKey, StorageValue};

/// 256-bit integer used on the interpreter's operand stack and for amounts.
pub use primitive_types::U256;

/// Convert a 32-byte big-endian buffer to `U256`.
#[must_use]
pub fn u256_from_be_bytes(bytes: &[u8; 32]) -> U256 {
    U256::from_big_endian(bytes)
}

/// Convert `U256` to a 32-byte big-endian buffer.
#[must_use]
pub fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_roundtrip() {
        let value = U256::from(424_242u64);
        let bytes = u256_to_be_bytes(value);
        assert_eq!(u256_from_be_bytes(&bytes), value);
    }
}
