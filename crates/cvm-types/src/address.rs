use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build from a raw 20-byte array.
    #[must_use]
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, failing if the length is not 20.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 20 {
            return None;
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(slice);
        Some(Self(bytes))
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the deterministic contract address for a (deployer, nonce)
    /// pair: the leftmost 20 bytes of SHA-256(deployer ‖ nonce-be-u64).
    #[must_use]
    pub fn derive_contract(deployer: Address, nonce: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(deployer.0);
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Lowercase hex encoding without a `0x` prefix, used as the body of
    /// generic extension store keys (`behavior_<hex>`, `trust_<hex>_<hex>`).
    #[must_use]
    pub fn to_hex(self) -> String {
        let mut out = String::with_capacity(40);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x}{:02x}..{:02x}{:02x}",
            self.0[0], self.0[1], self.0[18], self.0[19]
        )
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_contract_is_deterministic() {
        let deployer = Address::new([0x11; 20]);
        let a = Address::derive_contract(deployer, 0);
        let b = Address::derive_contract(deployer, 0);
        assert_eq!(a, b);
        let c = Address::derive_contract(deployer, 1);
        assert_ne!(a, c);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(Address::from_slice(&[0u8; 19]).is_none());
        assert!(Address::from_slice(&[0u8; 20]).is_some());
    }

    #[test]
    fn hex_roundtrip_length() {
        let addr = Address::new([0xab; 20]);
        assert_eq!(addr.to_hex().len(), 40);
    }
}
