use serde::{Deserialize, Serialize};
use std::fmt;

/// A variable-length byte buffer (contract bytecode, call input, revert data).
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Build from a `Vec<u8>`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Build by copying a slice.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self(data.to_vec())
    }

    /// Borrow the underlying bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 8 {
            write!(f, "0x")?;
            for byte in &self.0 {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        } else {
            write!(
                f,
                "0x{:02x}{:02x}{:02x}{:02x}.. ({} bytes)",
                self.0[0],
                self.0[1],
                self.0[2],
                self.0[3],
                self.0.len()
            )
        }
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}
