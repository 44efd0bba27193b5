//! Canonical little-endian, length-tagged field encoding for envelope bodies
//! (§6.1). Every variable-length field is a 4-byte LE length prefix followed
//! by that many bytes; every fixed-width field (address, hash, u64, i32,
//! bool) has no length prefix since its width is implied by its type.

use cvm_types::{Address, Hash};

use crate::errors::EnvelopeError;

/// A cursor over a TLV body, consumed field by field in canonical order.
pub struct Reader<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Wrap a body for sequential reading.
    #[must_use]
    pub fn new(body: &'a [u8]) -> Self {
        Self { body, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], EnvelopeError> {
        if self.pos + n > self.body.len() {
            return Err(EnvelopeError::TruncatedField(field));
        }
        let slice = &self.body[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a 20-byte address.
    pub fn address(&mut self, field: &'static str) -> Result<Address, EnvelopeError> {
        let bytes = self.take(20, field)?;
        Ok(Address::from_slice(bytes).expect("take(20) guarantees length"))
    }

    /// Read a 32-byte hash.
    pub fn hash(&mut self, field: &'static str) -> Result<Hash, EnvelopeError> {
        let bytes = self.take(32, field)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(bytes);
        Ok(Hash::new(raw))
    }

    /// Read a little-endian `u64`.
    pub fn u64(&mut self, field: &'static str) -> Result<u64, EnvelopeError> {
        let bytes = self.take(8, field)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a little-endian `i32`.
    pub fn i32(&mut self, field: &'static str) -> Result<i32, EnvelopeError> {
        let bytes = self.take(4, field)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(i32::from_le_bytes(raw))
    }

    /// Read a single boolean byte (`0x00`/`0x01`).
    pub fn bool(&mut self, field: &'static str) -> Result<bool, EnvelopeError> {
        let bytes = self.take(1, field)?;
        Ok(bytes[0] != 0)
    }

    /// Read a 4-byte LE length prefix followed by that many bytes.
    pub fn bytes(&mut self, field: &'static str) -> Result<Vec<u8>, EnvelopeError> {
        let len_bytes = self.take(4, field)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(len_bytes);
        let len = u32::from_le_bytes(raw) as usize;
        if self.pos + len > self.body.len() {
            return Err(EnvelopeError::FieldLengthOverrun(field));
        }
        let slice = &self.body[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice.to_vec())
    }

    /// Whether every byte of the body has been consumed. A well-formed
    /// envelope leaves no trailing bytes.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.body.len()
    }
}

/// Accumulates a TLV body in canonical field order.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Start an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a 20-byte address.
    pub fn address(&mut self, value: Address) -> &mut Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Append a 32-byte hash.
    pub fn hash(&mut self, value: Hash) -> &mut Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Append a little-endian `u64`.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a little-endian `i32`.
    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a boolean byte.
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    /// Append a 4-byte LE length prefix followed by the bytes themselves.
    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    /// Consume the writer, returning the finished body.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_field_kind() {
        let address = Address::new([1; 20]);
        let hash = Hash::new([2; 32]);
        let mut writer = Writer::new();
        writer
            .address(address)
            .hash(hash)
            .u64(42)
            .i32(-7)
            .bool(true)
            .bytes(b"hello");
        let body = writer.finish();

        let mut reader = Reader::new(&body);
        assert_eq!(reader.address("a").unwrap(), address);
        assert_eq!(reader.hash("h").unwrap(), hash);
        assert_eq!(reader.u64("n").unwrap(), 42);
        assert_eq!(reader.i32("v").unwrap(), -7);
        assert!(reader.bool("b").unwrap());
        assert_eq!(reader.bytes("s").unwrap(), b"hello");
        assert!(reader.is_exhausted());
    }

    #[test]
    fn truncated_field_is_an_error() {
        let mut reader = Reader::new(&[0u8; 10]);
        assert!(reader.hash("h").is_err());
    }

    #[test]
    fn length_prefix_overrun_is_an_error() {
        let mut body = 100u32.to_le_bytes().to_vec();
        body.extend_from_slice(b"short");
        let mut reader = Reader::new(&body);
        assert!(matches!(
            reader.bytes("x"),
            Err(EnvelopeError::FieldLengthOverrun("x"))
        ));
    }
}
