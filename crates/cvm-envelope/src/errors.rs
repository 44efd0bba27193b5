//! Envelope parsing error type.

use thiserror::Error;

/// Errors surfaced while parsing an on-chain payload envelope.
///
/// Per the error-handling design's "Payload-malformed" kind, every variant
/// here is a *soft* error: a recognized magic and type tag with an
/// undecodable body is logged and the transaction's payload is skipped, never
/// block-invalidating. Callers should not propagate this type as a reason to
/// reject a block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Fewer bytes than the fixed 5-byte header (magic + version + type).
    #[error("envelope shorter than the 5-byte header")]
    Truncated,

    /// First three bytes are not ASCII "CVM" or "REP".
    #[error("unrecognized magic: {0:?}")]
    UnknownMagic([u8; 3]),

    /// Version byte is not `0x01`.
    #[error("unsupported envelope version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    /// Type tag is not one of the seven defined payload kinds.
    #[error("unrecognized payload type: 0x{0:02x}")]
    UnknownType(u8),

    /// A magic/type pair that exists but doesn't belong together (e.g. "REP"
    /// paired with the DEPLOY tag).
    #[error("type 0x{tag:02x} does not belong to magic {magic:?}")]
    MagicTypeMismatch { magic: [u8; 3], tag: u8 },

    /// The TLV body ran out of bytes mid-field.
    #[error("truncated field while decoding body: {0}")]
    TruncatedField(&'static str),

    /// A length-tagged field declared a length that doesn't fit the
    /// remaining body.
    #[error("field {0} length exceeds remaining body")]
    FieldLengthOverrun(&'static str),

    /// A field decoded to bytes of the wrong fixed width (e.g. a 19-byte
    /// address).
    #[error("field {field} has wrong width: expected {expected}, got {actual}")]
    WrongWidth {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A numeric field fell outside its declared domain (e.g. a vote outside
    /// `[-100, 100]`).
    #[error("field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}
