//! Store-layer error type.

use thiserror::Error;

/// Errors surfaced by the key-value backend or the typed record layer above
/// it. Per the error-handling design, a `StoreError` is fatal to the node —
/// there is no retry inside the core (§7 "Store-error").
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database rejected a read, write, or iteration.
    #[error("backend I/O error: {0}")]
    Backend(String),

    /// A stored value failed to decode as the record type the caller asked
    /// for; this indicates on-disk corruption or a version mismatch, never a
    /// normal "missing key" condition.
    #[error("record decode error: {0}")]
    Decode(String),

    /// A value failed to encode before being written.
    #[error("record encode error: {0}")]
    Encode(String),
}
