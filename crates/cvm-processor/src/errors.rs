//! Block-processor error type.

use thiserror::Error;

/// Errors the block processor can surface.
///
/// Only [`ProcessorError::Store`] and [`ProcessorError::Internal`] are fatal
/// in the §7 sense ("Store-error... propagated as fatal to the node; the
/// block is not committed"). Every other variant is recorded in a per-
/// transaction receipt and logged at `warn!`, never aborting the enclosing
/// block (§7 "Payload-malformed" / "Semantic-skip").
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The backing store rejected a read or write mid-block. Fatal: the
    /// caller must not commit a partially-applied block.
    #[error("store error: {0}")]
    Store(#[from] cvm_store::errors::StoreError),

    /// A reputation-layer invariant (almost always the dispute conservation
    /// check) was violated. This indicates a programming error rather than
    /// bad input, so like a store error it aborts the block rather than
    /// being logged and skipped.
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// A transaction's declared `R_claim` exceeded this node's local HAT v2
    /// computation for the sender at the including block height (§4.7,
    /// §7 "Consensus-violation"). Rejects the whole block being connected;
    /// the caller (chain sync) should not commit it.
    #[error("claim gate rejected tx {tx_hash}: claimed {claimed} > local {local}")]
    ClaimGateRejected {
        /// The offending transaction's hash.
        tx_hash: cvm_types::Hash,
        /// The sender-declared reputation.
        claimed: i32,
        /// This node's own computed reputation for the sender.
        local: i32,
    },
}
