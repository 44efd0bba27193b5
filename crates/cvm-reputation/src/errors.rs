//! Reputation-layer error type.

use thiserror::Error;

/// Errors from HAT v2 composition, trust-graph mutation, or dispute
/// resolution. None of these are faults in the interpreter sense; they are
/// surfaced to the block processor as semantic-skip reasons (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReputationError {
    /// The underlying store rejected a read or write.
    #[error("store error: {0}")]
    Store(String),

    /// A trust edge weight or vote fell outside `[-100, 100]`.
    #[error("weight out of range: {0}")]
    WeightOutOfRange(i32),

    /// An attempt to insert a trust edge whose bond does not exceed the
    /// existing edge's bond (§4.6 "higher-bond edge supersedes").
    #[error("insufficient bond to supersede existing edge: {existing} >= {attempted}")]
    InsufficientBondToSupersede { existing: u128, attempted: u128 },

    /// A dispute was opened against a vote that doesn't exist.
    #[error("challenged vote not found")]
    ChallengedVoteNotFound,

    /// A dispute was opened against a vote already under an open dispute.
    #[error("vote already disputed")]
    AlreadyDisputed,

    /// A juror vote was cast against a dispute that is not open.
    #[error("dispute is not open")]
    DisputeNotOpen,

    /// A juror voted twice on the same dispute.
    #[error("juror already voted")]
    DuplicateJurorVote,

    /// Reward distribution failed the conservation invariant (§4.6): the sum
    /// of created pending-reward amounts must equal the bonds entering the
    /// dispute. This should never occur given correct arithmetic and
    /// indicates a programming error, not bad input.
    #[error("conservation invariant violated: distributed {distributed} != expected {expected}")]
    ConservationViolated { distributed: u128, expected: u128 },
}
