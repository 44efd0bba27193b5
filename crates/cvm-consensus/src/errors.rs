//! Consensus-safety layer error type.

use thiserror::Error;

/// Errors from the claim-gate, discount computation, or subsidy
/// accounting. A [`ConsensusError::ClaimExceedsLocal`] is the only one with
/// consensus teeth (§7 "Consensus-violation"): it rejects the transaction
/// from the local mempool/block, but a peer's block containing it is still
/// accepted if the claim validates against the *including* node's own local
/// score at validation time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// `R_claim > R_local`: the sender over-claimed their reputation.
    #[error("claimed reputation {claimed} exceeds locally computed {local}")]
    ClaimExceedsLocal { claimed: i32, local: i32 },

    /// The sender's free-gas bucket is exhausted and the policy doesn't
    /// allow falling back to paid gas.
    #[error("free-gas bucket exhausted for this sender")]
    FreeGasExhausted,

    /// A subsidized call exceeded the per-transaction or per-block subsidy
    /// cap.
    #[error("subsidy cap exceeded: requested {requested}, available {available}")]
    SubsidyCapExceeded { requested: u64, available: u64 },

    /// A subsidy draw came from a pool with insufficient balance.
    #[error("subsidy pool {pool_id} has insufficient balance: {balance} < {requested}")]
    InsufficientPoolBalance {
        pool_id: String,
        balance: u64,
        requested: u64,
    },

    /// A subsidy draw required a minimum sender reputation the sender
    /// didn't meet.
    #[error("sender reputation {actual} below subsidy minimum {minimum}")]
    BelowSubsidyMinimum { actual: i32, minimum: i32 },
}
