//! Block-level input/output types the dispatch loop in [`crate::block`]
//! consumes and produces.

use cvm_envelope::bond::TxOutput;
use cvm_store::records::{BondedVote, Dispute, Receipt, ReputationRecord, TrustEdge};
use cvm_types::{Address, Bytes, Hash, StorageKey, StorageValue};

/// Block-level constants, reused directly as the interpreter's
/// [`cvm_vm::ports::BlockOracle`].
pub type BlockHeader = cvm_vm::ports::BlockOracle;

/// A block processor's view of one transaction: whatever the chain layer has
/// already resolved (sender identity, the outputs the envelope scanner and
/// bond checker need, and — for DEPLOY only — the witness-resolved bytecode)
/// before handing it to [`crate::block::connect_block`].
#[derive(Clone, Debug)]
pub struct BlockTransaction {
    /// This transaction's hash.
    pub tx_hash: Hash,
    /// The address whose signature authorized this transaction.
    pub sender: Address,
    /// Outputs, in index order: index 0 conventionally carries the payload
    /// envelope, index 1 the bond for bond-bearing payload kinds.
    pub outputs: Vec<TxOutput>,
    /// The sender-declared reputation claim, if this transaction relies on a
    /// reputation-gated benefit (gas discount, free gas, subsidy). `None`
    /// means no claim attached: full-price gas, no eligibility.
    pub claimed_reputation: Option<i32>,
    /// Resolved bytecode for a DEPLOY transaction, already pulled from the
    /// transaction's witness data by the chain layer (a DEPLOY envelope
    /// carries only the code's hash). Irrelevant to every other payload
    /// kind.
    pub witness_code: Option<Bytes>,
}

/// One atomic undo step, captured by a handler before it mutates the store,
/// so [`crate::block::disconnect_block`] can restore the exact prior value.
#[derive(Clone, Debug)]
pub enum UndoOp {
    /// Restore `address`'s nonce.
    SetNonce { address: Address, value: u64 },
    /// Remove a contract record created by a DEPLOY being undone.
    DeleteContract { address: Address },
    /// Restore a single storage slot.
    PutStorage {
        address: Address,
        key: StorageKey,
        value: StorageValue,
    },
    /// Restore a reputation record.
    PutReputation {
        address: Address,
        value: ReputationRecord,
    },
    /// Restore (or remove, if `value` is `None`) a trust edge.
    RestoreTrustEdge {
        from: Address,
        to: Address,
        value: Option<TrustEdge>,
    },
    /// Restore (or remove, if `value` is `None`) a bonded vote.
    RestoreBondedVote {
        voter: Address,
        target: Address,
        value: Option<BondedVote>,
    },
    /// Restore (or remove, if `value` is `None`) a dispute record.
    RestoreDispute {
        dispute_id: Hash,
        value: Option<Dispute>,
    },
    /// Remove a pending reward created by a dispute resolution being undone.
    DeletePendingReward { reward_id: Hash },
    /// Remove a vote-origin mapping created by a TRUST-EDGE or BONDED-VOTE
    /// being undone.
    DeleteVoteOrigin { tx_hash: Hash },
}

/// What a handler did with one transaction.
pub enum HandlerOutcome {
    /// The payload ran and mutated the store; `receipt` is ready to persist
    /// and `undo` reverses exactly what was applied.
    Applied {
        receipt: Receipt,
        undo: Vec<UndoOp>,
    },
    /// The payload was recognized but could not be applied (malformed body,
    /// missing bond, contract not found, and similar). Logged at `warn!` by
    /// the caller; never aborts the block.
    Skipped { reason: String },
}

impl HandlerOutcome {
    /// Convenience constructor for the common skip case.
    pub fn skipped(reason: impl Into<String>) -> Self {
        HandlerOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// The processing outcome for one transaction, as recorded in block order.
#[derive(Clone, Debug)]
pub struct ProcessedTx {
    /// The transaction this outcome belongs to.
    pub tx_hash: Hash,
    /// `true` if a handler ran and applied state changes.
    pub handled: bool,
    /// The receipt persisted for RPC surfacing; empty-ish defaults for a
    /// skipped transaction.
    pub receipt: Receipt,
    /// Undo steps, in the order they were applied. Empty for a skipped
    /// transaction.
    pub undo: Vec<UndoOp>,
}

/// The result of connecting one block: every transaction's outcome, in
/// block order.
#[derive(Clone, Debug, Default)]
pub struct ConnectedBlock {
    /// Per-transaction outcomes, in block order.
    pub transactions: Vec<ProcessedTx>,
}

impl ConnectedBlock {
    /// Total gas billed across every transaction in the block.
    #[must_use]
    pub fn total_gas_used(&self) -> u64 {
        self.transactions.iter().map(|t| t.receipt.gas_used).sum()
    }
}

/// A receipt recording that a transaction was seen but nothing ran (no
/// recognizable envelope, or the handler skipped it outright).
#[must_use]
pub fn empty_receipt(revert_reason: Option<String>) -> Receipt {
    Receipt {
        status: 0,
        gas_used: 0,
        logs: Vec::new(),
        created_contract: None,
        sender_reputation: 0,
        discount_applied_percent: 0,
        free_gas_used: 0,
        revert_reason,
    }
}

/// Clamp a `[-100, 100]`-ish signed claim into the receipt's unsigned field;
/// a missing claim reads as zero.
#[must_use]
pub fn clamp_reputation(claimed: Option<i32>) -> u8 {
    claimed.unwrap_or(0).clamp(0, 100) as u8
}
