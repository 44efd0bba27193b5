//! Typed record families persisted under the fixed-prefix and generic
//! extension keys (§3 DATA MODEL). Encoded with `bincode` — canonical,
//! deterministic, and already the teacher's choice for on-disk records.

use cvm_types::{Address, Bytes, Hash};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Encode a record to its canonical on-disk bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Decode a record from its canonical on-disk bytes.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// A deployed contract (§3 "Contract"). Immutable post-deploy except for
/// `retired`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Immutable bytecode, ≤ `cvm_vm::interpreter::MAX_CODE_SIZE`.
    pub code: Bytes,
    /// Block height at which this contract was deployed.
    pub deployed_at_height: u64,
    /// The transaction id that deployed it.
    pub deploy_tx_id: Hash,
    /// The deploying address (used to recompute/verify the derived address).
    pub deployer: Address,
    /// Set by the cleanup policy; code and storage are swept on retirement.
    pub retired: bool,
}

/// An address's reputation record (§3 "Reputation record"). The simple
/// integer score HAT v2's vote-driven component mutates directly; the other
/// three HAT v2 components live in their own record families below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// Integer score, bounded to `[0, 100]`.
    pub score: i32,
    /// Running count of votes applied to this address.
    pub vote_count: u64,
    /// Unix timestamp of the last mutation.
    pub last_updated: u64,
}

impl ReputationRecord {
    /// A freshly-seen address starts at the midpoint with no history.
    #[must_use]
    pub fn new_default(now: u64) -> Self {
        Self {
            score: 50,
            vote_count: 0,
            last_updated: now,
        }
    }
}

/// Behavior sub-metrics feeding HAT v2's behavior component (§4.5).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMetrics {
    /// Count of distinct counterparties interacted with.
    pub distinct_partners: u64,
    /// Total interaction volume (arbitrary units, log-scaled at read time).
    pub total_volume: u64,
    /// Observed inter-arrival gaps between interactions, in seconds.
    pub interarrival_seconds: Vec<u64>,
}

/// Stake info feeding HAT v2's stake component (§4.5).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StakeInfo {
    /// Bonded CAS amount, smallest unit.
    pub amount: u128,
    /// Block height the stake began.
    pub start_block: u64,
    /// Minimum lock duration in blocks.
    pub min_lock_duration_blocks: u64,
}

/// Temporal metrics feeding HAT v2's temporal component (§4.5).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalMetrics {
    /// Unix timestamp the address was first seen.
    pub created_at: u64,
    /// Unix timestamp of the most recent activity.
    pub last_activity: u64,
    /// Sparse vector of per-month activity timestamps, used to detect gaps.
    pub activity_timestamps: Vec<u64>,
}

/// A directed trust edge (§3 "Trust edge").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEdge {
    /// Source address.
    pub from: Address,
    /// Target address.
    pub to: Address,
    /// Integer weight in `[-100, 100]`.
    pub weight: i32,
    /// Bond amount backing this edge.
    pub bond_amount: u128,
    /// The transaction that funded the bond.
    pub bond_tx_id: Hash,
    /// Creation timestamp.
    pub timestamp: u64,
    /// Set once the bond is slashed by dispute resolution.
    pub slashed: bool,
    /// Optional human-readable reason recorded at slash time.
    pub reason: Option<String>,
}

/// A bonded reputation vote (§3 "Bonded vote"): same shape as [`TrustEdge`]
/// but targets an address's reputation rather than the trust graph, and is
/// only realized through HAT v2 composition, never applied immediately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedVote {
    /// Voting address.
    pub voter: Address,
    /// Target address.
    pub target: Address,
    /// Integer weight in `[-100, 100]`.
    pub vote: i32,
    /// Bond amount backing this vote.
    pub bond_amount: u128,
    /// The transaction that funded the bond.
    pub bond_tx_id: Hash,
    /// Creation timestamp.
    pub timestamp: u64,
    /// Set once the bond is slashed by dispute resolution.
    pub slashed: bool,
}

/// Whether a dispute is still accepting juror votes or has been decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    /// Accepting `DISPUTE-VOTE` payloads.
    Open,
    /// Resolved; `slash_decision` and `resolution_time` are meaningful.
    Resolved,
}

/// A dispute over a previously cast vote (§3 "Dispute").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    /// The vote transaction being challenged.
    pub challenged_vote_id: Hash,
    /// The address that opened the dispute.
    pub challenger: Address,
    /// The owner of the challenged trust edge or bonded vote, compensated if
    /// the dispute resolves against slashing.
    pub accused: Address,
    /// The challenger's posted bond.
    pub challenger_bond: u128,
    /// The bond amount backing the challenged trust edge or bonded vote,
    /// captured at dispute-creation time so resolution's conservation check
    /// doesn't need a second lookup of a record that may itself have
    /// changed by resolution time.
    pub disputed_bond_amount: u128,
    /// Creation timestamp.
    pub created_at: u64,
    /// Current status.
    pub status: DisputeStatus,
    /// Set at resolution: `true` if the majority supported slashing.
    pub slash_decision: bool,
    /// Resolution timestamp, if resolved.
    pub resolution_time: Option<u64>,
    /// Juror address → staked amount backing their vote.
    pub juror_stakes: std::collections::BTreeMap<Address, u128>,
    /// Juror address → whether they voted to slash.
    pub juror_support_slash: std::collections::BTreeMap<Address, bool>,
}

impl Dispute {
    /// Distinct jurors who have voted so far.
    #[must_use]
    pub fn juror_count(&self) -> usize {
        self.juror_support_slash.len()
    }

    /// Total stake committed by jurors so far.
    #[must_use]
    pub fn total_juror_stake(&self) -> u128 {
        self.juror_stakes.values().sum()
    }
}

/// The kind of payout a [`PendingReward`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardKind {
    /// The challenger's bond, returned because the challenge failed.
    BondReturn,
    /// A bounty carved out of a slashed bond, paid to the challenger.
    Bounty,
    /// A winning juror's pro-rata share of a slashed bond.
    JurorShare,
    /// Compensation for an address wrongly accused.
    WronglyAccusedCompensation,
}

/// A payout awaiting claim (§3 "Pending reward"). `reward_id` is
/// content-addressed: `hash(dispute_id ‖ recipient ‖ kind)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReward {
    /// Content-addressed id.
    pub reward_id: Hash,
    /// The dispute this reward resolved from.
    pub source_dispute: Hash,
    /// The address entitled to claim it.
    pub recipient: Address,
    /// Amount owed.
    pub amount: u128,
    /// What kind of payout this is.
    pub kind: RewardKind,
    /// Creation timestamp.
    pub created_at: u64,
    /// Whether the recipient has claimed it.
    pub claimed: bool,
    /// The transaction that claimed it, if any.
    pub claim_tx_id: Option<Hash>,
    /// Claim timestamp, if claimed.
    pub claim_time: Option<u64>,
}

impl PendingReward {
    /// Compute the content-addressed id for a (dispute, recipient, kind) triple.
    #[must_use]
    pub fn derive_id(source_dispute: Hash, recipient: Address, kind: RewardKind) -> Hash {
        let mut buf = Vec::with_capacity(32 + 20 + 1);
        buf.extend_from_slice(source_dispute.as_bytes());
        buf.extend_from_slice(recipient.as_bytes());
        buf.push(kind as u8);
        Hash::sha256(&buf)
    }
}

/// Maps a TRUST-EDGE or BONDED-VOTE transaction's hash back to the `(a, b)`
/// address pair it wrote, so a later DISPUTE naming that transaction's hash
/// can look up the record it challenges without an index over every trust
/// edge and bonded vote in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOrigin {
    /// `from` for a trust edge, `voter` for a bonded vote.
    pub a: Address,
    /// `to` for a trust edge, `target` for a bonded vote.
    pub b: Address,
    /// `true` if the origin record is a bonded vote rather than a trust edge.
    pub is_bonded_vote: bool,
}

/// An off-consensus access-gate blacklist entry (§3 "Blacklist entry").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// Human-readable reason.
    pub reason: String,
    /// Expiry timestamp; negative values mean permanent.
    pub expiry_time: i64,
}

/// A transaction receipt (ambient, surfaced over RPC per §7 "User-visible
/// effects").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// `0` for a fault/revert, `1` for success.
    pub status: u8,
    /// Gas consumed.
    pub gas_used: u64,
    /// Log records emitted (address, data) pairs.
    pub logs: Vec<(Address, Bytes)>,
    /// Address of a contract created by this transaction, if any.
    pub created_contract: Option<Address>,
    /// Sender reputation as used for this transaction's gas discount.
    pub sender_reputation: u8,
    /// Discount percentage actually applied.
    pub discount_applied_percent: u8,
    /// Free-gas units drawn from the sender's allowance bucket.
    pub free_gas_used: u64,
    /// UTF-8 revert reason, if the call reverted.
    pub revert_reason: Option<String>,
}
