//! Store key format (§6.2, bit-exact): a fixed one-byte tag followed by
//! entity-specific bytes in big-endian, so numeric IDs order lexicographically
//! the same as numerically. A second family of free-form ASCII-prefixed
//! string keys covers the extension records (trust graph, disputes, behavior
//! metrics) that don't fit the fixed-prefix scheme.

use cvm_types::{Address, Hash, StorageKey};

/// Contract record: 20-byte address.
pub const PREFIX_CONTRACT: u8 = b'C';
/// Contract storage slot: 20-byte address ‖ 32-byte key.
pub const PREFIX_STORAGE: u8 = b'S';
/// Address nonce: 20-byte address.
pub const PREFIX_NONCE: u8 = b'N';
/// Address balance: 20-byte address.
pub const PREFIX_BALANCE: u8 = b'B';
/// Deployed-contract list entry: 20-byte address.
pub const PREFIX_CONTRACT_LIST: u8 = b'L';
/// Receipt record: 32-byte tx hash.
pub const PREFIX_RECEIPT: u8 = b'R';
/// Block height → receipt-hash list.
pub const PREFIX_BLOCK_RECEIPTS: u8 = b'X';
/// Access-audit scan entry.
pub const PREFIX_ACCESS_AUDIT: u8 = b'Q';
/// Blacklist entry: 20-byte address.
pub const PREFIX_BLACKLIST: u8 = b'K';

/// `C<address>`
#[must_use]
pub fn contract_key(address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_CONTRACT);
    key.extend_from_slice(address.as_bytes());
    key
}

/// `S<address><key>`
#[must_use]
pub fn storage_key(address: Address, key: StorageKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(53);
    out.push(PREFIX_STORAGE);
    out.extend_from_slice(address.as_bytes());
    out.extend_from_slice(&key.0);
    out
}

/// `N<address>`
#[must_use]
pub fn nonce_key(address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_NONCE);
    key.extend_from_slice(address.as_bytes());
    key
}

/// `B<address>`
#[must_use]
pub fn balance_key(address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_BALANCE);
    key.extend_from_slice(address.as_bytes());
    key
}

/// `L<address>`
#[must_use]
pub fn contract_list_key(address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_CONTRACT_LIST);
    key.extend_from_slice(address.as_bytes());
    key
}

/// `R<tx-hash>`
#[must_use]
pub fn receipt_key(tx_hash: Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(PREFIX_RECEIPT);
    key.extend_from_slice(tx_hash.as_bytes());
    key
}

/// `X<height-be-u64>`
#[must_use]
pub fn block_receipts_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(PREFIX_BLOCK_RECEIPTS);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// `Q<height-be-u64><index-be-u32>`
#[must_use]
pub fn access_audit_key(height: u64, index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(13);
    key.push(PREFIX_ACCESS_AUDIT);
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// `K<address>`
#[must_use]
pub fn blacklist_key(address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(PREFIX_BLACKLIST);
    key.extend_from_slice(address.as_bytes());
    key
}

/// `reputation_<hex-address>` — generic extension key for the simple
/// vote-driven reputation record.
#[must_use]
pub fn reputation_key(address: Address) -> String {
    format!("reputation_{}", address.to_hex())
}

/// `behavior_<hex-address>` — generic extension key for HAT v2 behavior metrics.
#[must_use]
pub fn behavior_key(address: Address) -> String {
    format!("behavior_{}", address.to_hex())
}

/// `stake_<hex-address>` — generic extension key for HAT v2 stake metrics.
#[must_use]
pub fn stake_key(address: Address) -> String {
    format!("stake_{}", address.to_hex())
}

/// `temporal_<hex-address>` — generic extension key for HAT v2 temporal metrics.
#[must_use]
pub fn temporal_key(address: Address) -> String {
    format!("temporal_{}", address.to_hex())
}

/// `trust_<hex-from>_<hex-to>` — generic extension key for a trust-graph edge.
#[must_use]
pub fn trust_edge_key(from: Address, to: Address) -> String {
    format!("trust_{}_{}", from.to_hex(), to.to_hex())
}

/// `dispute_<hex-dispute-id>` — generic extension key for a dispute record.
#[must_use]
pub fn dispute_key(dispute_id: Hash) -> String {
    format!("dispute_{}", dispute_id)
}

/// `bonded_vote_<hex-voter>_<hex-target>` — generic extension key for a
/// bonded vote awaiting HAT v2 composition.
#[must_use]
pub fn bonded_vote_key(voter: Address, target: Address) -> String {
    format!("bonded_vote_{}_{}", voter.to_hex(), target.to_hex())
}

/// `pending_reward_<hex-id>` — generic extension key for a pending reward
/// entry, content-addressed by the caller.
#[must_use]
pub fn pending_reward_key(reward_id: Hash) -> String {
    format!("pending_reward_{}", reward_id)
}

/// `vote_origin_<hex-tx-hash>` — generic extension key mapping the
/// transaction that created a TRUST-EDGE or BONDED-VOTE back to the (from,
/// to) pair it wrote, so a later DISPUTE referencing that transaction's hash
/// can locate the record it challenges.
#[must_use]
pub fn vote_origin_key(tx_hash: Hash) -> String {
    format!("vote_origin_{}", tx_hash)
}
