//! The typed store: every operation a caller needs (block processor,
//! interpreter host, reputation compositor, RPC) expressed as a concrete
//! method, never a raw byte-string `get`/`put` outside this module (§9
//! "Generic key-value soup" — the free-form `iterate_prefix` path is kept to
//! one place, the audit scan in `iter_extension_prefix`, not the hot path).

use std::collections::HashMap;

use cvm_types::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use cvm_vm::ports::StateAccess;
use parking_lot::Mutex;

use crate::backend::{BatchOp, KeyValueBackend};
use crate::errors::StoreError;
use crate::keys;
use crate::records::{
    self, BehaviorMetrics, BlacklistEntry, BondedVote, ContractRecord, Dispute, PendingReward,
    ReputationRecord, StakeInfo, TemporalMetrics, TrustEdge, VoteOrigin,
};

/// Caches (§4.4): a small address→nonce map and a (contract, key)→value map.
/// Transparent — a miss falls through to the backend, a hit never returns
/// stale data, because every write path invalidates through `Store`'s own
/// methods rather than touching the backend directly.
#[derive(Default)]
struct Caches {
    nonce: HashMap<Address, u64>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
}

/// The persistent store, generic over its backend.
pub struct Store<B: KeyValueBackend> {
    backend: B,
    caches: Mutex<Caches>,
}

impl<B: KeyValueBackend> Store<B> {
    /// Wrap a backend with the typed record API.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            caches: Mutex::new(Caches::default()),
        }
    }

    /// Direct access to the backend, for callers that genuinely need a raw
    /// batch or prefix scan (block disconnect's inverse batch, and audit
    /// scans).
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // -- Contracts --------------------------------------------------------

    /// Fetch a deployed contract's record.
    pub fn get_contract(&self, address: Address) -> Result<Option<ContractRecord>, StoreError> {
        match self.backend.get(&keys::contract_key(address))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Register a newly deployed contract.
    pub fn put_contract(&self, address: Address, record: &ContractRecord) -> Result<(), StoreError> {
        let bytes = records::encode(record)?;
        self.backend.put(&keys::contract_key(address), &bytes)
    }

    /// Whether a (non-retired) contract exists at `address`.
    pub fn contract_exists(&self, address: Address) -> Result<bool, StoreError> {
        Ok(self
            .get_contract(address)?
            .is_some_and(|record| !record.retired))
    }

    /// Remove a contract record outright. Used only by block disconnect to
    /// undo a DEPLOY; the core never retires-and-forgets a live contract this
    /// way during normal operation (see `ContractRecord::retired`).
    pub fn delete_contract(&self, address: Address) -> Result<(), StoreError> {
        self.backend.delete(&keys::contract_key(address))
    }

    // -- Contract storage ---------------------------------------------------

    /// Read a contract storage slot; missing slots read as zero (§3).
    pub fn get_storage(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, StoreError> {
        if let Some(value) = self.caches.lock().storage.get(&(address, key)) {
            return Ok(*value);
        }
        let value = match self.backend.get(&keys::storage_key(address, key))? {
            Some(bytes) if bytes.len() == 32 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(&bytes);
                StorageValue::new(raw)
            }
            Some(_) | None => StorageValue::ZERO,
        };
        self.caches.lock().storage.insert((address, key), value);
        Ok(value)
    }

    /// Write a contract storage slot.
    pub fn put_storage(
        &self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StoreError> {
        self.backend
            .put(&keys::storage_key(address, key), &value.0)?;
        self.caches.lock().storage.insert((address, key), value);
        Ok(())
    }

    // -- Nonces -------------------------------------------------------------

    /// Current nonce for `address`; zero if never seen.
    pub fn get_nonce(&self, address: Address) -> Result<u64, StoreError> {
        if let Some(nonce) = self.caches.lock().nonce.get(&address) {
            return Ok(*nonce);
        }
        let nonce = match self.backend.get(&keys::nonce_key(address))? {
            Some(bytes) if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                u64::from_be_bytes(raw)
            }
            Some(_) | None => 0,
        };
        self.caches.lock().nonce.insert(address, nonce);
        Ok(nonce)
    }

    /// Overwrite `address`'s nonce.
    pub fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), StoreError> {
        self.backend
            .put(&keys::nonce_key(address), &nonce.to_be_bytes())?;
        self.caches.lock().nonce.insert(address, nonce);
        Ok(())
    }

    /// Increment and return the new nonce (the DEPLOY handler's counter).
    pub fn increment_nonce(&self, address: Address) -> Result<u64, StoreError> {
        let next = self.get_nonce(address)? + 1;
        self.set_nonce(address, next)?;
        Ok(next)
    }

    // -- Balances -------------------------------------------------------------

    /// Current balance for `address`; zero if never seen.
    pub fn get_balance(&self, address: Address) -> Result<U256, StoreError> {
        match self.backend.get(&keys::balance_key(address))? {
            Some(bytes) if bytes.len() == 32 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(&bytes);
                Ok(U256::from_big_endian(&raw))
            }
            Some(_) | None => Ok(U256::zero()),
        }
    }

    /// Overwrite `address`'s balance.
    pub fn set_balance(&self, address: Address, balance: U256) -> Result<(), StoreError> {
        let mut raw = [0u8; 32];
        balance.to_big_endian(&mut raw);
        self.backend.put(&keys::balance_key(address), &raw)
    }

    // -- Reputation -----------------------------------------------------------

    /// Fetch a reputation record, defaulting a never-seen address to the
    /// midpoint score with no history.
    pub fn get_reputation(&self, address: Address, now: u64) -> Result<ReputationRecord, StoreError> {
        match self.get_extension(&keys::reputation_key(address))? {
            Some(bytes) => records::decode(&bytes),
            None => Ok(ReputationRecord::new_default(now)),
        }
    }

    /// Persist a reputation record.
    pub fn put_reputation(&self, address: Address, record: &ReputationRecord) -> Result<(), StoreError> {
        self.put_extension(&keys::reputation_key(address), &records::encode(record)?)
    }

    /// Fetch an address's HAT v2 behavior metrics, defaulting to empty history.
    pub fn get_behavior(&self, address: Address) -> Result<BehaviorMetrics, StoreError> {
        match self.get_extension(&keys::behavior_key(address))? {
            Some(bytes) => records::decode(&bytes),
            None => Ok(BehaviorMetrics::default()),
        }
    }

    /// Persist an address's HAT v2 behavior metrics.
    pub fn put_behavior(&self, address: Address, metrics: &BehaviorMetrics) -> Result<(), StoreError> {
        self.put_extension(&keys::behavior_key(address), &records::encode(metrics)?)
    }

    /// Fetch an address's stake info, defaulting to unstaked.
    pub fn get_stake(&self, address: Address) -> Result<StakeInfo, StoreError> {
        match self.get_extension(&keys::stake_key(address))? {
            Some(bytes) => records::decode(&bytes),
            None => Ok(StakeInfo::default()),
        }
    }

    /// Persist an address's stake info.
    pub fn put_stake(&self, address: Address, stake: &StakeInfo) -> Result<(), StoreError> {
        self.put_extension(&keys::stake_key(address), &records::encode(stake)?)
    }

    /// Fetch an address's temporal metrics, defaulting to never-seen.
    pub fn get_temporal(&self, address: Address) -> Result<TemporalMetrics, StoreError> {
        match self.get_extension(&keys::temporal_key(address))? {
            Some(bytes) => records::decode(&bytes),
            None => Ok(TemporalMetrics::default()),
        }
    }

    /// Persist an address's temporal metrics.
    pub fn put_temporal(&self, address: Address, metrics: &TemporalMetrics) -> Result<(), StoreError> {
        self.put_extension(&keys::temporal_key(address), &records::encode(metrics)?)
    }

    /// Fetch a directed trust edge, if one has ever been recorded.
    pub fn get_trust_edge(&self, from: Address, to: Address) -> Result<Option<TrustEdge>, StoreError> {
        match self.get_extension(&keys::trust_edge_key(from, to))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a directed trust edge.
    pub fn put_trust_edge(&self, edge: &TrustEdge) -> Result<(), StoreError> {
        self.put_extension(
            &keys::trust_edge_key(edge.from, edge.to),
            &records::encode(edge)?,
        )
    }

    /// All trust edges originating at `from` (§9 cycle-robust path enumeration
    /// walks this one hop at a time rather than loading the whole graph).
    pub fn list_trust_edges_from(&self, from: Address) -> Result<Vec<TrustEdge>, StoreError> {
        let prefix = format!("trust_{}_", from.to_hex());
        self.iter_extension_prefix(&prefix)?
            .into_iter()
            .map(|(_, bytes)| records::decode(&bytes))
            .collect()
    }

    /// Every trust edge in the store, for the canonical trust-graph state
    /// hash (§4.7) — unlike [`Store::list_trust_edges_from`] this loads the
    /// whole graph, so it's for sync/audit use, never the hot WoT walk.
    pub fn all_trust_edges(&self) -> Result<Vec<TrustEdge>, StoreError> {
        self.iter_extension_prefix("trust_")?
            .into_iter()
            .map(|(_, bytes)| records::decode(&bytes))
            .collect()
    }

    /// Fetch a bonded reputation vote awaiting HAT v2 composition.
    pub fn get_bonded_vote(&self, voter: Address, target: Address) -> Result<Option<BondedVote>, StoreError> {
        match self.get_extension(&keys::bonded_vote_key(voter, target))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a bonded reputation vote.
    pub fn put_bonded_vote(&self, vote: &BondedVote) -> Result<(), StoreError> {
        self.put_extension(
            &keys::bonded_vote_key(vote.voter, vote.target),
            &records::encode(vote)?,
        )
    }

    /// Fetch a dispute record.
    pub fn get_dispute(&self, dispute_id: Hash) -> Result<Option<Dispute>, StoreError> {
        match self.get_extension(&keys::dispute_key(dispute_id))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a dispute record.
    pub fn put_dispute(&self, dispute_id: Hash, dispute: &Dispute) -> Result<(), StoreError> {
        self.put_extension(&keys::dispute_key(dispute_id), &records::encode(dispute)?)
    }

    /// Fetch a pending reward by its content-addressed id.
    pub fn get_pending_reward(&self, reward_id: Hash) -> Result<Option<PendingReward>, StoreError> {
        match self.get_extension(&keys::pending_reward_key(reward_id))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a pending reward.
    pub fn put_pending_reward(&self, reward: &PendingReward) -> Result<(), StoreError> {
        self.put_extension(
            &keys::pending_reward_key(reward.reward_id),
            &records::encode(reward)?,
        )
    }

    /// Fetch an off-consensus access-gate blacklist entry.
    pub fn get_blacklist_entry(&self, address: Address) -> Result<Option<BlacklistEntry>, StoreError> {
        match self.backend.get(&keys::blacklist_key(address))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist an access-gate blacklist entry.
    pub fn put_blacklist_entry(&self, address: Address, entry: &BlacklistEntry) -> Result<(), StoreError> {
        self.backend
            .put(&keys::blacklist_key(address), &records::encode(entry)?)
    }

    /// Fetch the (from, to) pair a TRUST-EDGE or BONDED-VOTE transaction
    /// wrote, so a DISPUTE naming that transaction's hash can resolve it.
    pub fn get_vote_origin(&self, tx_hash: Hash) -> Result<Option<VoteOrigin>, StoreError> {
        match self.get_extension(&keys::vote_origin_key(tx_hash))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Record which (from, to) pair a TRUST-EDGE or BONDED-VOTE transaction
    /// wrote.
    pub fn put_vote_origin(&self, tx_hash: Hash, origin: &VoteOrigin) -> Result<(), StoreError> {
        self.put_extension(&keys::vote_origin_key(tx_hash), &records::encode(origin)?)
    }

    // -- Generic extension records (trust graph, disputes, HAT v2 metrics) --

    /// Read a free-form extension key.
    pub fn get_extension(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get(key.as_bytes())
    }

    /// Write a free-form extension key.
    pub fn put_extension(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.backend.put(key.as_bytes(), value)
    }

    /// Delete a free-form extension key.
    pub fn delete_extension(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(key.as_bytes())
    }

    /// Audit-scan every extension entry under `prefix` — the one sanctioned
    /// use of raw prefix iteration outside a backend test (§9).
    pub fn iter_extension_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .backend
            .iterate_prefix(prefix.as_bytes())?
            .into_iter()
            .map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v))
            .collect())
    }

    // -- Receipts -------------------------------------------------------------

    /// Persist a transaction receipt.
    pub fn put_receipt(&self, tx_hash: Hash, receipt: &records::Receipt) -> Result<(), StoreError> {
        self.backend
            .put(&keys::receipt_key(tx_hash), &records::encode(receipt)?)
    }

    /// Fetch a transaction receipt.
    pub fn get_receipt(&self, tx_hash: Hash) -> Result<Option<records::Receipt>, StoreError> {
        match self.backend.get(&keys::receipt_key(tx_hash))? {
            Some(bytes) => Ok(Some(records::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Batch --------------------------------------------------------------

    /// Apply a batch of raw puts/deletes atomically — one call per connected
    /// or disconnected block (§4.3 "Ordering discipline").
    pub fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        self.backend.batch(ops)?;
        // Conservative invalidation: a batch crosses many keys at once, so
        // drop both caches rather than tracking exactly which entries it
        // touched.
        let mut caches = self.caches.lock();
        caches.nonce.clear();
        caches.storage.clear();
        Ok(())
    }
}

/// Adapts a [`Store`] to the interpreter's [`StateAccess`] port. Storage
/// writes made by bytecode execution are staged by the interpreter itself
/// (see `cvm_vm::interpreter`'s pending-write set) and only reach this impl
/// once a call has succeeded and the block processor commits them.
impl<B: KeyValueBackend> StateAccess for Store<B> {
    fn get_storage(&self, address: Address, key: StorageKey) -> StorageValue {
        Store::get_storage(self, address, key).unwrap_or(StorageValue::ZERO)
    }

    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let _ = Store::put_storage(self, address, key, value);
    }

    fn get_code(&self, address: Address) -> Bytes {
        Store::get_contract(self, address)
            .ok()
            .flatten()
            .map(|record| record.code)
            .unwrap_or_default()
    }

    fn contract_exists(&self, address: Address) -> bool {
        Store::contract_exists(self, address).unwrap_or(false)
    }

    fn get_balance(&self, address: Address) -> U256 {
        Store::get_balance(self, address).unwrap_or_else(|_| U256::zero())
    }
}
