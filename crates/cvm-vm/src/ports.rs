//! Outbound ports the interpreter needs from its host (the block processor /
//! store layer). Synchronous, unlike `qc-11-smart-contracts`'s `async_trait`
//! ports: §5 is explicit that the interpreter loop has no suspension points,
//! so there is nothing for an executor to yield on here.

use cvm_types::{Address, Bytes, Hash, StorageKey, StorageValue, U256};

/// Read/write access to contract storage and code, as seen by a running
/// interpreter. The store layer (`cvm-store`) provides the implementation;
/// snapshot/revert is handled by the interpreter itself via a pending-write
/// delta (see `crate::interpreter::PendingWrites`), not by this trait.
pub trait StateAccess {
    /// Read a storage slot; missing keys read as [`StorageValue::ZERO`].
    fn get_storage(&self, address: Address, key: StorageKey) -> StorageValue;

    /// Stage a storage write. The caller (interpreter) is responsible for
    /// routing this through its pending-write/snapshot machinery; by the
    /// time this is called the write is considered durable for the
    /// remainder of the current call.
    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue);

    /// Fetch a contract's immutable bytecode; empty if no contract exists.
    fn get_code(&self, address: Address) -> Bytes;

    /// Whether a contract is deployed (and not retired) at `address`.
    fn contract_exists(&self, address: Address) -> bool;

    /// An address's balance, in the smallest on-chain unit.
    fn get_balance(&self, address: Address) -> U256;
}

/// Per-block constants the interpreter's context opcodes read.
#[derive(Clone, Copy, Debug)]
pub struct BlockOracle {
    /// Current block height.
    pub height: u64,
    /// Current block hash.
    pub hash: Hash,
    /// Current block timestamp (unix seconds).
    pub timestamp: u64,
}
