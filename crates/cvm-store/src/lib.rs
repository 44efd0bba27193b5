//! # cvm-store — persistent state for the smart-contract core
//!
//! A typed record layer over a raw key-value backend. Fixed-prefix keys
//! (`C`/`S`/`N`/`B`/`L`/`R`/`X`/`Q`/`K`) cover contracts, storage, nonces,
//! balances and receipts; free-form `name_<hex>` extension keys cover the
//! reputation/trust-graph/dispute records that don't fit a fixed layout.
//! [`store::Store`] implements `cvm_vm::ports::StateAccess` directly, so the
//! interpreter can run against it with no adapter in between.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Backend | `backend.rs` | Raw byte-string key-value port |
//! | In-memory backend | `memory.rs` | `BTreeMap`-backed, for tests |
//! | RocksDB backend | `rocksdb_backend.rs` | Production backend |
//! | Keys | `keys.rs` | §6.2 key layout |
//! | Records | `records.rs` | §3 typed record families, bincode-encoded |
//! | Store | `store.rs` | Typed API + `StateAccess` impl + caches |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod backend;
pub mod errors;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocksdb_backend;
pub mod records;
pub mod store;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::backend::{BatchOp, KeyValueBackend};
    pub use crate::errors::StoreError;
    pub use crate::memory::InMemoryBackend;
    #[cfg(feature = "rocksdb-backend")]
    pub use crate::rocksdb_backend::{RocksDbBackend, RocksDbConfig};
    pub use crate::records::{
        BehaviorMetrics, BlacklistEntry, BondedVote, ContractRecord, Dispute, DisputeStatus,
        PendingReward, Receipt, ReputationRecord, RewardKind, StakeInfo, TemporalMetrics,
        TrustEdge, VoteOrigin,
    };
    pub use crate::store::Store;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_exports_compile() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let _ = store.backend();
    }
}
