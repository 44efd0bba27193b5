//! Free-gas buckets and subsidy pools (§4.8). Both are persisted as
//! extension records under the store's generic key surface, since neither
//! fits the fixed-prefix key families in §6.2.

use cvm_store::backend::KeyValueBackend;
use cvm_store::records::{decode, encode};
use cvm_store::store::Store;
use cvm_types::Address;
use serde::{Deserialize, Serialize};

use crate::errors::ConsensusError;

/// Blocks per day at the Cascoin-lineage 150-second target spacing, used to
/// reset free-gas buckets on a daily cadence (§4.8 "reset every block-count
/// corresponding to a day").
pub const BLOCKS_PER_DAY: u64 = 576;

fn free_gas_key(address: Address) -> String {
    format!("free_gas_{}", address.to_hex())
}

fn subsidy_pool_key(pool_id: &str) -> String {
    format!("subsidy_pool_{pool_id}")
}

/// A per-address rolling free-gas allowance.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FreeGasBucket {
    /// Gas remaining in the current day's allowance.
    pub remaining: u64,
    /// Block height the bucket was last replenished at.
    pub last_reset_block: u64,
}

/// A named subsidy pool's balance.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SubsidyPool {
    /// Remaining balance, smallest on-chain unit.
    pub balance: u64,
}

fn load_bucket<B: KeyValueBackend>(
    store: &Store<B>,
    address: Address,
) -> Result<FreeGasBucket, ConsensusError> {
    match store
        .get_extension(&free_gas_key(address))
        .map_err(|e| ConsensusError::SubsidyCapExceeded {
            requested: 0,
            available: 0,
        })
        .and_then(|bytes| {
            bytes
                .map(|b| decode(&b).map_err(|_| ConsensusError::FreeGasExhausted))
                .transpose()
        }) {
        Ok(Some(bucket)) => Ok(bucket),
        Ok(None) => Ok(FreeGasBucket::default()),
        Err(e) => Err(e),
    }
}

fn save_bucket<B: KeyValueBackend>(
    store: &Store<B>,
    address: Address,
    bucket: &FreeGasBucket,
) -> Result<(), ConsensusError> {
    let bytes = encode(bucket).map_err(|_| ConsensusError::FreeGasExhausted)?;
    store
        .put_extension(&free_gas_key(address), &bytes)
        .map_err(|_| ConsensusError::FreeGasExhausted)
}

/// Draw `gas_used` from `address`'s free-gas bucket, replenishing it first
/// if a day (`BLOCKS_PER_DAY` blocks) has elapsed since the last reset.
/// Returns the amount actually drawn from the bucket; any shortfall is the
/// caller's responsibility to bill as paid gas (§4.8 "exhausted ⇒ fall back
/// to paid gas or reject per policy").
pub fn draw_free_gas<B: KeyValueBackend>(
    store: &Store<B>,
    address: Address,
    daily_capacity: u64,
    gas_used: u64,
    current_block: u64,
) -> Result<u64, ConsensusError> {
    let mut bucket = load_bucket(store, address)?;
    if current_block.saturating_sub(bucket.last_reset_block) >= BLOCKS_PER_DAY {
        bucket.remaining = daily_capacity;
        bucket.last_reset_block = current_block;
    }
    let drawn = gas_used.min(bucket.remaining);
    bucket.remaining -= drawn;
    save_bucket(store, address, &bucket)?;
    Ok(drawn)
}

fn load_pool<B: KeyValueBackend>(
    store: &Store<B>,
    pool_id: &str,
) -> Result<SubsidyPool, ConsensusError> {
    match store
        .get_extension(&subsidy_pool_key(pool_id))
        .map_err(|_| ConsensusError::InsufficientPoolBalance {
            pool_id: pool_id.to_string(),
            balance: 0,
            requested: 0,
        })? {
        Some(bytes) => decode(&bytes).map_err(|_| ConsensusError::InsufficientPoolBalance {
            pool_id: pool_id.to_string(),
            balance: 0,
            requested: 0,
        }),
        None => Ok(SubsidyPool::default()),
    }
}

/// Credit `pool_id` by `amount` (e.g. from block-reward carve-out funding).
pub fn fund_pool<B: KeyValueBackend>(
    store: &Store<B>,
    pool_id: &str,
    amount: u64,
) -> Result<(), ConsensusError> {
    let mut pool = load_pool(store, pool_id)?;
    pool.balance += amount;
    let bytes = encode(&pool).map_err(|_| ConsensusError::InsufficientPoolBalance {
        pool_id: pool_id.to_string(),
        balance: pool.balance,
        requested: 0,
    })?;
    store
        .put_extension(&subsidy_pool_key(pool_id), &bytes)
        .map_err(|_| ConsensusError::InsufficientPoolBalance {
            pool_id: pool_id.to_string(),
            balance: pool.balance,
            requested: 0,
        })
}

/// Draw `amount` from `pool_id`, subject to sender-reputation and per-tx /
/// per-block subsidy caps (§4.8). `block_spent_so_far` is the caller's
/// running tally of subsidy spent in the current block.
#[allow(clippy::too_many_arguments)]
pub fn draw_subsidy<B: KeyValueBackend>(
    store: &Store<B>,
    pool_id: &str,
    amount: u64,
    sender_reputation: i32,
    minimum_reputation: i32,
    per_tx_cap: u64,
    block_spent_so_far: u64,
    per_block_cap: u64,
) -> Result<(), ConsensusError> {
    if sender_reputation < minimum_reputation {
        return Err(ConsensusError::BelowSubsidyMinimum {
            actual: sender_reputation,
            minimum: minimum_reputation,
        });
    }
    if amount > per_tx_cap {
        return Err(ConsensusError::SubsidyCapExceeded {
            requested: amount,
            available: per_tx_cap,
        });
    }
    if block_spent_so_far + amount > per_block_cap {
        return Err(ConsensusError::SubsidyCapExceeded {
            requested: amount,
            available: per_block_cap.saturating_sub(block_spent_so_far),
        });
    }
    let mut pool = load_pool(store, pool_id)?;
    if pool.balance < amount {
        return Err(ConsensusError::InsufficientPoolBalance {
            pool_id: pool_id.to_string(),
            balance: pool.balance,
            requested: amount,
        });
    }
    pool.balance -= amount;
    let bytes = encode(&pool).map_err(|_| ConsensusError::InsufficientPoolBalance {
        pool_id: pool_id.to_string(),
        balance: pool.balance,
        requested: amount,
    })?;
    store
        .put_extension(&subsidy_pool_key(pool_id), &bytes)
        .map_err(|_| ConsensusError::InsufficientPoolBalance {
            pool_id: pool_id.to_string(),
            balance: pool.balance,
            requested: amount,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_store::memory::InMemoryBackend;

    #[test]
    fn free_gas_bucket_replenishes_daily() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let address = Address::new([1; 20]);
        let drawn = draw_free_gas(&store, address, 1000, 400, 0).unwrap();
        assert_eq!(drawn, 400);
        let drawn = draw_free_gas(&store, address, 1000, 400, 100).unwrap();
        assert_eq!(drawn, 400);
        let drawn = draw_free_gas(&store, address, 1000, 400, 100 + BLOCKS_PER_DAY).unwrap();
        assert_eq!(drawn, 400); // replenished
    }

    #[test]
    fn free_gas_bucket_exhausts_within_the_day() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let address = Address::new([2; 20]);
        draw_free_gas(&store, address, 100, 100, 0).unwrap();
        let drawn = draw_free_gas(&store, address, 100, 100, 1).unwrap();
        assert_eq!(drawn, 0);
    }

    #[test]
    fn subsidy_draw_respects_pool_balance() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        fund_pool(&store, "faucet", 1000).unwrap();
        draw_subsidy(&store, "faucet", 600, 90, 80, 1_000_000, 0, 1_000_000).unwrap();
        let err = draw_subsidy(&store, "faucet", 600, 90, 80, 1_000_000, 600, 1_000_000).unwrap_err();
        assert!(matches!(err, ConsensusError::InsufficientPoolBalance { .. }));
    }

    #[test]
    fn subsidy_draw_respects_reputation_minimum() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        fund_pool(&store, "faucet", 1000).unwrap();
        let err = draw_subsidy(&store, "faucet", 100, 50, 80, 1_000_000, 0, 1_000_000).unwrap_err();
        assert!(matches!(err, ConsensusError::BelowSubsidyMinimum { .. }));
    }

    #[test]
    fn subsidy_draw_respects_block_cap() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        fund_pool(&store, "faucet", 10_000).unwrap();
        let err = draw_subsidy(&store, "faucet", 500, 90, 80, 1_000_000, 600, 1000).unwrap_err();
        assert!(matches!(err, ConsensusError::SubsidyCapExceeded { .. }));
    }
}
