//! Node configuration: grouped by concern, each group independently
//! defaultable, mirroring how `node-runtime::container::config::NodeConfig`
//! is assembled from per-subsystem groups.

use std::path::PathBuf;

use cvm_processor::prelude::ProcessorConfig;
use cvm_types::Address;

/// Complete node configuration.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Fork-activation tuning.
    pub activation: ActivationConfig,
    /// Gas metering and free-gas subsidy tuning.
    pub gas: GasConfig,
    /// Reputation and dispute-resolution tuning.
    pub reputation: ReputationConfig,
    /// Consensus-safety tuning (claim gate).
    pub consensus_safety: ConsensusSafetyConfig,
    /// Persistent store tuning.
    pub store: StoreConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            activation: ActivationConfig::default(),
            gas: GasConfig::default(),
            reputation: ReputationConfig::default(),
            consensus_safety: ConsensusSafetyConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Flatten into the processor's own config view.
    #[must_use]
    pub fn to_processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            activation_height: self.activation.height,
            max_code_size: self.gas.max_code_size,
            free_gas_threshold: self.gas.free_gas_threshold,
            free_gas_base_capacity: self.gas.free_gas_base_capacity,
            free_gas_slope: self.gas.free_gas_slope,
            subsidy_per_tx_max: self.gas.subsidy_per_tx_max,
            subsidy_per_block_max: self.gas.subsidy_per_block_max,
            subsidy_minimum_reputation: self.gas.subsidy_minimum_reputation,
            dispute_quorum_jurors: self.reputation.dispute_quorum_jurors,
            dispute_quorum_stake: self.reputation.dispute_quorum_stake,
            bond_lock_blocks: self.reputation.bond_lock_blocks,
            node_identity: self.consensus_safety.node_identity,
        }
    }
}

/// Fork-activation tuning (§6.4 "activation-height").
#[derive(Clone, Copy, Debug)]
pub struct ActivationConfig {
    /// First block height at which the core's handlers run at all.
    pub height: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self { height: 0 }
    }
}

/// Gas metering and free-gas subsidy tuning (§6.4, §4.8).
#[derive(Clone, Copy, Debug)]
pub struct GasConfig {
    /// Hard cap on deployable bytecode size, in bytes.
    pub max_code_size: usize,
    /// Claimed reputation at which free-gas eligibility begins.
    pub free_gas_threshold: i32,
    /// Base free-gas daily capacity at the threshold.
    pub free_gas_base_capacity: u64,
    /// Slope of free-gas daily capacity growth above the threshold.
    pub free_gas_slope: u64,
    /// Absolute per-transaction subsidy cap.
    pub subsidy_per_tx_max: u64,
    /// Aggregate per-block subsidy cap.
    pub subsidy_per_block_max: u64,
    /// Minimum claimed reputation to draw from a subsidy pool.
    pub subsidy_minimum_reputation: i32,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_code_size: cvm_vm::interpreter::MAX_CODE_SIZE,
            free_gas_threshold: cvm_consensus::discount::DEFAULT_FREE_GAS_THRESHOLD,
            free_gas_base_capacity: 100_000,
            free_gas_slope: 10_000,
            subsidy_per_tx_max: 50_000,
            subsidy_per_block_max: 500_000,
            subsidy_minimum_reputation: 50,
        }
    }
}

/// Reputation and dispute-resolution tuning (§6.4 "dispute-quorum",
/// "bond-lock-blocks").
#[derive(Clone, Copy, Debug)]
pub struct ReputationConfig {
    /// Minimum distinct jurors for dispute auto-resolve.
    pub dispute_quorum_jurors: usize,
    /// Minimum aggregate juror stake for dispute auto-resolve.
    pub dispute_quorum_stake: u128,
    /// Default lock duration, in blocks, for trust/vote bonds.
    pub bond_lock_blocks: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            dispute_quorum_jurors: 5,
            dispute_quorum_stake: 1_000,
            bond_lock_blocks: 4_032,
        }
    }
}

/// Consensus-safety tuning (§4.7 claim gate).
#[derive(Clone, Copy, Debug)]
pub struct ConsensusSafetyConfig {
    /// This node's own address, used as the web-of-trust viewer when
    /// computing `R_local` for the claim gate.
    pub node_identity: Address,
}

impl Default for ConsensusSafetyConfig {
    fn default() -> Self {
        Self {
            node_identity: Address::ZERO,
        }
    }
}

/// Persistent store tuning, passed straight through to
/// `cvm_store::rocksdb_backend::RocksDbConfig`.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory the database lives in.
    pub data_dir: PathBuf,
    /// Block cache size in bytes.
    pub block_cache_size: usize,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Number of write buffers held in memory before flush.
    pub max_write_buffer_number: i32,
    /// fsync after every write.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/cvm"),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    /// Translate into the backend's own config type.
    #[must_use]
    pub fn to_rocksdb_config(&self) -> cvm_store::rocksdb_backend::RocksDbConfig {
        cvm_store::rocksdb_backend::RocksDbConfig {
            path: self.data_dir.to_string_lossy().into_owned(),
            block_cache_size: self.block_cache_size,
            write_buffer_size: self.write_buffer_size,
            max_write_buffer_number: self.max_write_buffer_number,
            sync_writes: self.sync_writes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_processor_defaults() {
        let config = CoreConfig::default();
        let processor = config.to_processor_config();
        assert_eq!(processor.max_code_size, cvm_vm::interpreter::MAX_CODE_SIZE);
        assert_eq!(processor.dispute_quorum_jurors, 5);
        assert_eq!(processor.activation_height, 0);
    }
}
