//! Block-processor configuration (§6.4). `cvm-node` assembles the full
//! `CoreConfig` and hands this flattened, processor-scoped view to
//! [`crate::context::CoreContext`] at start-up; the processor itself never
//! reads configuration from anywhere but this struct.

/// Tunables the block processor needs while dispatching handlers.
#[derive(Clone, Copy, Debug)]
pub struct ProcessorConfig {
    /// First block height at which the core's handlers run at all. Blocks
    /// below this height are passed through untouched by whatever wraps
    /// `connect_block` (§6.4 "activation-height").
    pub activation_height: u64,
    /// Hard cap on deployable bytecode size, in bytes (§6.4 "max-code-size").
    pub max_code_size: usize,
    /// Claimed reputation at which free-gas eligibility begins (§6.4
    /// "free-gas-threshold").
    pub free_gas_threshold: i32,
    /// Base free-gas daily capacity at the threshold, plus a linear slope
    /// per reputation point above it (§4.8).
    pub free_gas_base_capacity: u64,
    /// Slope of free-gas daily capacity growth per reputation point above
    /// `free_gas_threshold`.
    pub free_gas_slope: u64,
    /// Absolute per-transaction subsidy cap (§6.4 "subsidy-per-tx-max").
    pub subsidy_per_tx_max: u64,
    /// Aggregate per-block subsidy cap (§6.4 "subsidy-per-block-max").
    pub subsidy_per_block_max: u64,
    /// Minimum claimed reputation to draw from a subsidy pool.
    pub subsidy_minimum_reputation: i32,
    /// Minimum distinct jurors for dispute auto-resolve (§6.4
    /// "dispute-quorum").
    pub dispute_quorum_jurors: usize,
    /// Minimum aggregate juror stake for dispute auto-resolve, as an
    /// alternative path to `dispute_quorum_jurors`.
    pub dispute_quorum_stake: u128,
    /// Default lock duration, in blocks, for trust/vote bonds (§6.4
    /// "bond-lock-blocks"). Advisory only to the core: the timelock branch
    /// itself lives in the P2SH redeem script, outside this crate.
    pub bond_lock_blocks: u64,
    /// This node's own address, used as the web-of-trust viewer when
    /// computing `R_local` for the claim gate (§4.7). The web-of-trust
    /// component is explicitly personalized (§4.5), so claim-gate
    /// validation needs a concrete viewer identity; the node's own address
    /// is the only one available without a designated network-wide viewer
    /// (see `DESIGN.md`'s Open Question decisions).
    pub node_identity: cvm_types::Address,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            activation_height: 0,
            max_code_size: cvm_vm::interpreter::MAX_CODE_SIZE,
            free_gas_threshold: cvm_consensus::discount::DEFAULT_FREE_GAS_THRESHOLD,
            free_gas_base_capacity: 100_000,
            free_gas_slope: 10_000,
            subsidy_per_tx_max: 50_000,
            subsidy_per_block_max: 500_000,
            subsidy_minimum_reputation: 50,
            dispute_quorum_jurors: 5,
            dispute_quorum_stake: 1_000,
            bond_lock_blocks: 4_032, // ~1 week at the 150s block target
            node_identity: cvm_types::Address::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.free_gas_threshold, 80);
        assert_eq!(config.dispute_quorum_jurors, 5);
        assert_eq!(config.max_code_size, 24 * 1024);
    }
}
