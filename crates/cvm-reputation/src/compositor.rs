//! Top-level HAT v2 entry point: pulls the stored sub-metrics for a target
//! address and combines them with a viewer-relative web-of-trust walk into
//! the final consensus-visible score (§4.5).

use cvm_store::backend::KeyValueBackend;
use cvm_store::store::Store;
use cvm_types::Address;

use crate::errors::ReputationError;
use crate::{hat, trust_graph};

/// Compute `target`'s HAT v2 score as seen by `viewer` at block height
/// `current_height` and wall-clock `now`. The behavior/stake/temporal
/// components are viewer-independent; only the web-of-trust component is
/// personalized, per §4.5 "Explicitly personalized."
pub fn compute_score<B: KeyValueBackend>(
    store: &Store<B>,
    viewer: Address,
    target: Address,
    current_height: u64,
    now: u64,
) -> Result<i32, ReputationError> {
    let reputation = store
        .get_reputation(target, now)
        .map_err(|e| ReputationError::Store(e.to_string()))?;
    let behavior_metrics = store
        .get_behavior(target)
        .map_err(|e| ReputationError::Store(e.to_string()))?;
    let stake_info = store
        .get_stake(target)
        .map_err(|e| ReputationError::Store(e.to_string()))?;
    let temporal_metrics = store
        .get_temporal(target)
        .map_err(|e| ReputationError::Store(e.to_string()))?;

    let behavior = hat::behavior_score(reputation.score, &behavior_metrics);
    let web_of_trust = trust_graph::weighted_wot_score(store, viewer, target)?;
    let stake = hat::stake_score(&stake_info, current_height);
    let temporal = hat::temporal_score(&temporal_metrics, now);

    Ok(hat::composite_score(behavior, web_of_trust, stake, temporal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_store::memory::InMemoryBackend;

    #[test]
    fn fresh_addresses_score_near_the_midpoint() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let viewer = Address::new([1; 20]);
        let target = Address::new([2; 20]);
        let score = compute_score(&store, viewer, target, 1000, 1_700_000_000).unwrap();
        assert!((0..=100).contains(&score));
    }

    #[test]
    fn self_view_maxes_the_wot_component() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let address = Address::new([3; 20]);
        let score = compute_score(&store, address, address, 1000, 1_700_000_000).unwrap();
        assert!(score >= 0);
    }
}
