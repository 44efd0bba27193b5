//! HAT v2 reputation compositor (§4.5): four weighted sub-scores, each
//! mapped into `[0,1]`, combined into a single consensus-visible integer in
//! `[0,100]`. Component arithmetic uses `f64`; only the final rounded
//! integer is consensus-visible, so none of the intermediate floats need to
//! be bit-exact across platforms.

use cvm_store::records::{BehaviorMetrics, StakeInfo, TemporalMetrics};

/// Behavior weight (objective).
pub const WEIGHT_BEHAVIOR: f64 = 0.40;
/// Web-of-trust weight (personal).
pub const WEIGHT_WOT: f64 = 0.30;
/// Stake weight.
pub const WEIGHT_STAKE: f64 = 0.20;
/// Temporal weight.
pub const WEIGHT_TEMPORAL: f64 = 0.10;

const PARTNER_DIVERSITY_SATURATION: f64 = 20.0;
const VOLUME_SATURATION: f64 = 100_000.0;
const REGULARITY_CV_THRESHOLD: f64 = 0.15;
const REGULARITY_BOT_PENALTY: f64 = 0.5;

const STAKE_SATURATION_CAS: f64 = 10_000.0;
/// Seconds per block, Cascoin-lineage target spacing (2.5 minutes).
const SECONDS_PER_BLOCK: f64 = 150.0;
const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;
const MAX_STAKE_YEARS: f64 = 10.0;

const TWO_YEARS_SECONDS: f64 = 2.0 * SECONDS_PER_YEAR;
const ACTIVITY_HALF_LIFE_SECONDS: f64 = 90.0 * 24.0 * 3600.0;
const SUSPICIOUS_GAP_SECONDS: f64 = 180.0 * 24.0 * 3600.0;
const MONTH_SECONDS: f64 = 30.0 * 24.0 * 3600.0;

/// Behavior sub-score (§4.5 "Behavior (objective)").
///
/// `base_reputation` is the current simple `[0,100]` score, mapped to
/// `[0,1]` and then discounted by three independent `[0,1]` penalty factors
/// derived from `metrics`.
#[must_use]
pub fn behavior_score(base_reputation: i32, metrics: &BehaviorMetrics) -> f64 {
    let base = (f64::from(base_reputation.clamp(0, 100))) / 100.0;

    let diversity = (metrics.distinct_partners as f64 / PARTNER_DIVERSITY_SATURATION).min(1.0);

    let volume = if metrics.total_volume == 0 {
        0.0
    } else {
        (1.0 + metrics.total_volume as f64).ln() / (1.0 + VOLUME_SATURATION).ln()
    }
    .min(1.0);

    let regularity = regularity_factor(&metrics.interarrival_seconds);

    (base * diversity * volume * regularity).clamp(0.0, 1.0)
}

/// Penalizes suspiciously-regular interaction timing — a hallmark of
/// scripted/bot behavior rather than organic use.
fn regularity_factor(gaps: &[u64]) -> f64 {
    if gaps.len() < 2 {
        return 1.0;
    }
    let values: Vec<f64> = gaps.iter().map(|&g| g as f64).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 1.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let coefficient_of_variation = variance.sqrt() / mean;
    if coefficient_of_variation < REGULARITY_CV_THRESHOLD {
        REGULARITY_BOT_PENALTY
    } else {
        1.0
    }
}

/// Stake sub-score (§4.5 "Stake").
#[must_use]
pub fn stake_score(stake: &StakeInfo, current_height: u64) -> f64 {
    if stake.amount == 0 {
        return 0.0;
    }
    let log_factor = (1.0 + stake.amount as f64).ln() / (1.0 + STAKE_SATURATION_CAS).ln();
    let log_factor = log_factor.min(1.0);

    let blocks_staked = current_height.saturating_sub(stake.start_block) as f64;
    let years_staked = ((blocks_staked * SECONDS_PER_BLOCK) / SECONDS_PER_YEAR).min(MAX_STAKE_YEARS);

    (log_factor * years_staked.sqrt()).clamp(0.0, 1.0)
}

/// Temporal sub-score (§4.5 "Temporal").
#[must_use]
pub fn temporal_score(metrics: &TemporalMetrics, now: u64) -> f64 {
    if metrics.created_at == 0 || now <= metrics.created_at {
        return 0.0;
    }
    let age_seconds = (now - metrics.created_at) as f64;
    let age_factor = (age_seconds / TWO_YEARS_SECONDS).min(1.0);

    let total_months = (age_seconds / MONTH_SECONDS).max(1.0);
    let active_months = distinct_active_months(&metrics.activity_timestamps, metrics.created_at);
    let activity_ratio = (active_months as f64 / total_months).min(1.0);

    let days_since_last = (now.saturating_sub(metrics.last_activity)) as f64 / (24.0 * 3600.0);
    let decay = 0.5_f64.powf(days_since_last / (ACTIVITY_HALF_LIFE_SECONDS / (24.0 * 3600.0)));

    let mut score = (age_factor * activity_ratio * decay).clamp(0.0, 1.0);
    if has_suspicious_gap(&metrics.activity_timestamps) {
        score *= 0.5;
    }
    score
}

fn distinct_active_months(timestamps: &[u64], created_at: u64) -> usize {
    timestamps
        .iter()
        .map(|&t| ((t.saturating_sub(created_at)) as f64 / MONTH_SECONDS) as u64)
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

fn has_suspicious_gap(timestamps: &[u64]) -> bool {
    if timestamps.len() < 2 {
        return false;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .any(|pair| (pair[1] - pair[0]) as f64 >= SUSPICIOUS_GAP_SECONDS)
}

/// Combine the four `[0,1]` sub-scores into the final consensus-visible
/// `[0,100]` integer (§4.5 final formula).
#[must_use]
pub fn composite_score(behavior: f64, web_of_trust: f64, stake: f64, temporal: f64) -> i32 {
    let weighted = WEIGHT_BEHAVIOR * behavior.clamp(0.0, 1.0)
        + WEIGHT_WOT * web_of_trust.clamp(0.0, 1.0)
        + WEIGHT_STAKE * stake.clamp(0.0, 1.0)
        + WEIGHT_TEMPORAL * temporal.clamp(0.0, 1.0);
    ((100.0 * weighted).round() as i32).clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_score_is_zero_for_untouched_address() {
        let metrics = BehaviorMetrics::default();
        assert_eq!(behavior_score(50, &metrics), 0.0);
    }

    #[test]
    fn behavior_score_rewards_diversity_and_volume() {
        let metrics = BehaviorMetrics {
            distinct_partners: 20,
            total_volume: 100_000,
            interarrival_seconds: vec![100, 500, 50, 900, 20],
        };
        let score = behavior_score(100, &metrics);
        assert!(score > 0.9, "expected near-saturated score, got {score}");
    }

    #[test]
    fn regularity_penalizes_bot_like_timing() {
        let bot_like = vec![60, 60, 61, 59, 60, 60];
        let organic = vec![10, 500, 30, 2000, 5];
        assert!(regularity_factor(&bot_like) < regularity_factor(&organic));
    }

    #[test]
    fn stake_score_saturates_near_ten_thousand_cas() {
        let stake = StakeInfo {
            amount: 10_000,
            start_block: 0,
            min_lock_duration_blocks: 0,
        };
        let score = stake_score(&stake, 3_000_000);
        assert!(score > 0.5, "expected substantial score, got {score}");
    }

    #[test]
    fn temporal_score_zero_for_fresh_account() {
        let metrics = TemporalMetrics {
            created_at: 1000,
            last_activity: 1000,
            activity_timestamps: vec![],
        };
        assert_eq!(temporal_score(&metrics, 1000), 0.0);
    }

    #[test]
    fn composite_score_matches_manual_weighting() {
        let score = composite_score(1.0, 1.0, 1.0, 1.0);
        assert_eq!(score, 100);
        let score = composite_score(0.0, 0.0, 0.0, 0.0);
        assert_eq!(score, 0);
    }
}
