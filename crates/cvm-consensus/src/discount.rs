//! Gas discount tiers and the free-gas daily allowance (§4.7, §4.8): a
//! deterministic function of claimed reputation, re-applied identically by
//! every validator using the transaction-provided claim.

/// Reputation cutoffs for the four discount bands (§4.7).
pub const TIER_CUTOFFS: [i32; 4] = [50, 70, 80, 90];

/// Default reputation at which the free-gas bucket becomes usable at all
/// (§6.4 `free-gas-threshold`, default 80 — distinct from the 90+ band
/// where the discount schedule itself treats a call as fully subsidized).
pub const DEFAULT_FREE_GAS_THRESHOLD: i32 = 80;

/// Discount percentage for a given claimed reputation, one of `0/25/50/75`.
/// `100` is returned for the 90+ band, where the call draws from the
/// free-gas bucket instead of paying gas at all.
#[must_use]
pub fn discount_percent(claimed_reputation: i32) -> u8 {
    match claimed_reputation {
        r if r < TIER_CUTOFFS[0] => 0,
        r if r < TIER_CUTOFFS[1] => 25,
        r if r < TIER_CUTOFFS[2] => 50,
        r if r < TIER_CUTOFFS[3] => 75,
        _ => 100,
    }
}

/// Apply a discount percentage to a gas amount, rounding down.
#[must_use]
pub fn apply_discount(gas_used: u64, discount_percent: u8) -> u64 {
    gas_used - (gas_used * u64::from(discount_percent.min(100)) / 100)
}

/// Whether `claimed_reputation` qualifies for the free-gas bucket at all,
/// per the configured threshold.
#[must_use]
pub fn free_gas_eligible(claimed_reputation: i32, threshold: i32) -> bool {
    claimed_reputation >= threshold
}

/// Daily free-gas bucket capacity: linear in reputation above the
/// threshold, zero below it (§4.8 "capacity = f(reputation)").
///
/// `slope` is gas units of daily capacity per reputation point above
/// threshold; `base` is the capacity right at the threshold.
#[must_use]
pub fn free_gas_daily_capacity(claimed_reputation: i32, threshold: i32, base: u64, slope: u64) -> u64 {
    if claimed_reputation < threshold {
        return 0;
    }
    base + slope * (claimed_reputation - threshold) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_tiers_match_the_schedule() {
        assert_eq!(discount_percent(0), 0);
        assert_eq!(discount_percent(49), 0);
        assert_eq!(discount_percent(50), 25);
        assert_eq!(discount_percent(69), 25);
        assert_eq!(discount_percent(70), 50);
        assert_eq!(discount_percent(79), 50);
        assert_eq!(discount_percent(80), 75);
        assert_eq!(discount_percent(89), 75);
        assert_eq!(discount_percent(90), 100);
        assert_eq!(discount_percent(100), 100);
    }

    #[test]
    fn apply_discount_rounds_down() {
        assert_eq!(apply_discount(1000, 25), 750);
        assert_eq!(apply_discount(1, 75), 0);
        assert_eq!(apply_discount(1000, 0), 1000);
    }

    #[test]
    fn free_gas_capacity_is_linear_above_threshold() {
        assert_eq!(free_gas_daily_capacity(79, 80, 1000, 10), 0);
        assert_eq!(free_gas_daily_capacity(80, 80, 1000, 10), 1000);
        assert_eq!(free_gas_daily_capacity(90, 80, 1000, 10), 1100);
    }
}
