//! The claim-gate (§4.7): the one piece of this layer with actual consensus
//! teeth. Every validating node computes its own `R_local` independently;
//! a transaction is accepted only if the sender's claimed reputation does
//! not exceed it.

use crate::errors::ConsensusError;

/// Check `claimed <= local`. Once a block is accepted, every validator
/// re-applies the deterministic gas rules using the transaction-provided
/// claim (not its own recomputation) — see [`crate::discount`] — so the
/// resulting state transition is identical on every accepting node even
/// though `R_local` itself varies node to node.
pub fn check_claim(claimed: i32, local: i32) -> Result<(), ConsensusError> {
    if claimed > local {
        return Err(ConsensusError::ClaimExceedsLocal {
            claimed,
            local,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_at_or_below_local_passes() {
        assert!(check_claim(50, 50).is_ok());
        assert!(check_claim(40, 50).is_ok());
    }

    #[test]
    fn claim_above_local_is_rejected() {
        let err = check_claim(80, 79).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::ClaimExceedsLocal {
                claimed: 80,
                local: 79
            }
        );
    }
}
