//! Dispute resolution (§4.6): majority-by-stake juror vote resolves an open
//! dispute into a set of pending rewards, checked against the conservation
//! invariant before anything is persisted.

use cvm_store::backend::KeyValueBackend;
use cvm_store::records::{Dispute, DisputeStatus, PendingReward, RewardKind};
use cvm_store::store::Store;
use cvm_types::{Address, Hash};

use crate::errors::ReputationError;

/// Share of a slashed bond carved out as the challenger's bounty; the
/// remainder is split pro-rata among jurors who voted to slash.
pub const BOUNTY_PERCENT: u128 = 20;

/// Open a new dispute against `challenged_vote_id`, owned by `accused`,
/// backed by `disputed_bond_amount`. Fails if that vote is already under an
/// open dispute (§4.3 "challenged vote must exist and not already be
/// disputed" — existence is the caller's responsibility, since only the
/// caller knows which record family the id refers to).
pub fn open_dispute<B: KeyValueBackend>(
    store: &Store<B>,
    dispute_id: Hash,
    challenged_vote_id: Hash,
    challenger: Address,
    accused: Address,
    challenger_bond: u128,
    disputed_bond_amount: u128,
    now: u64,
) -> Result<(), ReputationError> {
    if let Some(existing) = store
        .get_dispute(dispute_id)
        .map_err(|e| ReputationError::Store(e.to_string()))?
    {
        if existing.status == DisputeStatus::Open {
            return Err(ReputationError::AlreadyDisputed);
        }
    }
    let dispute = Dispute {
        challenged_vote_id,
        challenger,
        accused,
        challenger_bond,
        disputed_bond_amount,
        created_at: now,
        status: DisputeStatus::Open,
        slash_decision: false,
        resolution_time: None,
        juror_stakes: Default::default(),
        juror_support_slash: Default::default(),
    };
    store
        .put_dispute(dispute_id, &dispute)
        .map_err(|e| ReputationError::Store(e.to_string()))
}

/// Record a juror's vote on an open dispute. If the quorum condition is met
/// (distinct jurors ≥ `quorum_jurors` OR total juror stake ≥
/// `quorum_stake`), the dispute resolves immediately and the resulting
/// pending rewards are returned for the caller to persist alongside the
/// resolved dispute.
#[allow(clippy::too_many_arguments)]
pub fn record_juror_vote<B: KeyValueBackend>(
    store: &Store<B>,
    dispute_id: Hash,
    juror: Address,
    support_slash: bool,
    stake: u128,
    quorum_jurors: usize,
    quorum_stake: u128,
    now: u64,
) -> Result<Option<Vec<PendingReward>>, ReputationError> {
    let mut dispute = store
        .get_dispute(dispute_id)
        .map_err(|e| ReputationError::Store(e.to_string()))?
        .ok_or(ReputationError::ChallengedVoteNotFound)?;
    if dispute.status != DisputeStatus::Open {
        return Err(ReputationError::DisputeNotOpen);
    }
    if dispute.juror_support_slash.contains_key(&juror) {
        return Err(ReputationError::DuplicateJurorVote);
    }
    dispute.juror_stakes.insert(juror, stake);
    dispute.juror_support_slash.insert(juror, support_slash);

    let quorum_met =
        dispute.juror_count() >= quorum_jurors || dispute.total_juror_stake() >= quorum_stake;

    if !quorum_met {
        store
            .put_dispute(dispute_id, &dispute)
            .map_err(|e| ReputationError::Store(e.to_string()))?;
        return Ok(None);
    }

    let rewards = resolve(&mut dispute, dispute_id, now)?;
    store
        .put_dispute(dispute_id, &dispute)
        .map_err(|e| ReputationError::Store(e.to_string()))?;
    Ok(Some(rewards))
}

fn resolve(
    dispute: &mut Dispute,
    dispute_id: Hash,
    now: u64,
) -> Result<Vec<PendingReward>, ReputationError> {
    let support_stake: u128 = dispute
        .juror_support_slash
        .iter()
        .filter(|(_, &support)| support)
        .map(|(juror, _)| dispute.juror_stakes.get(juror).copied().unwrap_or(0))
        .sum();
    let oppose_stake: u128 = dispute.total_juror_stake().saturating_sub(support_stake);
    let slash_decision = support_stake > oppose_stake;

    dispute.slash_decision = slash_decision;
    dispute.status = DisputeStatus::Resolved;
    dispute.resolution_time = Some(now);

    let mut rewards = Vec::new();
    let expected_total;

    if slash_decision {
        expected_total = dispute.challenger_bond + dispute.disputed_bond_amount;
        let slashed_pool = dispute.disputed_bond_amount;
        let bounty = slashed_pool * BOUNTY_PERCENT / 100;
        let juror_pool = slashed_pool - bounty;

        rewards.push(reward(
            dispute_id,
            dispute.challenger,
            dispute.challenger_bond,
            RewardKind::BondReturn,
            now,
        ));
        rewards.push(reward(
            dispute_id,
            dispute.challenger,
            bounty,
            RewardKind::Bounty,
            now,
        ));

        let winners: Vec<(Address, u128)> = dispute
            .juror_support_slash
            .iter()
            .filter(|(_, &support)| support)
            .map(|(juror, _)| (*juror, dispute.juror_stakes.get(juror).copied().unwrap_or(0)))
            .collect();
        let winning_stake_total: u128 = winners.iter().map(|(_, stake)| stake).sum();

        if winning_stake_total > 0 {
            let mut distributed = 0u128;
            for (index, (juror, stake)) in winners.iter().enumerate() {
                let share = if index + 1 == winners.len() {
                    juror_pool - distributed
                } else {
                    juror_pool * stake / winning_stake_total
                };
                distributed += share;
                if share > 0 {
                    rewards.push(reward(dispute_id, *juror, share, RewardKind::JurorShare, now));
                }
            }
        } else if juror_pool > 0 {
            // No juror actually voted to slash despite support_stake winning
            // (shouldn't happen given how support_stake is computed, but
            // keep the pool from vanishing silently).
            rewards.push(reward(
                dispute_id,
                dispute.challenger,
                juror_pool,
                RewardKind::Bounty,
                now,
            ));
        }
    } else {
        expected_total = dispute.challenger_bond;
        rewards.push(reward(
            dispute_id,
            dispute.accused,
            dispute.challenger_bond,
            RewardKind::WronglyAccusedCompensation,
            now,
        ));
    }

    let distributed_total: u128 = rewards.iter().map(|r| r.amount).sum();
    if distributed_total != expected_total {
        return Err(ReputationError::ConservationViolated {
            distributed: distributed_total,
            expected: expected_total,
        });
    }

    Ok(rewards)
}

fn reward(
    dispute_id: Hash,
    recipient: Address,
    amount: u128,
    kind: RewardKind,
    now: u64,
) -> PendingReward {
    PendingReward {
        reward_id: PendingReward::derive_id(dispute_id, recipient, kind),
        source_dispute: dispute_id,
        recipient,
        amount,
        kind,
        created_at: now,
        claimed: false,
        claim_tx_id: None,
        claim_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvm_store::memory::InMemoryBackend;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn slash_decision_distributes_bounty_and_juror_shares() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let dispute_id = Hash::sha256(b"d1");
        open_dispute(
            &store,
            dispute_id,
            Hash::sha256(b"vote"),
            addr(1),
            addr(2),
            1000,
            5000,
            100,
        )
        .unwrap();

        for juror in 3..8u8 {
            let result =
                record_juror_vote(&store, dispute_id, addr(juror), true, 100, 5, 100_000, 200)
                    .unwrap();
            if juror < 7 {
                assert!(result.is_none());
            } else {
                let rewards = result.unwrap();
                let total: u128 = rewards.iter().map(|r| r.amount).sum();
                assert_eq!(total, 1000 + 5000);
            }
        }
    }

    #[test]
    fn failed_challenge_compensates_the_accused() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let dispute_id = Hash::sha256(b"d2");
        open_dispute(
            &store,
            dispute_id,
            Hash::sha256(b"vote"),
            addr(1),
            addr(2),
            1000,
            5000,
            100,
        )
        .unwrap();
        for juror in 10..15u8 {
            record_juror_vote(&store, dispute_id, addr(juror), false, 50, 5, 100_000, 200).unwrap();
        }
        let dispute = store.get_dispute(dispute_id).unwrap().unwrap();
        assert!(!dispute.slash_decision);
        assert_eq!(dispute.status, DisputeStatus::Resolved);
    }

    #[test]
    fn duplicate_juror_vote_is_rejected() {
        let store: Store<InMemoryBackend> = Store::new(InMemoryBackend::new());
        let dispute_id = Hash::sha256(b"d3");
        open_dispute(
            &store,
            dispute_id,
            Hash::sha256(b"vote"),
            addr(1),
            addr(2),
            1000,
            5000,
            100,
        )
        .unwrap();
        record_juror_vote(&store, dispute_id, addr(9), true, 50, 99, u128::MAX, 200).unwrap();
        let err = record_juror_vote(&store, dispute_id, addr(9), false, 50, 99, u128::MAX, 200)
            .unwrap_err();
        assert_eq!(err, ReputationError::DuplicateJurorVote);
    }
}
