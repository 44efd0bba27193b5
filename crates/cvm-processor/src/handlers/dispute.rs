//! DISPUTE and DISPUTE-VOTE handlers.
//!
//! A dispute's id is the challenged transaction's own hash
//! (`payload.original_vote_tx`) rather than the DISPUTE transaction's own
//! hash — reusing it is what makes `open_dispute`'s "already disputed"
//! collision guard mean anything: keying on the DISPUTE tx's own
//! (always-unique) hash would let the same vote be disputed any number of
//! times in parallel.
//!
//! Resolution only decides *whether* to slash; actually marking the
//! underlying trust edge or bonded vote slashed happens here, by resolving
//! `challenged_vote_id` back to a `(from, to)` pair through the
//! `VoteOrigin` record the TRUST-EDGE/BONDED-VOTE handler wrote.

use cvm_envelope::bond::bond_output_is_sufficient;
use cvm_envelope::payload::{DisputePayload, DisputeVotePayload};
use cvm_reputation::dispute::{open_dispute, record_juror_vote};
use cvm_reputation::trust_graph::slash_edge;
use cvm_store::backend::KeyValueBackend;
use cvm_store::records::Receipt;

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::types::{clamp_reputation, BlockTransaction, HandlerOutcome, UndoOp};

/// Run a DISPUTE transaction.
pub fn handle_dispute<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &DisputePayload,
) -> Result<HandlerOutcome, ProcessorError> {
    if !bond_output_is_sufficient(&tx.outputs, payload.challenge_bond) {
        return Ok(HandlerOutcome::skipped(
            "dispute: missing or insufficient challenge bond",
        ));
    }
    let Some(origin) = ctx.store.get_vote_origin(payload.original_vote_tx)? else {
        return Ok(HandlerOutcome::skipped(
            "dispute: original vote transaction not found",
        ));
    };

    let disputed_bond_amount = if origin.is_bonded_vote {
        ctx.store
            .get_bonded_vote(origin.a, origin.b)?
            .map(|v| v.bond_amount)
    } else {
        ctx.store
            .get_trust_edge(origin.a, origin.b)?
            .map(|e| e.bond_amount)
    };
    let Some(disputed_bond_amount) = disputed_bond_amount else {
        return Ok(HandlerOutcome::skipped(
            "dispute: challenged record no longer exists",
        ));
    };

    let dispute_id = payload.original_vote_tx;
    let previous = ctx.store.get_dispute(dispute_id)?;

    if let Err(e) = open_dispute(
        &ctx.store,
        dispute_id,
        payload.original_vote_tx,
        payload.challenger,
        origin.a,
        u128::from(payload.challenge_bond),
        disputed_bond_amount,
        payload.timestamp,
    ) {
        return Ok(HandlerOutcome::skipped(format!("dispute: {e}")));
    }

    let receipt = Receipt {
        status: 1,
        gas_used: 0,
        logs: Vec::new(),
        created_contract: None,
        sender_reputation: clamp_reputation(tx.claimed_reputation),
        discount_applied_percent: 0,
        free_gas_used: 0,
        revert_reason: None,
    };
    Ok(HandlerOutcome::Applied {
        receipt,
        undo: vec![UndoOp::RestoreDispute {
            dispute_id,
            value: previous,
        }],
    })
}

/// Run a DISPUTE-VOTE transaction.
pub fn handle_dispute_vote<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &DisputeVotePayload,
) -> Result<HandlerOutcome, ProcessorError> {
    let previous_dispute = ctx.store.get_dispute(payload.dispute_id)?;

    let rewards = match record_juror_vote(
        &ctx.store,
        payload.dispute_id,
        payload.juror,
        payload.support_slash,
        u128::from(payload.stake),
        ctx.config.dispute_quorum_jurors,
        ctx.config.dispute_quorum_stake,
        payload.timestamp,
    ) {
        Ok(rewards) => rewards,
        Err(e) => return Ok(HandlerOutcome::skipped(format!("dispute-vote: {e}"))),
    };

    let mut undo = vec![UndoOp::RestoreDispute {
        dispute_id: payload.dispute_id,
        value: previous_dispute,
    }];

    let Some(rewards) = rewards else {
        // Quorum not yet met; the dispute record was updated in place but no
        // reward/slash side effects happen until it resolves.
        let receipt = Receipt {
            status: 1,
            gas_used: 0,
            logs: Vec::new(),
            created_contract: None,
            sender_reputation: clamp_reputation(tx.claimed_reputation),
            discount_applied_percent: 0,
            free_gas_used: 0,
            revert_reason: None,
        };
        return Ok(HandlerOutcome::Applied { receipt, undo });
    };

    for reward in &rewards {
        ctx.store.put_pending_reward(reward)?;
        undo.push(UndoOp::DeletePendingReward {
            reward_id: reward.reward_id,
        });
    }

    let resolved = ctx
        .store
        .get_dispute(payload.dispute_id)?
        .ok_or_else(|| ProcessorError::Internal("dispute vanished after resolution".into()))?;

    if resolved.slash_decision {
        if let Some(origin) = ctx.store.get_vote_origin(resolved.challenged_vote_id)? {
            if origin.is_bonded_vote {
                let Some(mut vote) = ctx.store.get_bonded_vote(origin.a, origin.b)? else {
                    return Err(ProcessorError::Internal(
                        "slash decision against a missing bonded vote".into(),
                    ));
                };
                let previous_vote = vote.clone();
                vote.slashed = true;
                ctx.store.put_bonded_vote(&vote)?;
                undo.push(UndoOp::RestoreBondedVote {
                    voter: origin.a,
                    target: origin.b,
                    value: Some(previous_vote),
                });
            } else {
                let Some(previous_edge) = ctx.store.get_trust_edge(origin.a, origin.b)? else {
                    return Err(ProcessorError::Internal(
                        "slash decision against a missing trust edge".into(),
                    ));
                };
                slash_edge(&ctx.store, origin.a, origin.b, Some("dispute resolution".into()))
                    .map_err(|e| ProcessorError::Internal(e.to_string()))?;
                undo.push(UndoOp::RestoreTrustEdge {
                    from: origin.a,
                    to: origin.b,
                    value: Some(previous_edge),
                });
            }
        }
    }

    let receipt = Receipt {
        status: 1,
        gas_used: 0,
        logs: Vec::new(),
        created_contract: None,
        sender_reputation: clamp_reputation(tx.claimed_reputation),
        discount_applied_percent: 0,
        free_gas_used: 0,
        revert_reason: None,
    };
    Ok(HandlerOutcome::Applied { receipt, undo })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use cvm_envelope::bond::TxOutput;
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::records::{TrustEdge, VoteOrigin};
    use cvm_store::store::Store;
    use cvm_types::{Address, Hash};

    fn ctx() -> CoreContext<InMemoryBackend> {
        let mut config = ProcessorConfig::default();
        config.dispute_quorum_jurors = 3;
        CoreContext::new(Store::new(InMemoryBackend::new()), config)
    }

    fn p2sh_outputs(value: u64) -> Vec<TxOutput> {
        let mut script = vec![0xa9, 0x14];
        script.extend_from_slice(&[0xaa; 20]);
        script.push(0x87);
        vec![
            TxOutput {
                value: 0,
                script_pubkey: Vec::new(),
            },
            TxOutput {
                value,
                script_pubkey: script,
            },
        ]
    }

    fn seed_trust_edge<B: KeyValueBackend>(core: &CoreContext<B>, original_tx: Hash, from: Address, to: Address) {
        core.store
            .put_trust_edge(&TrustEdge {
                from,
                to,
                weight: 80,
                bond_amount: 5000,
                bond_tx_id: original_tx,
                timestamp: 1,
                slashed: false,
                reason: None,
            })
            .unwrap();
        core.store
            .put_vote_origin(
                original_tx,
                &VoteOrigin {
                    a: from,
                    b: to,
                    is_bonded_vote: false,
                },
            )
            .unwrap();
    }

    #[test]
    fn dispute_without_origin_is_skipped() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"dispute-tx"),
            sender: Address::new([1; 20]),
            outputs: p2sh_outputs(1000),
            claimed_reputation: None,
            witness_code: None,
        };
        let payload = DisputePayload {
            challenger: Address::new([1; 20]),
            original_vote_tx: Hash::sha256(b"missing"),
            challenge_bond: 1000,
            reason: Vec::new(),
            timestamp: 1,
        };
        let outcome = handle_dispute(&core, &tx, &payload).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped { .. }));
    }

    #[test]
    fn dispute_vote_resolves_and_slashes_the_trust_edge() {
        let core = ctx();
        let original_tx = Hash::sha256(b"original-edge-tx");
        let from = Address::new([5; 20]);
        let to = Address::new([6; 20]);
        seed_trust_edge(&core, original_tx, from, to);

        let dispute_tx = BlockTransaction {
            tx_hash: Hash::sha256(b"dispute-tx"),
            sender: Address::new([1; 20]),
            outputs: p2sh_outputs(1000),
            claimed_reputation: None,
            witness_code: None,
        };
        let dispute_payload = DisputePayload {
            challenger: Address::new([1; 20]),
            original_vote_tx: original_tx,
            challenge_bond: 1000,
            reason: Vec::new(),
            timestamp: 10,
        };
        let outcome = handle_dispute(&core, &dispute_tx, &dispute_payload).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Applied { .. }));

        for juror in 1..=3u8 {
            let vote_tx = BlockTransaction {
                tx_hash: Hash::sha256(&[juror]),
                sender: Address::new([juror; 20]),
                outputs: Vec::new(),
                claimed_reputation: None,
                witness_code: None,
            };
            let vote_payload = DisputeVotePayload {
                juror: Address::new([10 + juror; 20]),
                dispute_id: original_tx,
                support_slash: true,
                stake: 100,
                timestamp: 20,
            };
            let outcome = handle_dispute_vote(&core, &vote_tx, &vote_payload).unwrap();
            assert!(matches!(outcome, HandlerOutcome::Applied { .. }));
        }

        let edge = core.store.get_trust_edge(from, to).unwrap().unwrap();
        assert!(edge.slashed);
    }

    #[test]
    fn disconnecting_a_trust_edge_slash_restores_the_pre_slash_edge() {
        let core = ctx();
        let original_tx = Hash::sha256(b"original-edge-tx-2");
        let from = Address::new([7; 20]);
        let to = Address::new([8; 20]);
        seed_trust_edge(&core, original_tx, from, to);

        let dispute_tx = BlockTransaction {
            tx_hash: Hash::sha256(b"dispute-tx-2"),
            sender: Address::new([1; 20]),
            outputs: p2sh_outputs(1000),
            claimed_reputation: None,
            witness_code: None,
        };
        let dispute_payload = DisputePayload {
            challenger: Address::new([1; 20]),
            original_vote_tx: original_tx,
            challenge_bond: 1000,
            reason: Vec::new(),
            timestamp: 10,
        };
        handle_dispute(&core, &dispute_tx, &dispute_payload).unwrap();

        let mut last_undo = Vec::new();
        for juror in 1..=3u8 {
            let vote_tx = BlockTransaction {
                tx_hash: Hash::sha256(&[20 + juror]),
                sender: Address::new([juror; 20]),
                outputs: Vec::new(),
                claimed_reputation: None,
                witness_code: None,
            };
            let vote_payload = DisputeVotePayload {
                juror: Address::new([10 + juror; 20]),
                dispute_id: original_tx,
                support_slash: true,
                stake: 100,
                timestamp: 20,
            };
            let outcome = handle_dispute_vote(&core, &vote_tx, &vote_payload).unwrap();
            if let HandlerOutcome::Applied { undo, .. } = outcome {
                last_undo = undo;
            }
        }

        assert!(core.store.get_trust_edge(from, to).unwrap().unwrap().slashed);
        assert!(last_undo
            .iter()
            .any(|op| matches!(op, UndoOp::RestoreTrustEdge { from: f, to: t, value: Some(v) }
                if *f == from && *t == to && !v.slashed)));

        for op in last_undo.iter().rev() {
            crate::block::apply_undo(&core, op).unwrap();
        }
        let restored = core.store.get_trust_edge(from, to).unwrap().unwrap();
        assert!(!restored.slashed);
    }
}
