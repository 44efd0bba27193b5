//! TRUST-EDGE and BONDED-VOTE handlers: both post a bond at output index 1
//! and write a record that is realized later (a trust edge feeds the
//! web-of-trust walk directly; a bonded vote is realized only through HAT
//! v2 composition, never applied to `ReputationRecord.score` here). Both
//! also write a [`cvm_store::records::VoteOrigin`] pointing back at their
//! own transaction hash, so a later DISPUTE naming that hash can resolve
//! which record it challenges.

use cvm_envelope::bond::bond_output_is_sufficient;
use cvm_envelope::payload::{BondedVotePayload, TrustEdgePayload};
use cvm_reputation::trust_graph::insert_edge;
use cvm_store::backend::KeyValueBackend;
use cvm_store::records::{BondedVote, Receipt, TrustEdge, VoteOrigin};

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::types::{clamp_reputation, BlockTransaction, HandlerOutcome, UndoOp};

/// Run a TRUST-EDGE transaction.
pub fn handle_trust_edge<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &TrustEdgePayload,
) -> Result<HandlerOutcome, ProcessorError> {
    if !bond_output_is_sufficient(&tx.outputs, payload.bond_amount) {
        return Ok(HandlerOutcome::skipped(
            "trust-edge: missing or insufficient bond",
        ));
    }
    let previous = ctx.store.get_trust_edge(payload.from, payload.to)?;

    let edge = TrustEdge {
        from: payload.from,
        to: payload.to,
        weight: payload.weight,
        bond_amount: u128::from(payload.bond_amount),
        bond_tx_id: tx.tx_hash,
        timestamp: payload.timestamp,
        slashed: false,
        reason: None,
    };
    if let Err(e) = insert_edge(&ctx.store, edge) {
        return Ok(HandlerOutcome::skipped(format!("trust-edge: {e}")));
    }
    ctx.store.put_vote_origin(
        tx.tx_hash,
        &VoteOrigin {
            a: payload.from,
            b: payload.to,
            is_bonded_vote: false,
        },
    )?;

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
        undo: vec![
            UndoOp::RestoreTrustEdge {
                from: payload.from,
                to: payload.to,
                value: previous,
            },
            UndoOp::DeleteVoteOrigin { tx_hash: tx.tx_hash },
        ],
    })
}

/// Run a BONDED-VOTE transaction.
pub fn handle_bonded_vote<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &BondedVotePayload,
) -> Result<HandlerOutcome, ProcessorError> {
    if !bond_output_is_sufficient(&tx.outputs, payload.bond_amount) {
        return Ok(HandlerOutcome::skipped(
            "bonded-vote: missing or insufficient bond",
        ));
    }
    let previous = ctx.store.get_bonded_vote(payload.voter, payload.target)?;

    let vote = BondedVote {
        voter: payload.voter,
        target: payload.target,
        vote: payload.vote,
        bond_amount: u128::from(payload.bond_amount),
        bond_tx_id: tx.tx_hash,
        timestamp: payload.timestamp,
        slashed: false,
    };
    ctx.store.put_bonded_vote(&vote)?;
    ctx.store.put_vote_origin(
        tx.tx_hash,
        &VoteOrigin {
            a: payload.voter,
            b: payload.target,
            is_bonded_vote: true,
        },
    )?;

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
        undo: vec![
            UndoOp::RestoreBondedVote {
                voter: payload.voter,
                target: payload.target,
                value: previous,
            },
            UndoOp::DeleteVoteOrigin { tx_hash: tx.tx_hash },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use cvm_envelope::bond::TxOutput;
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::store::Store;
    use cvm_types::{Address, Hash};

    fn ctx() -> CoreContext<InMemoryBackend> {
        CoreContext::new(Store::new(InMemoryBackend::new()), ProcessorConfig::default())
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

    #[test]
    fn trust_edge_without_bond_is_skipped() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: Vec::new(),
            claimed_reputation: None,
            witness_code: None,
        };
        let payload = TrustEdgePayload {
            from: Address::new([1; 20]),
            to: Address::new([2; 20]),
            weight: 50,
            bond_amount: 1000,
            timestamp: 1,
        };
        let outcome = handle_trust_edge(&core, &tx, &payload).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped { .. }));
    }

    #[test]
    fn trust_edge_with_bond_writes_edge_and_origin() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: p2sh_outputs(1000),
            claimed_reputation: Some(70),
            witness_code: None,
        };
        let payload = TrustEdgePayload {
            from: Address::new([1; 20]),
            to: Address::new([2; 20]),
            weight: 50,
            bond_amount: 1000,
            timestamp: 1,
        };
        let outcome = handle_trust_edge(&core, &tx, &payload).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Applied { .. }));
        assert!(core
            .store
            .get_trust_edge(payload.from, payload.to)
            .unwrap()
            .is_some());
        let origin = core.store.get_vote_origin(tx.tx_hash).unwrap().unwrap();
        assert_eq!(origin.a, payload.from);
        assert_eq!(origin.b, payload.to);
        assert!(!origin.is_bonded_vote);
    }
}
