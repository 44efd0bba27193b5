//! Block-level dispatch (§7): connect a block by running every transaction's
//! envelope through the matching handler in strict transaction-index order,
//! and disconnect one by replaying the recorded undo steps in the exact
//! reverse order they were applied.
//!
//! Two things live here rather than in any one handler because they are
//! properties of the *block*, not of a single transaction: the claim-gate
//! pre-validation pass (§4.7), which rejects the whole block before any
//! handler runs a single mutation, and the per-block gas cap tally threaded
//! through every CALL.

use cvm_envelope::payload::Payload;
use cvm_envelope::scanner::find_envelope;
use cvm_store::backend::KeyValueBackend;
use cvm_store::keys;
use cvm_store::records::{BondedVote, Dispute, TrustEdge};
use cvm_types::Address;

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::handlers::{call, deploy, dispute, trust, vote};
use crate::types::{
    empty_receipt, BlockHeader, BlockTransaction, ConnectedBlock, HandlerOutcome, ProcessedTx,
    UndoOp,
};

/// Check every claim-bearing transaction's `R_claim` against this node's own
/// `R_local` before any handler runs (§4.7, §7 "Consensus-violation"). A
/// single failing claim rejects the whole block — unlike every other
/// failure mode here, this one is not a per-transaction skip.
fn validate_claim_gate<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    header: &BlockHeader,
    transactions: &[BlockTransaction],
) -> Result<(), ProcessorError> {
    for tx in transactions {
        let Some(claimed) = tx.claimed_reputation else {
            continue;
        };
        let local = cvm_reputation::compositor::compute_score(
            &ctx.store,
            ctx.config.node_identity,
            tx.sender,
            header.height,
            header.timestamp,
        )
        .map_err(|e| ProcessorError::Internal(e.to_string()))?;
        cvm_consensus::claim_gate::check_claim(claimed, local).map_err(|_| {
            ProcessorError::ClaimGateRejected {
                tx_hash: tx.tx_hash,
                claimed,
                local,
            }
        })?;
    }
    Ok(())
}

/// Dispatch a single transaction's parsed payload to its handler.
fn dispatch<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    header: &BlockHeader,
    block_gas_used: &mut u64,
) -> Result<ProcessedTx, ProcessorError> {
    let Some((_, parsed)) = find_envelope(&tx.outputs) else {
        return Ok(ProcessedTx {
            tx_hash: tx.tx_hash,
            handled: false,
            receipt: empty_receipt(None),
            undo: Vec::new(),
        });
    };
    let payload = match parsed {
        Ok(envelope) => envelope.payload,
        Err(e) => {
            return Ok(ProcessedTx {
                tx_hash: tx.tx_hash,
                handled: false,
                receipt: empty_receipt(Some(format!("payload-malformed: {e}"))),
                undo: Vec::new(),
            })
        }
    };

    let outcome = match &payload {
        Payload::Deploy(p) => deploy::handle(ctx, tx, p, header)?,
        Payload::Call(p) => call::handle(ctx, tx, p, header, block_gas_used)?,
        Payload::Vote(p) => vote::handle(ctx, tx, p)?,
        Payload::TrustEdge(p) => trust::handle_trust_edge(ctx, tx, p)?,
        Payload::BondedVote(p) => trust::handle_bonded_vote(ctx, tx, p)?,
        Payload::Dispute(p) => dispute::handle_dispute(ctx, tx, p)?,
        Payload::DisputeVote(p) => dispute::handle_dispute_vote(ctx, tx, p)?,
    };

    Ok(match outcome {
        HandlerOutcome::Applied { receipt, undo } => ProcessedTx {
            tx_hash: tx.tx_hash,
            handled: true,
            receipt,
            undo,
        },
        HandlerOutcome::Skipped { reason } => ProcessedTx {
            tx_hash: tx.tx_hash,
            handled: false,
            receipt: empty_receipt(Some(format!("semantic-skip: {reason}"))),
            undo: Vec::new(),
        },
    })
}

/// Connect a block: run every transaction's envelope through its handler,
/// in transaction-index order (§7). Fails the whole block only on a claim-
/// gate rejection or a store/internal error; every other failure mode is
/// recorded per-transaction and never aborts the block.
pub fn connect_block<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    header: &BlockHeader,
    transactions: &[BlockTransaction],
) -> Result<ConnectedBlock, ProcessorError> {
    validate_claim_gate(ctx, header, transactions)?;

    let mut block_gas_used = 0u64;
    let mut processed = Vec::with_capacity(transactions.len());
    for tx in transactions {
        processed.push(dispatch(ctx, tx, header, &mut block_gas_used)?);
    }
    Ok(ConnectedBlock {
        transactions: processed,
    })
}

pub(crate) fn apply_undo<B: KeyValueBackend>(ctx: &CoreContext<B>, op: &UndoOp) -> Result<(), ProcessorError> {
    match op {
        UndoOp::SetNonce { address, value } => ctx.store.set_nonce(*address, *value)?,
        UndoOp::DeleteContract { address } => ctx.store.delete_contract(*address)?,
        UndoOp::PutStorage { address, key, value } => ctx.store.put_storage(*address, *key, *value)?,
        UndoOp::PutReputation { address, value } => ctx.store.put_reputation(*address, value)?,
        UndoOp::RestoreTrustEdge { from, to, value } => restore_trust_edge(ctx, *from, *to, value)?,
        UndoOp::RestoreBondedVote { voter, target, value } => {
            restore_bonded_vote(ctx, *voter, *target, value)?
        }
        UndoOp::RestoreDispute { dispute_id, value } => restore_dispute(ctx, *dispute_id, value)?,
        UndoOp::DeletePendingReward { reward_id } => {
            ctx.store.delete_extension(&keys::pending_reward_key(*reward_id))?
        }
        UndoOp::DeleteVoteOrigin { tx_hash } => {
            ctx.store.delete_extension(&keys::vote_origin_key(*tx_hash))?
        }
    }
    Ok(())
}

fn restore_trust_edge<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    from: Address,
    to: Address,
    value: &Option<TrustEdge>,
) -> Result<(), ProcessorError> {
    match value {
        Some(edge) => ctx.store.put_trust_edge(edge)?,
        None => ctx.store.delete_extension(&keys::trust_edge_key(from, to))?,
    }
    Ok(())
}

fn restore_bonded_vote<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    voter: Address,
    target: Address,
    value: &Option<BondedVote>,
) -> Result<(), ProcessorError> {
    match value {
        Some(vote) => ctx.store.put_bonded_vote(vote)?,
        None => ctx
            .store
            .delete_extension(&keys::bonded_vote_key(voter, target))?,
    }
    Ok(())
}

fn restore_dispute<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    dispute_id: cvm_types::Hash,
    value: &Option<Dispute>,
) -> Result<(), ProcessorError> {
    match value {
        Some(dispute) => ctx.store.put_dispute(dispute_id, dispute)?,
        None => ctx.store.delete_extension(&keys::dispute_key(dispute_id))?,
    }
    Ok(())
}

/// Disconnect a block: replay every transaction's undo steps in reverse
/// transaction order, and each transaction's own steps in reverse
/// application order (§7 "disconnect replays stored inverses in reverse
/// order").
pub fn disconnect_block<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    block: &ConnectedBlock,
) -> Result<(), ProcessorError> {
    for tx in block.transactions.iter().rev() {
        for op in tx.undo.iter().rev() {
            apply_undo(ctx, op)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use cvm_envelope::bond::TxOutput;
    use cvm_envelope::payload::{encode_envelope, Vote};
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::store::Store;
    use cvm_types::Hash;

    fn ctx() -> CoreContext<InMemoryBackend> {
        CoreContext::new(Store::new(InMemoryBackend::new()), ProcessorConfig::default())
    }

    fn header() -> BlockHeader {
        BlockHeader {
            height: 1,
            hash: Hash::sha256(b"block"),
            timestamp: 1_700_000_000,
        }
    }

    fn vote_output(target: Address, delta: i32) -> TxOutput {
        let body = encode_envelope(&Payload::Vote(Vote {
            target_addr: target,
            vote: delta,
            timestamp: 1,
        }));
        let mut script = vec![0x6a, body.len() as u8];
        script.extend_from_slice(&body);
        TxOutput {
            value: 0,
            script_pubkey: script,
        }
    }

    #[test]
    fn connect_then_disconnect_round_trips_a_vote() {
        let core = ctx();
        let target = Address::new([7; 20]);
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: vec![vote_output(target, 20)],
            claimed_reputation: None,
            witness_code: None,
        };
        let connected = connect_block(&core, &header(), &[tx]).unwrap();
        assert!(connected.transactions[0].handled);
        assert_eq!(core.store.get_reputation(target, 0).unwrap().score, 70);

        disconnect_block(&core, &connected).unwrap();
        assert_eq!(core.store.get_reputation(target, 0).unwrap().score, 50);
    }

    #[test]
    fn claim_exceeding_local_reputation_rejects_the_whole_block() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: Vec::new(),
            claimed_reputation: Some(100),
            witness_code: None,
        };
        let result = connect_block(&core, &header(), &[tx]);
        assert!(matches!(
            result,
            Err(ProcessorError::ClaimGateRejected { .. })
        ));
    }

    #[test]
    fn a_transaction_with_no_envelope_is_recorded_unhandled() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: vec![TxOutput {
                value: 0,
                script_pubkey: vec![0x76, 0xa9],
            }],
            claimed_reputation: None,
            witness_code: None,
        };
        let connected = connect_block(&core, &header(), &[tx]).unwrap();
        assert!(!connected.transactions[0].handled);
    }
}
