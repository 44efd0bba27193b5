//! VOTE handler: an unbonded reputation vote applied directly to the
//! target's simple integer score. Clamped to `[0, 100]`; the weighting of
//! repeated votes against HAT v2's other components is left to
//! `cvm_reputation::hat::behavior_score` reading `vote_count`, not to this
//! handler.

use cvm_envelope::payload::Vote;
use cvm_store::backend::KeyValueBackend;
use cvm_store::records::Receipt;

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::types::{clamp_reputation, BlockTransaction, HandlerOutcome, UndoOp};

/// Run a VOTE transaction.
pub fn handle<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &Vote,
) -> Result<HandlerOutcome, ProcessorError> {
    let previous = ctx.store.get_reputation(payload.target_addr, payload.timestamp)?;

    let mut updated = previous.clone();
    updated.score = (previous.score + payload.vote).clamp(0, 100);
    updated.vote_count += 1;
    updated.last_updated = payload.timestamp;
    ctx.store.put_reputation(payload.target_addr, &updated)?;

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
        undo: vec![UndoOp::PutReputation {
            address: payload.target_addr,
            value: previous,
        }],
    })
}
