//! CALL handler: look up the contract, run the interpreter against the
//! store, and — only on success — commit its staged storage writes. Gas
//! accounting runs entirely on the transaction's declared claim, never on
//! this node's own recomputed reputation, per the consensus-safety layer's
//! gas rules.

use cvm_consensus::{discount, subsidy};
use cvm_envelope::payload::Call;
use cvm_store::backend::KeyValueBackend;
use cvm_store::records::Receipt;
use cvm_types::{Bytes, U256};
use cvm_vm::context::Status;
use cvm_vm::gas::costs;
use cvm_vm::interpreter::execute;

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::types::{clamp_reputation, BlockHeader, BlockTransaction, HandlerOutcome, UndoOp};

/// Run a CALL transaction. `block_gas_used` is the caller's running tally of
/// gas billed so far in the enclosing block; it is checked and updated
/// against the per-block cap.
pub fn handle<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &Call,
    header: &BlockHeader,
    block_gas_used: &mut u64,
) -> Result<HandlerOutcome, ProcessorError> {
    let Some(contract) = ctx.store.get_contract(payload.contract_addr)? else {
        return Ok(HandlerOutcome::skipped("call: contract not found"));
    };
    if contract.retired {
        return Ok(HandlerOutcome::skipped("call: contract retired"));
    }

    let gas_limit = payload.gas_limit.min(costs::PER_TX_CAP);
    if block_gas_used.saturating_add(gas_limit) > costs::PER_BLOCK_CAP {
        return Ok(HandlerOutcome::skipped("call: block gas cap exceeded"));
    }

    let sender = tx.sender;
    let previous_nonce = ctx.store.get_nonce(sender)?;
    let claimed = tx.claimed_reputation.unwrap_or(0);

    let exec_ctx = cvm_vm::context::ExecutionContext {
        address: payload.contract_addr,
        caller: sender,
        call_value: U256::from(payload.value),
        gas_limit,
        input: Bytes::from_slice(&payload.input),
        block: *header,
        depth: 0,
    };

    let outcome = execute(contract.code.as_slice(), &exec_ctx, &ctx.store);
    let success = outcome.result.status.is_success();

    let mut undo = vec![UndoOp::SetNonce {
        address: sender,
        value: previous_nonce,
    }];

    if success {
        for (address, key, _) in &outcome.storage_writes {
            let previous = ctx.store.get_storage(*address, *key)?;
            undo.push(UndoOp::PutStorage {
                address: *address,
                key: *key,
                value: previous,
            });
        }
        for (address, key, value) in &outcome.storage_writes {
            ctx.store.put_storage(*address, *key, *value)?;
        }
    }
    ctx.store.set_nonce(sender, previous_nonce + 1)?;

    let discount_percent = discount::discount_percent(claimed);
    let billed = discount::apply_discount(outcome.result.gas_used, discount_percent);
    let free_gas_used = if discount::free_gas_eligible(claimed, ctx.config.free_gas_threshold) {
        let capacity = discount::free_gas_daily_capacity(
            claimed,
            ctx.config.free_gas_threshold,
            ctx.config.free_gas_base_capacity,
            ctx.config.free_gas_slope,
        );
        subsidy::draw_free_gas(&ctx.store, sender, capacity, billed, header.height)
            .unwrap_or(0)
    } else {
        0
    };

    *block_gas_used = block_gas_used.saturating_add(outcome.result.gas_used);

    let revert_reason = match &outcome.result.status {
        Status::Reverted => {
            Some(String::from_utf8_lossy(outcome.result.output.as_slice()).into_owned())
        }
        Status::Fault(message) => Some(message.clone()),
        Status::Stopped | Status::Returned => None,
    };

    let receipt = Receipt {
        status: u8::from(success),
        gas_used: outcome.result.gas_used,
        logs: outcome
            .result
            .logs
            .iter()
            .map(|log| (log.address, log.data.clone()))
            .collect(),
        created_contract: None,
        sender_reputation: clamp_reputation(tx.claimed_reputation),
        discount_applied_percent: discount_percent,
        free_gas_used,
        revert_reason,
    };

    Ok(HandlerOutcome::Applied { receipt, undo })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::records::ContractRecord;
    use cvm_store::store::Store;
    use cvm_types::{Address, Hash};

    fn ctx() -> CoreContext<InMemoryBackend> {
        CoreContext::new(Store::new(InMemoryBackend::new()), ProcessorConfig::default())
    }

    fn header() -> BlockHeader {
        BlockHeader {
            height: 10,
            hash: Hash::sha256(b"block"),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn call_against_a_missing_contract_is_skipped() {
        let core = ctx();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: Vec::new(),
            claimed_reputation: None,
            witness_code: None,
        };
        let payload = Call {
            contract_addr: Address::new([2; 20]),
            gas_limit: 1000,
            value: 0,
            input: Vec::new(),
        };
        let mut block_gas = 0u64;
        let outcome = handle(&core, &tx, &payload, &header(), &mut block_gas).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped { .. }));
    }

    #[test]
    fn call_running_stop_succeeds_and_advances_nonce() {
        let core = ctx();
        let address = Address::new([9; 20]);
        core.store
            .put_contract(
                address,
                &ContractRecord {
                    code: Bytes::new(vec![0x00]), // STOP
                    deployed_at_height: 1,
                    deploy_tx_id: Hash::ZERO,
                    deployer: Address::new([1; 20]),
                    retired: false,
                },
            )
            .unwrap();
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"tx"),
            sender: Address::new([1; 20]),
            outputs: Vec::new(),
            claimed_reputation: Some(60),
            witness_code: None,
        };
        let payload = Call {
            contract_addr: address,
            gas_limit: 100_000,
            value: 0,
            input: Vec::new(),
        };
        let mut block_gas = 0u64;
        let outcome = handle(&core, &tx, &payload, &header(), &mut block_gas).unwrap();
        match outcome {
            HandlerOutcome::Applied { receipt, .. } => assert_eq!(receipt.status, 1),
            HandlerOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
        assert_eq!(core.store.get_nonce(tx.sender).unwrap(), 1);
    }
}
