//! DEPLOY handler: validate the witness-resolved bytecode against the
//! envelope's declared hash, derive the deterministic contract address from
//! `(deployer, nonce)`, and register the record. No constructor runs —
//! deployment is pure registration; `init_data` is carried in the record's
//! deploy transaction for any off-chain tooling that wants it, but the VM
//! itself never executes it.

use cvm_envelope::payload::Deploy;
use cvm_store::backend::KeyValueBackend;
use cvm_store::records::{ContractRecord, Receipt};
use cvm_types::{Address, Hash};
use cvm_vm::interpreter::validate_bytecode;

use crate::context::CoreContext;
use crate::errors::ProcessorError;
use crate::types::{clamp_reputation, BlockHeader, BlockTransaction, HandlerOutcome, UndoOp};

/// Run a DEPLOY transaction.
pub fn handle<B: KeyValueBackend>(
    ctx: &CoreContext<B>,
    tx: &BlockTransaction,
    payload: &Deploy,
    header: &BlockHeader,
) -> Result<HandlerOutcome, ProcessorError> {
    let Some(code) = &tx.witness_code else {
        return Ok(HandlerOutcome::skipped(
            "deploy: witness code not resolved",
        ));
    };
    if code.len() > ctx.config.max_code_size {
        return Ok(HandlerOutcome::skipped(
            "deploy: code exceeds max-code-size",
        ));
    }
    if Hash::sha256(code.as_slice()) != payload.code_hash {
        return Ok(HandlerOutcome::skipped(
            "deploy: code does not match declared hash",
        ));
    }
    if let Err(e) = validate_bytecode(code.as_slice()) {
        return Ok(HandlerOutcome::skipped(format!("deploy: {e}")));
    }

    let deployer = tx.sender;
    let previous_nonce = ctx.store.get_nonce(deployer)?;
    let address = Address::derive_contract(deployer, previous_nonce);
    if ctx.store.contract_exists(address)? {
        return Ok(HandlerOutcome::skipped(
            "deploy: derived address already in use",
        ));
    }

    let record = ContractRecord {
        code: code.clone(),
        deployed_at_height: header.height,
        deploy_tx_id: tx.tx_hash,
        deployer,
        retired: false,
    };
    ctx.store.put_contract(address, &record)?;
    ctx.store.increment_nonce(deployer)?;

    let receipt = Receipt {
        status: 1,
        gas_used: 0,
        logs: Vec::new(),
        created_contract: Some(address),
        sender_reputation: clamp_reputation(tx.claimed_reputation),
        discount_applied_percent: 0,
        free_gas_used: 0,
        revert_reason: None,
    };
    Ok(HandlerOutcome::Applied {
        receipt,
        undo: vec![
            UndoOp::DeleteContract { address },
            UndoOp::SetNonce {
                address: deployer,
                value: previous_nonce,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::store::Store;
    use cvm_types::Bytes;

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

    fn tx_with_code(code: Vec<u8>) -> (BlockTransaction, Deploy) {
        let payload = Deploy {
            code_hash: Hash::sha256(&code),
            gas_limit: 100_000,
            init_data: Vec::new(),
        };
        let tx = BlockTransaction {
            tx_hash: Hash::sha256(b"deploy-tx"),
            sender: Address::new([1; 20]),
            outputs: Vec::new(),
            claimed_reputation: Some(60),
            witness_code: Some(Bytes::new(code)),
        };
        (tx, payload)
    }

    #[test]
    fn deploy_registers_a_contract_at_the_derived_address() {
        let core = ctx();
        let (tx, payload) = tx_with_code(vec![0x00]); // STOP
        let outcome = handle(&core, &tx, &payload, &header()).unwrap();
        match outcome {
            HandlerOutcome::Applied { receipt, undo } => {
                let address = receipt.created_contract.unwrap();
                assert_eq!(address, Address::derive_contract(tx.sender, 0));
                assert!(core.store.contract_exists(address).unwrap());
                assert_eq!(undo.len(), 2);
            }
            HandlerOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn deploy_is_skipped_when_hash_does_not_match() {
        let core = ctx();
        let (tx, mut payload) = tx_with_code(vec![0x00]);
        payload.code_hash = Hash::ZERO;
        let outcome = handle(&core, &tx, &payload, &header()).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped { .. }));
    }

    #[test]
    fn deploy_is_skipped_when_oversized() {
        let core = ctx();
        let (tx, payload) = tx_with_code(vec![0x00; core.config.max_code_size + 1]);
        let outcome = handle(&core, &tx, &payload, &header()).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped { .. }));
    }
}
