//! The main execution loop (§4.1).

use crate::context::{ExecutionContext, ExecutionResult, LogRecord, Status, MAX_CALL_DEPTH};
use crate::errors::VmError;
use crate::gas::{static_cost, GasCounter};
use crate::opcodes::Opcode;
use crate::ports::StateAccess;
use crate::precompiles;
use crate::stack::Stack;
use cvm_types::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use std::collections::HashMap;

/// Hard cap on deployable/loadable bytecode size.
pub const MAX_CODE_SIZE: usize = 24 * 1024;

/// A staged storage write, keyed by (address, key), shared across the whole
/// call tree for one transaction: nested `CALL`s address disjoint
/// `(address, key)` pairs (or the same contract re-entering itself, which
/// still wants read-your-writes), so one map gives correct isolation without
/// per-frame copies. A `REVERT` drops everything staged since the matching
/// snapshot was taken (§4.1 "Snapshot/revert").
#[derive(Clone, Debug, Default)]
struct PendingWrites {
    writes: HashMap<(Address, StorageKey), StorageValue>,
}

impl PendingWrites {
    fn get(&self, address: Address, key: StorageKey, state: &dyn StateAccess) -> StorageValue {
        self.writes
            .get(&(address, key))
            .copied()
            .unwrap_or_else(|| state.get_storage(address, key))
    }

    fn set(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.writes.insert((address, key), value);
    }
}

/// Outcome of running bytecode to completion, returned alongside the
/// [`ExecutionResult`] so the block processor can decide whether to commit
/// the interpreter's storage writes.
pub struct RunOutcome {
    /// The execution result (status, output, gas, logs).
    pub result: ExecutionResult,
    /// Storage writes made during this call. Only meaningful — and only
    /// intended to be committed — when `result.status.is_success()`.
    pub storage_writes: Vec<(Address, StorageKey, StorageValue)>,
}

/// Validate bytecode against the size cap and scan for PUSH immediates that
/// would run past the end of the code (§4.3 DEPLOY handler's "opcode-and-
/// PUSH-length scan").
pub fn validate_bytecode(code: &[u8]) -> Result<(), VmError> {
    if code.len() > MAX_CODE_SIZE {
        return Err(VmError::CodeSizeExceeded {
            size: code.len(),
            max: MAX_CODE_SIZE,
        });
    }
    let mut pc = 0usize;
    while pc < code.len() {
        match Opcode::decode(code[pc]) {
            Some(op) => pc += op.length(),
            None => return Err(VmError::InvalidOpcode(code[pc])),
        }
    }
    Ok(())
}

/// Precompute the set of valid `JUMP`/`JUMPI` destinations: any offset that
/// is the start of an instruction (not a PUSH immediate byte).
fn analyze_jump_destinations(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut pc = 0usize;
    while pc < code.len() {
        dests[pc] = true;
        let len = Opcode::decode(code[pc]).map_or(1, Opcode::length);
        pc += len;
    }
    dests
}

/// Run `code` to completion under `ctx`, against `state`. Entry point for a
/// top-level transaction call (depth 0); nested `CALL`s recurse through
/// [`run_frame`] sharing the same pending-write set.
pub fn execute(code: &[u8], ctx: &ExecutionContext, state: &dyn StateAccess) -> RunOutcome {
    let mut pending = PendingWrites::default();
    let mut gas = GasCounter::new(ctx.gas_limit);
    let result = run_frame(code, ctx, state, &mut pending, &mut gas);
    let writes = if result.status.is_success() {
        pending
            .writes
            .into_iter()
            .map(|((addr, key), value)| (addr, key, value))
            .collect()
    } else {
        Vec::new()
    };
    RunOutcome {
        result,
        storage_writes: writes,
    }
}

/// A snapshot of everything a `REVERT` must undo: the operand stack, PC,
/// and the pending-write set as of just before the enclosing `CALL`.
struct Snapshot {
    stack: Vec<U256>,
    pending_writes: HashMap<(Address, StorageKey), StorageValue>,
}

enum StepOutcome {
    Continue,
    Stop,
    Return(Bytes),
    Revert(Bytes),
}

/// Execute one call frame to completion. `gas` is the counter for this
/// frame; callers of [`run_frame`] (i.e. `CALL`) carve out a fresh
/// sub-counter from their own remaining gas and fold its usage back in.
fn run_frame(
    code: &[u8],
    ctx: &ExecutionContext,
    state: &dyn StateAccess,
    pending: &mut PendingWrites,
    gas: &mut GasCounter,
) -> ExecutionResult {
    if ctx.depth > MAX_CALL_DEPTH {
        let err = VmError::CallDepthExceeded {
            depth: ctx.depth,
            max: MAX_CALL_DEPTH,
        };
        return ExecutionResult::fault(err.to_string(), 0);
    }

    let jump_dests = analyze_jump_destinations(code);
    let mut stack = Stack::new();
    let mut logs: Vec<LogRecord> = Vec::new();
    let mut pc = 0usize;

    loop {
        if pc >= code.len() {
            return ExecutionResult::stopped(gas.used(), logs);
        }

        let Some(op) = Opcode::decode(code[pc]) else {
            return ExecutionResult::fault(VmError::InvalidOpcode(code[pc]).to_string(), gas.used());
        };

        if !gas.charge(static_cost(op)) {
            return ExecutionResult::fault(VmError::OutOfGas.to_string(), gas.used());
        }

        match step(
            op,
            code,
            &mut pc,
            &mut stack,
            gas,
            pending,
            &mut logs,
            &jump_dests,
            ctx,
            state,
        ) {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Stop) => return ExecutionResult::stopped(gas.used(), logs),
            Ok(StepOutcome::Return(buf)) => {
                return ExecutionResult::returned(buf, gas.used(), logs);
            }
            Ok(StepOutcome::Revert(buf)) => {
                return ExecutionResult::reverted(buf, gas.used());
            }
            Err(err) => return ExecutionResult::fault(err.to_string(), gas.used()),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn step(
    op: Opcode,
    code: &[u8],
    pc: &mut usize,
    stack: &mut Stack,
    gas: &mut GasCounter,
    pending: &mut PendingWrites,
    logs: &mut Vec<LogRecord>,
    jump_dests: &[bool],
    ctx: &ExecutionContext,
    state: &dyn StateAccess,
) -> Result<StepOutcome, VmError> {
    let mut advance = true;

    match op {
        Opcode::Push(n) => {
            let start = *pc + 1;
            let end = (start + n as usize).min(code.len());
            let mut bytes = [0u8; 32];
            let slice = &code[start..end];
            bytes[32 - slice.len()..].copy_from_slice(slice);
            stack.push(U256::from_big_endian(&bytes))?;
        }
        Opcode::Pop => {
            stack.pop()?;
        }
        Opcode::Dup => stack.dup_top()?,
        Opcode::Swap => stack.swap_top_two()?,
        Opcode::Add => binary(stack, |a, b| a.overflowing_add(b).0)?,
        Opcode::Sub => binary(stack, |a, b| a.overflowing_sub(b).0)?,
        Opcode::Mul => binary(stack, |a, b| a.overflowing_mul(b).0)?,
        Opcode::Div => binary(stack, |a, b| if b.is_zero() { U256::zero() } else { a / b })?,
        Opcode::Mod => binary(stack, |a, b| if b.is_zero() { U256::zero() } else { a % b })?,
        Opcode::And => binary(stack, |a, b| a & b)?,
        Opcode::Or => binary(stack, |a, b| a | b)?,
        Opcode::Xor => binary(stack, |a, b| a ^ b)?,
        Opcode::Not => {
            let a = stack.pop()?;
            stack.push(!a)?;
        }
        Opcode::Eq => binary_bool(stack, |a, b| a == b)?,
        Opcode::Ne => binary_bool(stack, |a, b| a != b)?,
        Opcode::Lt => binary_bool(stack, |a, b| a < b)?,
        Opcode::Gt => binary_bool(stack, |a, b| a > b)?,
        Opcode::Le => binary_bool(stack, |a, b| a <= b)?,
        Opcode::Ge => binary_bool(stack, |a, b| a >= b)?,
        Opcode::Jump => {
            let target = stack.pop()?;
            jump(jump_dests, target, pc)?;
            advance = false;
        }
        Opcode::Jumpi => {
            let target = stack.pop()?;
            let cond = stack.pop()?;
            if !cond.is_zero() {
                jump(jump_dests, target, pc)?;
                advance = false;
            }
        }
        Opcode::Sload => {
            let key = StorageKey::from_u256(stack.pop()?);
            let value = pending.get(ctx.address, key, state);
            stack.push(value.to_u256())?;
        }
        Opcode::Sstore => {
            let key = StorageKey::from_u256(stack.pop()?);
            let value = StorageValue::from_u256(stack.pop()?);
            pending.set(ctx.address, key, value);
        }
        Opcode::Sha256 => {
            let len = stack.pop()?.as_usize().min(1 << 20);
            let offset = stack.pop()?.as_usize();
            let input = slice_input(&ctx.input, offset, len);
            let digest = precompiles::sha256(&input);
            stack.push(U256::from_big_endian(&digest))?;
        }
        Opcode::VerifySig => {
            // Stack (pop order): pubkey_offset, sig_offset, message_hash.
            // A 64-byte signature and 33-byte compressed pubkey don't fit a
            // single 256-bit word, so both are read from the input buffer by
            // offset — the same convention `SHA256`/`LOG` use.
            let pubkey_offset = stack.pop()?.as_usize();
            let sig_offset = stack.pop()?.as_usize();
            let message_hash = word_bytes(stack.pop()?);
            let sig_bytes = slice_input(&ctx.input, sig_offset, 64);
            let pubkey_bytes = slice_input(&ctx.input, pubkey_offset, 33);
            let ok = precompiles::verify_sig(&message_hash, &sig_bytes, &pubkey_bytes)
                .unwrap_or(false);
            stack.push(U256::from(u8::from(ok)))?;
        }
        Opcode::RecoverPubkey => {
            // Stack (pop order): recovery_id, sig_offset, message_hash.
            // ECRECOVER-style: pushes the signer's derived address (leftmost
            // 20 bytes of SHA256 of the recovered SEC1-compressed pubkey),
            // zero-padded to a word, or zero on recovery failure — a raw
            // 33-byte pubkey has the same can't-fit-a-word problem as above.
            let recid = stack.pop()?.low_u32() as u8;
            let sig_offset = stack.pop()?.as_usize();
            let message_hash = word_bytes(stack.pop()?);
            let sig_bytes = slice_input(&ctx.input, sig_offset, 64);
            match precompiles::recover_pubkey(&message_hash, &sig_bytes, recid) {
                Ok(pubkey) => {
                    let address_bytes = Hash::sha256(&pubkey);
                    let derived = Address::from_slice(&address_bytes.as_bytes()[..20])
                        .unwrap_or(Address::ZERO);
                    stack.push(address_to_u256(derived))?;
                }
                Err(_) => stack.push(U256::zero())?,
            }
        }
        Opcode::Address => stack.push(address_to_u256(ctx.address))?,
        Opcode::Balance => stack.push(state.get_balance(ctx.address))?,
        Opcode::Caller => stack.push(address_to_u256(ctx.caller))?,
        Opcode::CallValue => stack.push(ctx.call_value)?,
        Opcode::Timestamp => stack.push(U256::from(ctx.block.timestamp))?,
        Opcode::BlockHash => stack.push(U256::from_big_endian(ctx.block.hash.as_bytes()))?,
        Opcode::BlockHeight => stack.push(U256::from(ctx.block.height))?,
        Opcode::Gas => stack.push(U256::from(gas.remaining()))?,
        Opcode::Log => {
            let len = stack.pop()?.as_usize().min(1 << 20);
            let offset = stack.pop()?.as_usize();
            let data = Bytes::new(slice_input(&ctx.input, offset, len));
            logs.push(LogRecord {
                address: ctx.address,
                data,
            });
        }
        Opcode::Call => {
            // Stack (pop order): target, gas_forward, input_len, input_offset.
            // Value transfer is not modeled here: `StateAccess` exposes no
            // balance mutation, so a sub-call only forwards gas and input.
            let target = address_from_u256(stack.pop()?);
            let gas_forward = stack.pop()?.as_u64().min(gas.remaining());
            let input_len = stack.pop()?.as_usize().min(1 << 20);
            let input_offset = stack.pop()?.as_usize();

            let stack_snapshot = Snapshot {
                stack: stack.snapshot(),
                pending_writes: pending.writes.clone(),
            };
            let logs_len_before = logs.len();

            let code_bytes = state.get_code(target);
            let success = if code_bytes.is_empty() || !state.contract_exists(target) {
                false
            } else {
                let child_ctx = ExecutionContext {
                    address: target,
                    caller: ctx.address,
                    call_value: U256::zero(),
                    gas_limit: gas_forward,
                    input: Bytes::new(slice_input(&ctx.input, input_offset, input_len)),
                    block: ctx.block,
                    depth: ctx.depth + 1,
                };
                let mut child_gas = GasCounter::new(gas_forward);
                let child_result =
                    run_frame(code_bytes.as_slice(), &child_ctx, state, pending, &mut child_gas);
                gas.charge(child_gas.used());
                child_result.status.is_success()
            };

            if !success {
                stack.restore(stack_snapshot.stack);
                pending.writes = stack_snapshot.pending_writes;
                logs.truncate(logs_len_before);
            }
            stack.push(U256::from(u8::from(success)))?;
        }
        Opcode::Return => {
            let len = stack.pop()?.as_usize().min(1 << 20);
            let offset = stack.pop()?.as_usize();
            let buf = Bytes::new(slice_input(&ctx.input, offset, len));
            return Ok(StepOutcome::Return(buf));
        }
        Opcode::Stop => return Ok(StepOutcome::Stop),
        Opcode::Revert => {
            let len = stack.pop()?.as_usize().min(1 << 20);
            let offset = stack.pop()?.as_usize();
            let buf = Bytes::new(slice_input(&ctx.input, offset, len));
            return Ok(StepOutcome::Revert(buf));
        }
    }

    if advance {
        *pc += op.length();
    }
    Ok(StepOutcome::Continue)
}

fn binary(stack: &mut Stack, f: impl Fn(U256, U256) -> U256) -> Result<(), VmError> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    stack.push(f(a, b))
}

fn binary_bool(stack: &mut Stack, f: impl Fn(U256, U256) -> bool) -> Result<(), VmError> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    stack.push(U256::from(u8::from(f(a, b))))
}

fn jump(jump_dests: &[bool], target: U256, pc: &mut usize) -> Result<(), VmError> {
    let target = target.as_usize();
    if target >= jump_dests.len() || !jump_dests[target] {
        return Err(VmError::InvalidJump(target));
    }
    *pc = target;
    Ok(())
}

fn slice_input(input: &Bytes, offset: usize, len: usize) -> Vec<u8> {
    let bytes = input.as_slice();
    let mut out = vec![0u8; len];
    for (i, byte) in out.iter_mut().enumerate() {
        if let Some(&b) = bytes.get(offset + i) {
            *byte = b;
        }
    }
    out
}

fn word_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

fn address_to_u256(address: Address) -> U256 {
    let mut padded = [0u8; 32];
    padded[12..].copy_from_slice(address.as_bytes());
    U256::from_big_endian(&padded)
}

fn address_from_u256(value: U256) -> Address {
    let bytes = word_bytes(value);
    Address::from_slice(&bytes[12..]).unwrap_or(Address::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BlockOracle;
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    struct TestState {
        storage: RefCell<StdHashMap<(Address, StorageKey), StorageValue>>,
        code: StdHashMap<Address, Bytes>,
    }

    impl TestState {
        fn new() -> Self {
            Self {
                storage: RefCell::new(StdHashMap::new()),
                code: StdHashMap::new(),
            }
        }

        fn with_contract(mut self, address: Address, code: Vec<u8>) -> Self {
            self.code.insert(address, Bytes::new(code));
            self
        }
    }

    impl StateAccess for TestState {
        fn get_storage(&self, address: Address, key: StorageKey) -> StorageValue {
            self.storage
                .borrow()
                .get(&(address, key))
                .copied()
                .unwrap_or(StorageValue::ZERO)
        }
        fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
            self.storage.borrow_mut().insert((address, key), value);
        }
        fn get_code(&self, address: Address) -> Bytes {
            self.code.get(&address).cloned().unwrap_or_default()
        }
        fn contract_exists(&self, address: Address) -> bool {
            self.code.contains_key(&address)
        }
        fn get_balance(&self, _address: Address) -> U256 {
            U256::zero()
        }
    }

    fn ctx(gas_limit: u64) -> ExecutionContext {
        ExecutionContext {
            address: Address::new([1u8; 20]),
            caller: Address::new([2u8; 20]),
            call_value: U256::zero(),
            gas_limit,
            input: Bytes::default(),
            block: BlockOracle {
                height: 1,
                hash: Hash::ZERO,
                timestamp: 1_700_000_000,
            },
            depth: 0,
        }
    }

    /// S1: counter contract reaches 2 after two calls.
    #[test]
    fn s1_counter_contract() {
        // PUSH1 0x00, SLOAD, PUSH1 0x01, ADD, PUSH1 0x00, SSTORE, STOP
        let code = [0x60, 0x00, 0x54, 0x60, 0x01, 0x01, 0x60, 0x00, 0x55, 0x00];
        let state = TestState::new();
        let context = ctx(100_000);

        let first = execute(&code, &context, &state);
        assert!(first.result.status.is_success());
        assert_eq!(first.storage_writes.len(), 1);
        let (_, key, value) = first.storage_writes[0];
        assert_eq!(value.to_u256(), U256::from(1));

        // Apply the first call's write before running the second call.
        let mut state2 = TestState::new();
        state2.set_storage(context.address, key, value);
        let second = execute(&code, &context, &state2);
        assert!(second.result.status.is_success());
        let (_, _, value2) = second.storage_writes[0];
        assert_eq!(value2.to_u256(), U256::from(2));
    }

    /// S2: division by zero yields zero, not a fault; status is still STOPPED.
    #[test]
    fn s2_division_by_zero() {
        // PUSH1 5, PUSH1 0, DIV, PUSH1 0x00, PUSH1 0x00, SSTORE, STOP
        // (store the result so the test can observe the stack-top value).
        let code = [
            0x60, 0x05, 0x60, 0x00, 0x04, 0x60, 0x00, 0x55, 0x00,
        ];
        let state = TestState::new();
        let outcome = execute(&code, &ctx(100_000), &state);
        assert_eq!(outcome.result.status, Status::Stopped);
        assert_eq!(outcome.storage_writes[0].2.to_u256(), U256::zero());
    }

    /// S3: out-of-gas on an infinite jump loop leaves no storage effect.
    #[test]
    fn s3_out_of_gas_infinite_jump() {
        // Infinite loop: PUSH1 0x00, JUMP — jump target 0 is itself a valid
        // destination (the PUSH1 opcode byte).
        let code = [0x60, 0x00, 0x56];
        let state = TestState::new();
        let outcome = execute(&code, &ctx(100), &state);
        assert!(matches!(outcome.result.status, Status::Fault(_)));
        assert!(outcome.storage_writes.is_empty());
    }

    /// S4: a CALL that SSTOREs then REVERTs leaves storage unchanged, and the
    /// caller observes a failure (success=0 pushed by CALL).
    #[test]
    fn s4_snapshot_revert_discards_writes() {
        let callee_addr = Address::new([9u8; 20]);
        // Callee: PUSH1 1, PUSH1 0, SSTORE, PUSH1 0, PUSH1 0, REVERT
        let callee_code = vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xfd];
        // Caller: PUSH1 0 (input_offset), PUSH1 0 (input_len),
        // PUSH gas_forward(50000), PUSH <callee_addr>, CALL, STOP.
        let mut caller_code = vec![0x60, 0x00, 0x60, 0x00];
        caller_code.push(0x61); // PUSH2
        caller_code.extend_from_slice(&50_000u16.to_be_bytes());
        caller_code.push(0x7f); // PUSH32, address right-aligned in the word
        let mut padded = [0u8; 32];
        padded[12..].copy_from_slice(callee_addr.as_bytes());
        caller_code.extend_from_slice(&padded);
        caller_code.push(0xf1); // CALL
        caller_code.push(0x00); // STOP

        let state = TestState::new().with_contract(callee_addr, callee_code);
        let outcome = execute(&caller_code, &ctx(200_000), &state);
        assert!(outcome.result.status.is_success());
        assert!(outcome.storage_writes.is_empty());
    }

    #[test]
    fn validate_bytecode_rejects_oversize() {
        let oversized = vec![0x00u8; MAX_CODE_SIZE + 1];
        assert!(matches!(
            validate_bytecode(&oversized),
            Err(VmError::CodeSizeExceeded { .. })
        ));
    }

    #[test]
    fn validate_bytecode_rejects_invalid_opcode() {
        assert!(matches!(
            validate_bytecode(&[0xff]),
            Err(VmError::InvalidOpcode(0xff))
        ));
    }
}
