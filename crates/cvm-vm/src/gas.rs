//! The fixed gas schedule (§6.3). Unlike a general EVM there is no
//! cold/warm access-list distinction and no quadratic memory-expansion cost —
//! every opcode has one static charge.

use crate::opcodes::Opcode;

/// Gas cost constants from §6.3.
pub mod costs {
    /// Cheapest class: `POP`, `PUSH`, `DUP`, `SWAP`, `GAS`, context opcodes.
    pub const BASE: u64 = 1;
    /// Stack/bitwise/comparison class.
    pub const VERY_LOW: u64 = 3;
    /// Arithmetic class.
    pub const LOW: u64 = 5;
    /// `JUMP`.
    pub const MID: u64 = 8;
    /// `JUMPI`.
    pub const HIGH: u64 = 10;
    /// `SLOAD`.
    pub const SLOAD: u64 = 200;
    /// `SSTORE`.
    pub const SSTORE: u64 = 5000;
    /// `SHA256`.
    pub const SHA256: u64 = 60;
    /// `VERIFY-SIG` / `recover-pubkey`.
    pub const VERIFY_SIG: u64 = 3000;
    /// `CALL`.
    pub const CALL: u64 = 700;
    /// `LOG`.
    pub const LOG: u64 = 375;
    /// `BALANCE`.
    pub const BALANCE: u64 = 400;

    /// Maximum gas a single transaction may spend.
    pub const PER_TX_CAP: u64 = 1_000_000;
    /// Maximum aggregate gas a single block may spend.
    pub const PER_BLOCK_CAP: u64 = 10_000_000;
}

/// Static gas cost for a decoded opcode, ignoring PUSH's immediate length
/// (PUSH is charged at the stack-class `VERY_LOW` rate regardless of operand
/// width, matching §6.3's flat schedule).
#[must_use]
pub fn static_cost(op: Opcode) -> u64 {
    use costs::*;
    match op {
        Opcode::Push(_) | Opcode::Pop | Opcode::Dup | Opcode::Swap => VERY_LOW,
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => LOW,
        Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Not => VERY_LOW,
        Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge => VERY_LOW,
        Opcode::Jump => MID,
        Opcode::Jumpi => HIGH,
        Opcode::Call => CALL,
        Opcode::Return | Opcode::Stop | Opcode::Revert => BASE,
        Opcode::Sload => SLOAD,
        Opcode::Sstore => SSTORE,
        Opcode::Sha256 => SHA256,
        Opcode::VerifySig | Opcode::RecoverPubkey => VERIFY_SIG,
        Opcode::Address
        | Opcode::Caller
        | Opcode::CallValue
        | Opcode::Timestamp
        | Opcode::BlockHash
        | Opcode::BlockHeight
        | Opcode::Gas => BASE,
        Opcode::Balance => BALANCE,
        Opcode::Log => LOG,
    }
}

/// A simple up/down gas counter; no refund mechanism exists in this schedule
/// (unlike EIP-3529-style EVM refunds — the spec's gas model is flat).
#[derive(Clone, Copy, Debug)]
pub struct GasCounter {
    limit: u64,
    remaining: u64,
}

impl GasCounter {
    /// Start a counter with `limit` gas available.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    /// Gas spent so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Gas left.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Attempt to charge `amount`; returns `false` (without mutating state)
    /// if insufficient gas remains.
    #[must_use]
    pub fn charge(&mut self, amount: u64) -> bool {
        if amount > self.remaining {
            return false;
        }
        self.remaining -= amount;
        true
    }
}
