//! Execution context and result types.

use crate::ports::BlockOracle;
use cvm_types::{Address, Bytes, U256};

/// Per-call context, supplied by the block processor before execution
/// (§4.1 "Context").
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// The contract executing (`ADDRESS`).
    pub address: Address,
    /// The immediate caller for this call frame (`CALLER`).
    pub caller: Address,
    /// Value attached to this call (`CALLVALUE`).
    pub call_value: U256,
    /// Gas made available to this call.
    pub gas_limit: u64,
    /// Input buffer.
    pub input: Bytes,
    /// Block-level constants.
    pub block: BlockOracle,
    /// Current nested-call depth (0 for a top-level call).
    pub depth: u16,
}

/// Maximum nested `CALL` depth.
pub const MAX_CALL_DEPTH: u16 = 1024;

/// Terminal status of a completed call (§4.1 "Terminal states").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Clean halt (`STOP`), no return buffer.
    Stopped,
    /// Halt with a caller-visible return buffer (`RETURN`).
    Returned,
    /// State undone to the most recent snapshot (`REVERT`).
    Reverted,
    /// One of the fault family; `reason` is the `VmError`'s display string.
    Fault(String),
}

impl Status {
    /// Only `Stopped`/`Returned` count as success per §4.1.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Stopped | Status::Returned)
    }
}

/// A single `LOG` record emitted during execution.
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// The emitting contract.
    pub address: Address,
    /// Opaque log data (topic/data split is left to the caller's ABI).
    pub data: Bytes,
}

/// The outcome of running the interpreter to completion.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// Terminal status.
    pub status: Status,
    /// Return/revert buffer, if any.
    pub output: Bytes,
    /// Gas actually consumed.
    pub gas_used: u64,
    /// Logs emitted before the terminal state was reached. Discarded by the
    /// caller if `status` is not a success.
    pub logs: Vec<LogRecord>,
}

impl ExecutionResult {
    /// Convenience constructor for a clean `STOP`.
    #[must_use]
    pub fn stopped(gas_used: u64, logs: Vec<LogRecord>) -> Self {
        Self {
            status: Status::Stopped,
            output: Bytes::default(),
            gas_used,
            logs,
        }
    }

    /// Convenience constructor for `RETURN`.
    #[must_use]
    pub fn returned(output: Bytes, gas_used: u64, logs: Vec<LogRecord>) -> Self {
        Self {
            status: Status::Returned,
            output,
            gas_used,
            logs,
        }
    }

    /// Convenience constructor for `REVERT`; logs are dropped because a
    /// revert undoes everything back to the last snapshot.
    #[must_use]
    pub fn reverted(reason: Bytes, gas_used: u64) -> Self {
        Self {
            status: Status::Reverted,
            output: reason,
            gas_used,
            logs: Vec::new(),
        }
    }

    /// Convenience constructor for a fault halt.
    #[must_use]
    pub fn fault(message: String, gas_used: u64) -> Self {
        Self {
            status: Status::Fault(message),
            output: Bytes::default(),
            gas_used,
            logs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stop_and_return_are_success() {
        assert!(Status::Stopped.is_success());
        assert!(Status::Returned.is_success());
        assert!(!Status::Reverted.is_success());
        assert!(!Status::Fault("x".into()).is_success());
    }
}
