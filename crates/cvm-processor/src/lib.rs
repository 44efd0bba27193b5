//! # cvm-processor — block processor, handler dispatch, core context
//!
//! Sits between chain sync and the lower `cvm-*` layers: given a block's
//! already-resolved transactions (sender identity, outputs, witness-resolved
//! DEPLOY bytecode), dispatch each one's on-chain payload to the handler for
//! its type, apply or skip per §7's soft-failure rules, and hand back undo
//! steps a disconnect can replay.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Config | `config.rs` | Tunables handed down from `cvm-node` |
//! | Context | `context.rs` | Store handle + config, passed to every handler |
//! | Types | `types.rs` | Block I/O types and the undo-log enum |
//! | Handlers | `handlers/` | One module per payload kind |
//! | Block | `block.rs` | Transaction-order dispatch, claim gate, undo replay |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod block;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod types;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::block::{connect_block, disconnect_block};
    pub use crate::config::ProcessorConfig;
    pub use crate::context::CoreContext;
    pub use crate::errors::ProcessorError;
    pub use crate::types::{
        BlockHeader, BlockTransaction, ConnectedBlock, HandlerOutcome, ProcessedTx, UndoOp,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use cvm_store::memory::InMemoryBackend;
    use cvm_store::store::Store;

    #[test]
    fn prelude_exports_compile() {
        let ctx = CoreContext::new(Store::new(InMemoryBackend::new()), ProcessorConfig::default());
        let header = BlockHeader {
            height: 0,
            hash: cvm_types::Hash::ZERO,
            timestamp: 0,
        };
        let connected = connect_block(&ctx, &header, &[]).unwrap();
        disconnect_block(&ctx, &connected).unwrap();
    }
}
