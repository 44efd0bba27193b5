//! The block processor's "core context" (§9 "Global singletons" redesign
//! flag): one value holding the store handle and processor configuration,
//! constructed once at node start-up and passed by reference into every
//! handler call, rather than reached for through process-wide statics.

use cvm_store::backend::KeyValueBackend;
use cvm_store::store::Store;

use crate::config::ProcessorConfig;

/// Everything a handler needs: the store and the resolved configuration.
/// Cheap to construct, cheap to drop — there is deliberately no
/// initialization order to get right beyond "build the store, then build
/// this."
pub struct CoreContext<B: KeyValueBackend> {
    /// The persistent store.
    pub store: Store<B>,
    /// Resolved processor configuration.
    pub config: ProcessorConfig,
}

impl<B: KeyValueBackend> CoreContext<B> {
    /// Wrap a store and configuration into one handle.
    pub fn new(store: Store<B>, config: ProcessorConfig) -> Self {
        Self { store, config }
    }
}
