//! Logging and context wiring, split out of `main` so integration tests can
//! reuse it against a temporary data directory.

use cvm_processor::prelude::CoreContext;
use cvm_store::rocksdb_backend::RocksDbBackend;
use cvm_store::store::Store;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::config::CoreConfig;

/// Install a process-wide `tracing` subscriber at `INFO`.
pub fn init_logging() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Open the RocksDB-backed store at `config.store.data_dir` and assemble a
/// [`CoreContext`] ready to process blocks.
pub fn open_core(config: &CoreConfig) -> anyhow::Result<CoreContext<RocksDbBackend>> {
    info!(path = %config.store.data_dir.display(), "opening cvm store");
    let backend = RocksDbBackend::open(config.store.to_rocksdb_config())?;
    let store = Store::new(backend);
    Ok(CoreContext::new(store, config.to_processor_config()))
}
