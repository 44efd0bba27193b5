//! Production RocksDB backend. Grounded directly on
//! `node-runtime::adapters::storage::rocksdb_adapter::RocksDbStore`: same
//! tuning knobs, same atomic-batch-via-`WriteBatch` approach, same
//! forward-iterator-with-manual-`starts_with`-break prefix scan. The column
//! family split that adapter used for subsystem isolation isn't needed here
//! — this core has one coherent key space already partitioned by the
//! fixed-prefix-byte scheme in `keys.rs` — so this uses the default column
//! family only.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use crate::backend::{BatchOp, KeyValueBackend};
use crate::errors::StoreError;

/// Tuning knobs for the RocksDB backend.
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Directory the database lives in.
    pub path: String,
    /// Block cache size in bytes.
    pub block_cache_size: usize,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Number of write buffers held in memory before flush.
    pub max_write_buffer_number: i32,
    /// fsync after every write; durability vs. throughput trade-off.
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/cvm-store".to_string(),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no sync — for test fixtures.
    #[must_use]
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed [`KeyValueBackend`].
pub struct RocksDbBackend {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbBackend {
    /// Open or create the database at `config.path`.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| StoreError::Backend(format!("failed to open RocksDB: {e}")))?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
        })
    }

    /// Open with default tuning at `path`.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }
}

impl KeyValueBackend for RocksDbBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .read()
            .get(key)
            .map_err(|e| StoreError::Backend(format!("get failed: {e}")))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .write()
            .put_opt(key, value, &write_opts)
            .map_err(|e| StoreError::Backend(format!("put failed: {e}")))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .write()
            .delete(key)
            .map_err(|e| StoreError::Backend(format!("delete failed: {e}")))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.db
            .read()
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| StoreError::Backend(format!("exists check failed: {e}")))
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.put(&key, &value),
                BatchOp::Delete { key } => batch.delete(&key),
            }
        }
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .write()
            .write_opt(batch, &write_opts)
            .map_err(|e| StoreError::Backend(format!("batch write failed: {e}")))
    }

    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let db = self.db.read();
        let mut results = Vec::new();
        let iter = db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) =
                item.map_err(|e| StoreError::Backend(format!("scan failed: {e}")))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}
