//! In-memory backend, used by tests and by any caller that doesn't need
//! durability. Grounded on `qc-11-smart-contracts`'s `InMemoryState` test
//! double, generalized from a hand-rolled hashmap-of-everything to the
//! generic [`KeyValueBackend`] surface so the same typed `Store` wrapper
//! works against either backend.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::backend::{BatchOp, KeyValueBackend};
use crate::errors::StoreError;

/// An in-memory, ordered key-value backend.
#[derive(Default)]
pub struct InMemoryBackend {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for InMemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut data = self.data.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_round_trip() {
        let backend = InMemoryBackend::new();
        backend.put(b"k", b"v").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
        backend.delete(b"k").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), None);
    }

    #[test]
    fn batch_is_applied_atomically_from_the_caller_s_perspective() {
        let backend = InMemoryBackend::new();
        backend
            .batch(vec![
                BatchOp::put(b"a".to_vec(), b"1".to_vec()),
                BatchOp::put(b"b".to_vec(), b"2".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(backend.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn prefix_scan_returns_only_matching_keys_in_order() {
        let backend = InMemoryBackend::new();
        backend.put(b"block:0001", b"a").unwrap();
        backend.put(b"block:0002", b"b").unwrap();
        backend.put(b"tx:0001", b"c").unwrap();
        let results = backend.iterate_prefix(b"block:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, b"block:0001");
    }
}
