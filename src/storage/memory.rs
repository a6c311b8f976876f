//! In-memory store backend

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use super::accessor::StoreAccessor;
use super::errors::{StoreError, StoreResult};

/// Ordered in-memory key/value store.
///
/// Not durable: contents are lost when the process exits. The maintenance
/// flag therefore resets to "not requested" on restart with this backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StoreAccessor for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::read("Lock poisoned").with_key(key))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::write("Lock poisoned").with_key(key))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::write("Lock poisoned").with_key(key))?;
        entries.remove(key);
        Ok(())
    }

    fn scan_batch(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::read("Lock poisoned"))?;

        let start = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Included(prefix),
        };

        Ok(entries
            .range::<str, _>((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.put("k", b"v1").unwrap();
        store.put("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v2".to_vec()));

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_scan_batch_respects_prefix_and_after() {
        let store = MemoryStore::new();
        store.put("a/1", b"").unwrap();
        store.put("a/2", b"").unwrap();
        store.put("a/3", b"").unwrap();
        store.put("b/1", b"").unwrap();

        let batch = store.scan_batch("a/", Some("a/1"), 10).unwrap();
        let keys: Vec<_> = batch.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a/2".to_string(), "a/3".to_string()]);
    }
}
