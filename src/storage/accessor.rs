//! The store accessor contract and its batched scan cursor

use std::collections::VecDeque;

use super::errors::StoreResult;

/// Number of entries a [`ScanCursor`] fetches per backend call.
pub const DEFAULT_SCAN_BATCH: usize = 128;

/// Read/iterate/write primitives over the metadata store.
///
/// Implementations must be safe to share across request handlers. Each
/// method is atomic on its own; there is no multi-key transaction.
pub trait StoreAccessor: Send + Sync {
    /// Point read. `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomic single-key write (insert or overwrite).
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Atomic single-key delete. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Returns at most `limit` entries whose key starts with `prefix`, in
    /// ascending key order, starting strictly after `after` when given.
    ///
    /// This is the only scan primitive backends implement; [`ScanCursor`]
    /// turns it into an ordered iterator without holding any lock between
    /// batches.
    fn scan_batch(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<(String, Vec<u8>)>>;
}

/// Ordered iterator over every key under a prefix.
///
/// Entries are fetched lazily in batches. After the first error the cursor
/// yields that error once and then ends.
pub struct ScanCursor<'a> {
    store: &'a dyn StoreAccessor,
    prefix: String,
    batch_size: usize,
    buffer: VecDeque<(String, Vec<u8>)>,
    last_key: Option<String>,
    done: bool,
}

impl<'a> ScanCursor<'a> {
    /// Open a cursor over `prefix` with the default batch size
    pub fn new(store: &'a dyn StoreAccessor, prefix: impl Into<String>) -> Self {
        Self::with_batch_size(store, prefix, DEFAULT_SCAN_BATCH)
    }

    pub fn with_batch_size(
        store: &'a dyn StoreAccessor,
        prefix: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            last_key: None,
            done: false,
        }
    }

    fn refill(&mut self) -> StoreResult<()> {
        let batch = self
            .store
            .scan_batch(&self.prefix, self.last_key.as_deref(), self.batch_size)?;

        if batch.len() < self.batch_size {
            self.done = true;
        }
        if let Some((key, _)) = batch.last() {
            self.last_key = Some(key.clone());
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

impl Iterator for ScanCursor<'_> {
    type Item = StoreResult<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            if let Err(e) = self.refill() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
