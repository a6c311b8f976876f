//! Append-only file store backend
//!
//! Layout: `<data_dir>/data/store.dat`, a sequence of [`StoreRecord`]s.
//!
//! - Every put or delete appends one record and fsyncs before returning
//! - Deletes append a tombstone; nothing is rewritten in place
//! - Latest record for a key wins
//! - The key index (`key -> offset of latest live record`) is built by
//!   replaying the log, and caught up with any records appended since the
//!   last operation before every read or write. Several handles, in this
//!   process or another one, may share the same data directory.
//! - A failed append is cut back off the log before the error is returned
//! - Every read verifies the record checksum; a mismatch is corruption

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::accessor::StoreAccessor;
use super::errors::{StoreError, StoreResult};
use super::record::{StoreRecord, MIN_RECORD_SIZE};

/// Durable key/value store backed by a single append-only log file.
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<FileStoreInner>,
}

struct FileStoreInner {
    writer: File,
    reader: File,
    /// End of the replayed portion of the log
    offset: u64,
    index: BTreeMap<String, u64>,
}

impl FileStore {
    /// Opens or creates the store under `data_dir`.
    ///
    /// Creates `<data_dir>/data/store.dat` and parent directories if needed.
    ///
    /// # Errors
    ///
    /// - `CS_STORE_WRITE_FAILED` if the file cannot be created
    /// - `CS_STORE_DATA_CORRUPTION` if any existing record fails validation
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let data_subdir = data_dir.join("data");
        let path = data_subdir.join("store.dat");

        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StoreError::write(format!("Failed to create data directory: {}", data_subdir.display()))
                    .caused_by(e)
            })?;
        }

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StoreError::write(format!("Failed to open store file: {}", path.display())).caused_by(e)
            })?;

        let reader = File::open(&path).map_err(|e| {
            StoreError::read(format!("Failed to open store file: {}", path.display())).caused_by(e)
        })?;

        let mut inner = FileStoreInner {
            writer,
            reader,
            offset: 0,
            index: BTreeMap::new(),
        };
        inner.catch_up()?;

        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Returns the path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        self.lock().map(|inner| inner.index.len()).unwrap_or(0)
    }

    /// Locks the handle state and replays records other handles appended.
    fn lock(&self) -> StoreResult<MutexGuard<'_, FileStoreInner>> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::read("Lock poisoned"))?;
        inner.catch_up()?;
        Ok(inner)
    }
}

impl FileStoreInner {
    fn log_len(&self) -> StoreResult<u64> {
        Ok(self
            .writer
            .metadata()
            .map_err(|e| StoreError::read("Failed to read file metadata").caused_by(e))?
            .len())
    }

    /// Replays every record between `offset` and the current end of the log.
    fn catch_up(&mut self) -> StoreResult<()> {
        let end = self.log_len()?;
        if end < self.offset {
            return Err(StoreError::corruption(format!(
                "Store log shrank from {} to {} bytes",
                self.offset, end
            ))
            .at_offset(end));
        }
        if end == self.offset {
            return Ok(());
        }

        self.reader.seek(SeekFrom::Start(self.offset)).map_err(|e| {
            StoreError::read(format!("Failed to seek to offset {}", self.offset)).caused_by(e)
        })?;
        let mut reader = BufReader::new(&mut self.reader);
        let mut offset = self.offset;

        while offset < end {
            let (record, len) = read_record(&mut reader, offset, end - offset)?;
            if record.is_tombstone {
                self.index.remove(&record.key);
            } else {
                self.index.insert(record.key, offset);
            }
            offset += len;
        }

        self.offset = offset;
        Ok(())
    }

    /// Appends and fsyncs one record, then indexes it. A record that could
    /// not be written or synced is cut off the log again.
    fn append(&mut self, record: &StoreRecord) -> StoreResult<()> {
        let bytes = record.serialize();

        let written = self
            .writer
            .write_all(&bytes)
            .map_err(|e| StoreError::write("Failed to append record").caused_by(e))
            .and_then(|_| {
                self.writer
                    .sync_all()
                    .map_err(|e| StoreError::write("fsync failed after append").caused_by(e))
            });

        if let Err(e) = written {
            self.discard_tail();
            return Err(e.with_key(&record.key));
        }

        self.catch_up()
    }

    /// Drops any bytes past the replayed end of the log.
    fn discard_tail(&mut self) {
        if self.writer.set_len(self.offset).is_ok() {
            let _ = self.writer.sync_all();
        }
    }

    fn read_value_at(&mut self, offset: u64) -> StoreResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset)).map_err(|e| {
            StoreError::read(format!("Failed to seek to offset {}", offset)).caused_by(e)
        })?;
        let remaining = self.offset.saturating_sub(offset);
        let (record, _) = read_record(&mut self.reader, offset, remaining)?;
        if record.is_tombstone {
            return Err(StoreError::corruption("Index points at a tombstone").at_offset(offset));
        }
        Ok(record.value)
    }
}

/// Reads one record at the current position. `remaining` is the number of
/// bytes left in the log from `offset`.
fn read_record<R: Read>(reader: &mut R, offset: u64, remaining: u64) -> StoreResult<(StoreRecord, u64)> {
    if remaining < MIN_RECORD_SIZE as u64 {
        return Err(StoreError::corruption(format!(
            "Truncated store log: {} bytes remaining, minimum record size is {}",
            remaining, MIN_RECORD_SIZE
        ))
        .at_offset(offset));
    }

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).map_err(|e| {
        StoreError::corruption(format!("Failed to read record length: {}", e)).at_offset(offset)
    })?;
    let record_length = u32::from_le_bytes(len_buf) as u64;

    if record_length < MIN_RECORD_SIZE as u64 || record_length > remaining {
        return Err(StoreError::corruption(format!(
            "Invalid record length {} ({} bytes remaining)",
            record_length, remaining
        ))
        .at_offset(offset));
    }

    let mut buf = vec![0u8; record_length as usize];
    buf[0..4].copy_from_slice(&len_buf);
    reader.read_exact(&mut buf[4..]).map_err(|e| {
        StoreError::corruption(format!("Failed to read record body: {}", e)).at_offset(offset)
    })?;

    let (record, consumed) = StoreRecord::deserialize(&buf)
        .map_err(|e| StoreError::corruption(e.to_string()).at_offset(offset))?;

    Ok((record, consumed as u64))
}

impl StoreAccessor for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut inner = self.lock()?;
        match inner.index.get(key).copied() {
            Some(offset) => inner.read_value_at(offset).map(Some).map_err(|e| e.with_key(key)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.append(&StoreRecord::put(key, value.to_vec()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.index.contains_key(key) {
            return Ok(());
        }
        inner.append(&StoreRecord::tombstone(key))
    }

    fn scan_batch(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let mut inner = self.lock()?;

        let start = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Included(prefix),
        };

        let located: Vec<(String, u64)> = inner
            .index
            .range::<str, _>((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, offset)| (key.clone(), *offset))
            .collect();

        let mut batch = Vec::with_capacity(located.len());
        for (key, offset) in located {
            let value = inner.read_value_at(offset).map_err(|e| e.with_key(&key))?;
            batch.push((key, value));
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp.path()).unwrap();
            store.put("maintenance/requested", b"true").unwrap();
            store.put("entity/user/u1", b"{}").unwrap();
            store.delete("entity/user/u1").unwrap();
        }

        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(
            store.get("maintenance/requested").unwrap(),
            Some(b"true".to_vec())
        );
        assert_eq!(store.get("entity/user/u1").unwrap(), None);
        assert_eq!(store.key_count(), 1);
    }

    #[test]
    fn test_latest_write_wins() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.put("k", b"1").unwrap();
        store.put("k", b"2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_delete_missing_key_appends_nothing() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.delete("absent").unwrap();
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_scan_batch_reads_values() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.put("order/user/2", b"b").unwrap();
        store.put("order/user/1", b"a").unwrap();
        store.put("other", b"z").unwrap();

        let batch = store.scan_batch("order/user/", None, 10).unwrap();
        assert_eq!(
            batch,
            vec![
                ("order/user/1".to_string(), b"a".to_vec()),
                ("order/user/2".to_string(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_handles_see_each_others_appends() {
        let temp = TempDir::new().unwrap();
        let server = FileStore::open(temp.path()).unwrap();
        let offline = FileStore::open(temp.path()).unwrap();

        server.put("entity/user/u1", b"{}").unwrap();
        offline.put("maintenance/requested", b"true").unwrap();
        server.put("entity/user/u2", b"{}").unwrap();
        offline.delete("entity/user/u1").unwrap();

        for store in [&server, &offline] {
            assert_eq!(
                store.get("maintenance/requested").unwrap(),
                Some(b"true".to_vec())
            );
            assert_eq!(store.get("entity/user/u1").unwrap(), None);
            assert_eq!(store.get("entity/user/u2").unwrap(), Some(b"{}".to_vec()));
            assert_eq!(store.key_count(), 2);
        }

        drop((server, offline));
        let reopened = FileStore::open(temp.path()).unwrap();
        assert_eq!(reopened.key_count(), 2);
    }

    #[test]
    fn test_torn_append_is_discarded() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.put("a", b"1").unwrap();
        let clean_len = fs::metadata(store.path()).unwrap().len();

        {
            let mut inner = store.inner.lock().unwrap();
            let bytes = StoreRecord::put("b", b"2".to_vec()).serialize();
            inner.writer.write_all(&bytes[..bytes.len() / 2]).unwrap();
            inner.discard_tail();
        }
        assert_eq!(fs::metadata(store.path()).unwrap().len(), clean_len);

        store.put("c", b"3").unwrap();
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("c").unwrap(), Some(b"3".to_vec()));

        let reopened = FileStore::open(temp.path()).unwrap();
        assert_eq!(reopened.key_count(), 2);
    }

    #[test]
    fn test_shrunk_log_is_corruption() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.put("a", b"1").unwrap();

        OpenOptions::new()
            .write(true)
            .open(store.path())
            .unwrap()
            .set_len(0)
            .unwrap();

        let err = store.get("a").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::DataCorruption);
    }
}
