//! Store accessor subsystem for configstore
//!
//! The metadata store is a flat, ordered key/value space. Everything above
//! this module (maintenance flag, entities, export, import) talks to it
//! through the [`StoreAccessor`] trait only.
//!
//! # Primitives
//!
//! - Point reads (`get`)
//! - Atomic single-key writes and deletes (`put`, `delete`)
//! - Ordered prefix scans, fetched in bounded batches (`ScanCursor`)
//!
//! # Backends
//!
//! - [`MemoryStore`]: `BTreeMap` behind a `RwLock`, used by tests and the
//!   `memory` backend
//! - [`FileStore`]: append-only, checksum-verified record log with an
//!   in-memory key index rebuilt on open
//!
//! Scans never hold the backend lock across batches, so a long export does
//! not starve concurrent readers or writers.

mod accessor;
mod checksum;
mod errors;
mod file;
mod memory;
mod record;

pub use accessor::{ScanCursor, StoreAccessor, DEFAULT_SCAN_BATCH};
pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::StoreRecord;
