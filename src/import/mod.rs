//! Bulk import of a dump stream into an empty (or reset) store
//!
//! Import trusts nothing about its input: every frame is checksummed, every
//! record validated against what the stream delivered before it, and the
//! END frame's count and digest are checked before the import reports
//! success. Input that stops before END is reported as truncated, distinct
//! from a complete record that fails validation.

mod cursor;
mod errors;
mod importer;

pub use cursor::ImportCursor;
pub use errors::{ImportError, ImportResult};
pub use importer::{import_from, ImportOptions, ImportSummary, Importer};
