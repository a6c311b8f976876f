//! Bulk export of all entity data as a single dump stream
//!
//! Export is a read-only walk of the store. It does not check the mode
//! itself; callers decide whether a non-quiescent export is acceptable.

mod errors;
mod exporter;

pub use errors::{ExportError, ExportResult, StreamAborted};
pub use exporter::{export_to, ExportSummary};
