//! Export errors

use std::io;

use thiserror::Error;

use crate::entity::EntityError;
use crate::storage::StoreError;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Stored entity data disagrees with its own index
    #[error("inconsistent store at {key}: {reason}")]
    Inconsistent { key: String, reason: String },

    /// The consumer stopped accepting bytes
    #[error("export sink failed: {0}")]
    Sink(#[source] io::Error),

    #[error("export cancelled")]
    Cancelled,
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::StoreUnavailable(_) => "CS_STORE_UNAVAILABLE",
            ExportError::Inconsistent { .. } => "CS_STORE_INCONSISTENT",
            ExportError::Sink(_) => "CS_SINK_FAILED",
            ExportError::Cancelled => "CS_CANCELLED",
        }
    }
}

impl From<EntityError> for ExportError {
    fn from(err: EntityError) -> Self {
        match err {
            EntityError::Store(e) => ExportError::StoreUnavailable(e),
            EntityError::Corrupt { key, reason } => ExportError::Inconsistent { key, reason },
            other => ExportError::Inconsistent {
                key: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Export failed after the response started; the transport must be torn
/// down so the consumer sees an incomplete stream, never a clean end.
#[derive(Debug, Error)]
#[error("stream aborted: {cause}")]
pub struct StreamAborted {
    #[source]
    pub cause: ExportError,
}

impl StreamAborted {
    pub fn code(&self) -> &'static str {
        "CS_STREAM_ABORTED"
    }
}

impl From<ExportError> for StreamAborted {
    fn from(cause: ExportError) -> Self {
        Self { cause }
    }
}
