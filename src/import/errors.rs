//! Import errors

use thiserror::Error;

use crate::maintenance::Mode;
use crate::storage::StoreError;
use crate::stream::FrameError;

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Error)]
pub enum ImportError {
    /// A complete record failed to decode or broke ordering/referential rules.
    /// `position` is the zero-based frame index, the header being frame 0.
    #[error("malformed record {position} (byte {offset}): {reason}")]
    MalformedRecord {
        position: u64,
        offset: u64,
        reason: String,
    },

    /// Input ended before the END frame. `position` is the index of the
    /// frame that could not be read.
    #[error("truncated stream at record {position}: {reason}")]
    TruncatedStream { position: u64, reason: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("store already holds entity data; reset it first")]
    StoreNotEmpty,

    #[error("import requires maintenance mode (current: {mode})")]
    NotInMaintenance { mode: Mode },

    #[error("import cancelled")]
    Cancelled,
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MalformedRecord { .. } => "CS_MALFORMED_RECORD",
            ImportError::TruncatedStream { .. } => "CS_TRUNCATED_STREAM",
            ImportError::StoreUnavailable(_) => "CS_STORE_UNAVAILABLE",
            ImportError::StoreNotEmpty => "CS_STORE_NOT_EMPTY",
            ImportError::NotInMaintenance { .. } => "CS_NOT_IN_MAINTENANCE",
            ImportError::Cancelled => "CS_CANCELLED",
        }
    }

    pub(crate) fn from_frame(err: FrameError, position: u64) -> Self {
        match err {
            FrameError::Truncated { reason, .. } => ImportError::TruncatedStream {
                position,
                reason,
            },
            // A source that fails mid-transfer never delivered the END frame
            FrameError::Io { source, .. } => ImportError::TruncatedStream {
                position,
                reason: source.to_string(),
            },
            FrameError::Malformed { offset, reason } => ImportError::MalformedRecord {
                position,
                offset,
                reason,
            },
        }
    }
}
