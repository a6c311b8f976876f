//! Maintenance coordination errors

use thiserror::Error;

use crate::storage::StoreError;

use super::mode::Mode;

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// An ordinary write arrived while the process was not in Normal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("write rejected: process is in {mode} mode")]
pub struct WriteRejected {
    pub mode: Mode,
}

impl WriteRejected {
    pub fn code(&self) -> &'static str {
        "CS_WRITE_REJECTED"
    }
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// The flag could not be read or persisted
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    WriteRejected(#[from] WriteRejected),
}

impl MaintenanceError {
    pub fn code(&self) -> &'static str {
        match self {
            MaintenanceError::StoreUnavailable(_) => "CS_STORE_UNAVAILABLE",
            MaintenanceError::WriteRejected(e) => e.code(),
        }
    }
}
