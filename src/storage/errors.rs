//! Store errors
//!
//! | code                       | meaning                                  |
//! |----------------------------|------------------------------------------|
//! | `CS_STORE_READ_FAILED`     | point read or scan failed                |
//! | `CS_STORE_WRITE_FAILED`    | put or delete was not made durable       |
//! | `CS_STORE_DATA_CORRUPTION` | the log or a stored value fails to parse |
//!
//! Upper layers report all three as "store unavailable". Corruption is the
//! only fatal one: the store must not keep serving from that log.

use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    ReadFailed,
    WriteFailed,
    DataCorruption,
}

impl StoreErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::ReadFailed => "CS_STORE_READ_FAILED",
            StoreErrorCode::WriteFailed => "CS_STORE_WRITE_FAILED",
            StoreErrorCode::DataCorruption => "CS_STORE_DATA_CORRUPTION",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreErrorCode::DataCorruption)
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failed store operation, with the offset and key it concerned when known.
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    offset: Option<u64>,
    key: Option<String>,
    cause: Option<io::Error>,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset: None,
            key: None,
            cause: None,
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::ReadFailed, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::WriteFailed, message)
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::DataCorruption, message)
    }

    pub fn caused_by(mut self, cause: io::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Byte offset into the log where the failure was detected.
    pub fn at_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " at byte {}", offset)?;
        }
        if let Some(key) = &self.key {
            write!(f, " for key {}", key)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StoreError::corruption("checksum mismatch").is_fatal());
        assert!(!StoreError::read("lock poisoned").is_fatal());
        assert!(!StoreError::write("append failed")
            .caused_by(io::Error::new(io::ErrorKind::Other, "disk full"))
            .is_fatal());
    }

    #[test]
    fn test_display_carries_location() {
        let err = StoreError::corruption("checksum mismatch")
            .at_offset(512)
            .with_key("meta/next_seq");
        assert_eq!(
            err.to_string(),
            "CS_STORE_DATA_CORRUPTION: checksum mismatch at byte 512 for key meta/next_seq"
        );
    }

    #[test]
    fn test_io_cause_is_source() {
        let err = StoreError::write("append failed")
            .caused_by(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.source().is_some());
        assert!(err.to_string().ends_with("(disk full)"));
    }
}
