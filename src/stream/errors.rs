//! Frame reading errors

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    /// Input ended in the middle of a frame
    #[error("stream truncated at byte {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    /// A complete frame failed its checksum or could not be parsed
    #[error("malformed frame at byte {offset}: {reason}")]
    Malformed { offset: u64, reason: String },

    /// The source failed before the input was complete
    #[error("stream read failed at byte {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl FrameError {
    pub fn offset(&self) -> u64 {
        match self {
            FrameError::Truncated { offset, .. }
            | FrameError::Malformed { offset, .. }
            | FrameError::Io { offset, .. } => *offset,
        }
    }
}
