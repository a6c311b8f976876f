//! Frame reader for dump streams
//!
//! Reads one frame at a time and verifies its checksum. The running SHA-256
//! covers every frame before END so the caller can compare it against the
//! digest END carries.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

use super::errors::FrameError;
use super::frame::{Frame, DIGEST_LEN, FRAME_CRC_LEN, FRAME_END, FRAME_PREFIX_LEN, MAX_BODY_LEN};
use crate::storage::verify_checksum;

pub struct FrameReader<R: Read> {
    source: R,
    hasher: Sha256,
    offset: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            hasher: Sha256::new(),
            offset: 0,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Digest of every non-END frame read so far
    pub fn digest(&self) -> [u8; DIGEST_LEN] {
        self.hasher.clone().finalize().into()
    }

    /// Fill `buf` as far as the source allows; returns the bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(FrameError::Io {
                        offset: self.offset + filled as u64,
                        source,
                    })
                }
            }
        }
        Ok(filled)
    }

    fn fill_exact(&mut self, buf: &mut [u8], start: u64, what: &str) -> Result<(), FrameError> {
        let n = self.fill(buf)?;
        if n < buf.len() {
            return Err(FrameError::Truncated {
                offset: start,
                reason: format!("input ended inside {}", what),
            });
        }
        Ok(())
    }

    /// Read the next frame. `Ok(None)` means clean end of input on a frame
    /// boundary.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let start = self.offset;

        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        let n = self.fill(&mut prefix)?;
        if n == 0 {
            return Ok(None);
        }
        if n < FRAME_PREFIX_LEN {
            return Err(FrameError::Truncated {
                offset: start,
                reason: "input ended inside frame prefix".to_string(),
            });
        }

        let frame_type = prefix[0];
        let body_len = u32::from_le_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(FrameError::Malformed {
                offset: start,
                reason: format!("frame body of {} bytes exceeds limit", body_len),
            });
        }

        let mut rest = vec![0u8; body_len + FRAME_CRC_LEN];
        self.fill_exact(&mut rest, start, "frame body")?;

        let mut raw = Vec::with_capacity(FRAME_PREFIX_LEN + rest.len());
        raw.extend_from_slice(&prefix);
        raw.extend_from_slice(&rest);

        let checked_len = FRAME_PREFIX_LEN + body_len;
        let stored_crc = u32::from_le_bytes([
            raw[checked_len],
            raw[checked_len + 1],
            raw[checked_len + 2],
            raw[checked_len + 3],
        ]);
        if !verify_checksum(&raw[..checked_len], stored_crc) {
            return Err(FrameError::Malformed {
                offset: start,
                reason: "frame checksum mismatch".to_string(),
            });
        }

        let frame = Frame::decode_body(frame_type, &raw[FRAME_PREFIX_LEN..checked_len])
            .map_err(|reason| FrameError::Malformed {
                offset: start,
                reason,
            })?;

        if frame_type != FRAME_END {
            self.hasher.update(&raw);
        }
        self.offset += raw.len() as u64;
        Ok(Some(frame))
    }

    /// Succeeds only if the source has no bytes left.
    pub fn expect_eof(&mut self) -> Result<(), FrameError> {
        let mut probe = [0u8; 1];
        if self.fill(&mut probe)? != 0 {
            return Err(FrameError::Malformed {
                offset: self.offset,
                reason: "trailing data after end frame".to_string(),
            });
        }
        Ok(())
    }
}
