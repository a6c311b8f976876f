//! Frame writer for dump streams

use std::io::{self, Write};

use sha2::{Digest, Sha256};

use super::frame::{Frame, DIGEST_LEN, FORMAT_VERSION};

/// Totals recorded in the END frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTrailer {
    pub entity_count: u64,
    pub digest: [u8; DIGEST_LEN],
    /// Total bytes written, END frame included
    pub bytes: u64,
}

impl StreamTrailer {
    pub fn digest_hex(&self) -> String {
        hex(&self.digest)
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Writes HEADER on creation, ENTITY frames on demand, END on `finish`.
///
/// Each frame goes to the sink with a single `write_all` so a failure never
/// leaves a frame half-accounted in the digest.
pub struct StreamWriter<W: Write> {
    sink: W,
    hasher: Sha256,
    entity_count: u64,
    bytes: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W) -> io::Result<Self> {
        let mut writer = Self {
            sink,
            hasher: Sha256::new(),
            entity_count: 0,
            bytes: 0,
        };
        writer.write_frame(&Frame::Header {
            version: FORMAT_VERSION,
        })?;
        Ok(writer)
    }

    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let bytes = frame.encode();
        self.sink.write_all(&bytes)?;
        if !matches!(frame, Frame::End { .. }) {
            self.hasher.update(&bytes);
        }
        self.bytes += bytes.len() as u64;
        Ok(())
    }

    pub fn write_entity(&mut self, tag: &str, payload: &[u8]) -> io::Result<()> {
        self.write_frame(&Frame::Entity {
            tag: tag.to_string(),
            payload: payload.to_vec(),
        })?;
        self.entity_count += 1;
        Ok(())
    }

    pub fn entity_count(&self) -> u64 {
        self.entity_count
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Write the END frame and flush the sink.
    pub fn finish(mut self) -> io::Result<StreamTrailer> {
        let digest: [u8; DIGEST_LEN] = self.hasher.clone().finalize().into();
        self.write_frame(&Frame::End {
            entity_count: self.entity_count,
            digest,
        })?;
        self.sink.flush()?;
        Ok(StreamTrailer {
            entity_count: self.entity_count,
            digest,
            bytes: self.bytes,
        })
    }
}
