//! Dump frame layout
//!
//! ```text
//! ┌──────────┬──────────────┬────────────────┬──────────────┐
//! │ type: u8 │ body_len: u32│ body           │ crc32: u32   │
//! └──────────┴──────────────┴────────────────┴──────────────┘
//! ```
//!
//! Integers are little-endian. The checksum covers the type byte, the
//! length and the body.
//!
//! Bodies:
//! - HEADER: magic `CSDUMP` + format version (u16)
//! - ENTITY: tag_len (u16) + kind tag + entity JSON
//! - END: entity count (u64) + SHA-256 of every byte before the END frame

use crate::storage::compute_checksum;

pub const MAGIC: &[u8; 6] = b"CSDUMP";
pub const FORMAT_VERSION: u16 = 1;

pub const FRAME_HEADER: u8 = 0x01;
pub const FRAME_ENTITY: u8 = 0x02;
pub const FRAME_END: u8 = 0xFF;

/// type + body_len
pub const FRAME_PREFIX_LEN: usize = 5;
pub const FRAME_CRC_LEN: usize = 4;
/// Bodies above this size are rejected before allocation
pub const MAX_BODY_LEN: usize = 64 * 1024 * 1024;

pub const DIGEST_LEN: usize = 32;
const END_BODY_LEN: usize = 8 + DIGEST_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Header { version: u16 },
    Entity { tag: String, payload: Vec<u8> },
    End { entity_count: u64, digest: [u8; DIGEST_LEN] },
}

impl Frame {
    pub fn frame_type(&self) -> u8 {
        match self {
            Frame::Header { .. } => FRAME_HEADER,
            Frame::Entity { .. } => FRAME_ENTITY,
            Frame::End { .. } => FRAME_END,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Frame::Header { .. } => "HEADER",
            Frame::Entity { .. } => "ENTITY",
            Frame::End { .. } => "END",
        }
    }

    fn body(&self) -> Vec<u8> {
        match self {
            Frame::Header { version } => {
                let mut body = Vec::with_capacity(MAGIC.len() + 2);
                body.extend_from_slice(MAGIC);
                body.extend_from_slice(&version.to_le_bytes());
                body
            }
            Frame::Entity { tag, payload } => {
                let mut body = Vec::with_capacity(2 + tag.len() + payload.len());
                body.extend_from_slice(&(tag.len() as u16).to_le_bytes());
                body.extend_from_slice(tag.as_bytes());
                body.extend_from_slice(payload);
                body
            }
            Frame::End {
                entity_count,
                digest,
            } => {
                let mut body = Vec::with_capacity(END_BODY_LEN);
                body.extend_from_slice(&entity_count.to_le_bytes());
                body.extend_from_slice(digest);
                body
            }
        }
    }

    /// Full wire encoding, checksum included
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body();
        let mut out = Vec::with_capacity(FRAME_PREFIX_LEN + body.len() + FRAME_CRC_LEN);
        out.push(self.frame_type());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        let crc = compute_checksum(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    /// Parse a frame body whose checksum has already been verified.
    pub fn decode_body(frame_type: u8, body: &[u8]) -> Result<Frame, String> {
        match frame_type {
            FRAME_HEADER => {
                if body.len() != MAGIC.len() + 2 || &body[..MAGIC.len()] != MAGIC {
                    return Err("bad stream header".to_string());
                }
                let version = u16::from_le_bytes([body[6], body[7]]);
                Ok(Frame::Header { version })
            }
            FRAME_ENTITY => {
                if body.len() < 2 {
                    return Err("entity frame too short".to_string());
                }
                let tag_len = u16::from_le_bytes([body[0], body[1]]) as usize;
                if body.len() < 2 + tag_len {
                    return Err("entity tag exceeds frame".to_string());
                }
                let tag = std::str::from_utf8(&body[2..2 + tag_len])
                    .map_err(|_| "entity tag is not utf-8".to_string())?;
                Ok(Frame::Entity {
                    tag: tag.to_string(),
                    payload: body[2 + tag_len..].to_vec(),
                })
            }
            FRAME_END => {
                if body.len() != END_BODY_LEN {
                    return Err(format!("end frame body is {} bytes", body.len()));
                }
                let mut count = [0u8; 8];
                count.copy_from_slice(&body[..8]);
                let mut digest = [0u8; DIGEST_LEN];
                digest.copy_from_slice(&body[8..]);
                Ok(Frame::End {
                    entity_count: u64::from_le_bytes(count),
                    digest,
                })
            }
            other => Err(format!("unknown frame type 0x{:02x}", other)),
        }
    }
}
