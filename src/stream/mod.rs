//! Bulk dump stream format
//!
//! A dump is a sequence of self-checking frames: one HEADER, zero or more
//! ENTITY frames, and one END frame carrying the entity count and a SHA-256
//! of everything before it. A stream without a valid END frame is
//! incomplete by definition, which is how a consumer tells an aborted
//! transfer from a finished one.

mod cancel;
mod errors;
mod frame;
mod reader;
mod writer;

pub use cancel::{CancelFlag, CancelOnDrop};
pub use errors::FrameError;
pub use frame::{
    Frame, DIGEST_LEN, FORMAT_VERSION, FRAME_END, FRAME_ENTITY, FRAME_HEADER, MAGIC, MAX_BODY_LEN,
};
pub use reader::FrameReader;
pub use writer::{StreamTrailer, StreamWriter};

pub(crate) use writer::hex;
