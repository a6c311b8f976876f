//! Bridges between async request/response bodies and the blocking
//! export/import pipelines
//!
//! Export and import run on the blocking pool and speak `std::io`. These
//! adapters move bytes across a bounded tokio channel, so a slow peer
//! applies backpressure to the pipeline instead of growing a buffer.

use std::io::{self, Read, Write};

use axum::body::Bytes;
use tokio::sync::mpsc;

use crate::export::StreamAborted;

/// Chunks queued between the pipeline and the connection
pub const CHANNEL_DEPTH: usize = 8;
/// Bytes buffered before a chunk is handed to the response body
pub const CHUNK_SIZE: usize = 64 * 1024;

pub type BodyChunk = Result<Bytes, StreamAborted>;

/// `Write` half feeding a streaming response body.
///
/// Writes fail with `BrokenPipe` once the body has been dropped, which is
/// how an export notices that its client went away.
pub struct ChannelWriter {
    tx: mpsc::Sender<BodyChunk>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<BodyChunk>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }

    /// Terminate the body with an error instead of a clean end. Buffered
    /// bytes are discarded.
    pub fn abort(self, reason: StreamAborted) {
        // Nobody to tell if the body is already gone
        let _ = self.tx.blocking_send(Err(reason));
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

/// `Read` half draining a request body
pub struct ChannelReader {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl ChannelReader {
    pub fn new(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        Self {
            rx,
            current: Bytes::new(),
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current = self.current.slice(n..);
        Ok(n)
    }
}
