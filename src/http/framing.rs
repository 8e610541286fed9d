//! Incremental message framing over a raw byte stream.
//!
//! TCP delivers bytes in arbitrary fragments. The reader accumulates them in
//! an internal buffer and hands back complete frames: everything up to a
//! delimiter, or an exact byte count. A frame may span any number of socket
//! reads; neither primitive assumes the delimiter or the byte count lines up
//! with fragment boundaries.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on a single socket read.
const FILL_CHUNK: usize = 1024;

#[derive(Debug)]
pub enum FrameError {
    /// Peer closed the connection with buffered but unconsumed bytes,
    /// i.e. mid-message.
    Incomplete,
    Io(std::io::Error),
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        FrameError::Io(e)
    }
}

/// Buffered reader exposing the two framing primitives the update protocol
/// needs.
///
/// Bytes are only removed from the front of the buffer once they are fully
/// returned to a caller; nothing is ever re-read or dropped silently.
pub struct FramedReader<R> {
    stream: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Access to the underlying stream, for writing a response after the
    /// request has been consumed.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.stream
    }

    /// Reads until `delimiter` occurs in the stream and returns everything
    /// up to and including its first occurrence.
    ///
    /// An empty result means the peer closed the connection before sending
    /// anything; callers treat it as "no message". A close with part of a
    /// message already buffered is [`FrameError::Incomplete`].
    pub async fn read_until(&mut self, delimiter: &[u8]) -> Result<Bytes, FrameError> {
        loop {
            if let Some(pos) = find(&self.buffer, delimiter) {
                return Ok(self.buffer.split_to(pos + delimiter.len()).freeze());
            }

            if !self.fill().await? {
                return Ok(Bytes::new());
            }
        }
    }

    /// Reads exactly `n` bytes, pulling from the stream as needed.
    ///
    /// Same closed-before-satisfied behavior as [`Self::read_until`].
    pub async fn read_exact(&mut self, n: usize) -> Result<Bytes, FrameError> {
        while self.buffer.len() < n {
            if !self.fill().await? {
                return Ok(Bytes::new());
            }
        }

        Ok(self.buffer.split_to(n).freeze())
    }

    /// Pulls one bounded chunk from the stream into the buffer. Returns
    /// `false` on a clean end of stream.
    async fn fill(&mut self) -> Result<bool, FrameError> {
        let mut chunk = [0u8; FILL_CHUNK];
        let n = self.stream.read(&mut chunk).await?;

        if n == 0 {
            if !self.buffer.is_empty() {
                return Err(FrameError::Incomplete);
            }
            return Ok(false);
        }

        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(true)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
