//! Length-prefixed framing over the browser's stdio pipes.
//!
//! Every frame is a `u32` little-endian length followed by that many bytes of
//! UTF-8 JSON. The reader and the writer are separate streams and are never
//! assumed to be seekable.

use std::io::{self, Read, Write};
use thiserror::Error;

/// Largest payload accepted from the browser (1 MiB).
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

const LENGTH_PREFIX_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Frame too large to send: {0} bytes")]
    TooLarge(usize),
}

pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> FramedTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads the next frame payload.
    ///
    /// `Ok(None)` means the session is over: the stream closed before a full
    /// length prefix arrived, or the declared length is zero or above
    /// [`MAX_FRAME_LEN`]. A payload cut short by the stream closing is
    /// returned as whatever bytes did arrive.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        let got = read_up_to(&mut self.reader, &mut prefix)?;
        if got < LENGTH_PREFIX_LEN {
            if got > 0 {
                log::warn!("Stream closed after {} of 4 length prefix bytes", got);
            }
            return Ok(None);
        }

        let len = u32::from_le_bytes(prefix);
        if len == 0 || len > MAX_FRAME_LEN {
            log::warn!(
                "Rejecting frame with declared length {} (limit {})",
                len,
                MAX_FRAME_LEN
            );
            return Ok(None);
        }

        let mut payload = vec![0u8; len as usize];
        let got = read_up_to(&mut self.reader, &mut payload)?;
        if got < payload.len() {
            log::warn!("Frame truncated: expected {} bytes, got {}", len, got);
            payload.truncate(got);
        }
        Ok(Some(payload))
    }

    /// Writes one frame and flushes; the browser reads synchronously and
    /// waits on anything left in a buffer.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| TransportError::TooLarge(payload.len()))?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(payload)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Fills `buf` until it is full or the stream ends, returning the byte count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
