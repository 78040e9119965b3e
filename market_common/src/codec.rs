//! Newline-delimited JSON framing.
//!
//! Each frame is written as one JSON object followed by `\n`. Reading is line
//! based with an upper bound on the line length so a peer cannot make the reader
//! buffer unbounded input.
use std::io::{BufRead, BufReader, Read, Write};

use crate::error::MarketError;
use crate::frame::Frame;
use crate::Result;

/// Largest accepted frame, newline included.
pub const MAX_FRAME_LEN: u64 = 1024 * 1024;

/// Serialize `frame` and write it followed by a newline.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Line-based frame reader.
pub struct FrameReader<R: Read> {
    inner: BufReader<R>,
    line: String,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `reader` in a buffered frame reader.
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream. Blank lines are skipped. A line
    /// that is not a valid frame yields `MarketError::SerdeJson`; the reader stays
    /// usable for the following line. An oversized line yields
    /// `MarketError::Protocol` and the stream should be dropped.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.line.clear();
            let size = (&mut self.inner)
                .take(MAX_FRAME_LEN)
                .read_line(&mut self.line)?;
            if size == 0 {
                return Ok(None);
            }
            if !self.line.ends_with('\n') && size as u64 >= MAX_FRAME_LEN {
                return Err(MarketError::Protocol(format!(
                    "frame exceeds {} bytes",
                    MAX_FRAME_LEN
                )));
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}
