//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Command
//! ```text
//! AA BB 03 <opcode> <param> EE
//! ```
//!
//! ### Status reply
//! ```text
//! AA BB 03 11 <index> <index + 0x16>
//! ```
//!
//! Input numbers are one-based for callers and zero-based on the wire.

use std::io::{self, Read, Write};

use bytes::BytesMut;

use crate::error::{Result, SwitchError};
use super::command::{template, Command, MAGIC};
use super::frame::{Frame, FRAME_LEN};
use super::response::{STATUS_CHECK_OFFSET, STATUS_PREFIX, STATUS_TEMPLATE};

// =============================================================================
// Encoding
// =============================================================================

/// Copy a template and place `value` in the parameter slot (byte 4)
pub fn encode(template: &[u8; FRAME_LEN], value: u8) -> Frame {
    let mut bytes = *template;
    bytes[4] = value;
    Frame::new(bytes)
}

/// Encode a command to its wire frame
pub fn encode_command(command: &Command) -> Frame {
    encode(&template(command.opcode()), command.param())
}

/// Encode a well-formed status frame for a zero-based input index
///
/// This is what the switch sends; the driver only needs it to simulate a
/// device.
pub fn encode_status(index: u8) -> Frame {
    let mut bytes = *encode(&STATUS_TEMPLATE, index).as_bytes();
    bytes[5] = index.wrapping_add(STATUS_CHECK_OFFSET);
    Frame::new(bytes)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a status frame into a one-based input number
///
/// Checks length, marker, opcode and the `byte5 - byte4 == 0x16` relation.
pub fn decode(bytes: &[u8]) -> Result<u8> {
    if bytes.len() != FRAME_LEN {
        return Err(SwitchError::InvalidResponse(format!(
            "expected {} bytes, got {}",
            FRAME_LEN,
            bytes.len()
        )));
    }

    if bytes[..4] != STATUS_PREFIX {
        return Err(SwitchError::InvalidResponse(format!(
            "not a status frame: {:02X?}",
            bytes
        )));
    }

    if bytes[5].wrapping_sub(bytes[4]) != STATUS_CHECK_OFFSET {
        return Err(SwitchError::InvalidResponse(format!(
            "check byte mismatch: 0x{:02X} - 0x{:02X} != 0x{:02X}",
            bytes[5], bytes[4], STATUS_CHECK_OFFSET
        )));
    }

    bytes[4].checked_add(1).ok_or_else(|| {
        SwitchError::InvalidResponse(format!("input index out of range: 0x{:02X}", bytes[4]))
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Result of a single read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete frame arrived
    Frame(Frame),

    /// The read deadline expired; the link is idle but alive
    Idle,

    /// The peer closed the stream
    Closed,
}

/// Reassembles 6-byte frames from a stream with a read deadline
///
/// Partial frames survive a deadline expiry and are completed by the next
/// read. Bytes that cannot start a frame are skipped up to the next `AA BB`
/// marker, so stray bytes on the line never shift later frames.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(FRAME_LEN * 4),
        }
    }

    /// Read until a frame is complete, the deadline expires, or the stream ends
    pub fn read_frame(&mut self) -> io::Result<ReadOutcome> {
        let mut chunk = [0u8; FRAME_LEN * 4];

        loop {
            self.skip_to_marker();

            if self.buf.len() >= FRAME_LEN {
                let raw = self.buf.split_to(FRAME_LEN);
                let mut bytes = [0u8; FRAME_LEN];
                bytes.copy_from_slice(&raw);
                return Ok(ReadOutcome::Frame(Frame::new(bytes)));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                // Unix reports an expired deadline as WouldBlock, Windows as TimedOut
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(ReadOutcome::Idle)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Bytes of an incomplete frame held back
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop leading bytes that cannot be the start of a frame
    fn skip_to_marker(&mut self) {
        let junk = junk_prefix_len(&self.buf);
        if junk > 0 {
            let dropped = self.buf.split_to(junk);
            tracing::debug!("Skipping {} stray bytes: {:02X?}", junk, &dropped[..]);
        }
    }
}

/// Length of the prefix before the first possible frame start
///
/// A lone trailing `AA` is kept since its `BB` may still be on the way.
fn junk_prefix_len(buf: &[u8]) -> usize {
    (0..buf.len())
        .find(|&i| match &buf[i..] {
            [first] => *first == MAGIC[0],
            [first, second, ..] => [*first, *second] == MAGIC,
            [] => false,
        })
        .unwrap_or(buf.len())
}

/// Write a frame in a single write call
///
/// A partial write is reported as `ShortWrite`; nothing is retried.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
    let written = writer.write(frame.as_bytes())?;
    if written != FRAME_LEN {
        return Err(SwitchError::ShortWrite {
            written,
            expected: FRAME_LEN,
        });
    }
    writer.flush()?;
    Ok(())
}
