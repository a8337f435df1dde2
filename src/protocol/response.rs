//! Response definitions
//!
//! The switch answers with a single frame kind: the status frame carrying
//! the active input.

use super::command::{LENGTH_MARKER, MAGIC};
use super::frame::FRAME_LEN;

/// Bytes 0-3 of a status frame
pub const STATUS_PREFIX: [u8; 4] = [MAGIC[0], MAGIC[1], LENGTH_MARKER, 0x11];

/// Required difference between byte 5 and byte 4 of a status frame
///
/// Whether this is a real checksum or a device quirk is unknown.
pub const STATUS_CHECK_OFFSET: u8 = 0x16;

/// Status frame with index 0 (check byte filled in by the encoder)
pub const STATUS_TEMPLATE: [u8; FRAME_LEN] = [
    STATUS_PREFIX[0],
    STATUS_PREFIX[1],
    STATUS_PREFIX[2],
    STATUS_PREFIX[3],
    0x00,
    STATUS_CHECK_OFFSET,
];
