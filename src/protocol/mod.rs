//! Protocol Module
//!
//! Defines the fixed-length binary protocol spoken by the switch.
//!
//! ## Frame Format
//!
//! Every frame, command or reply, is exactly 6 bytes:
//! ```text
//! ┌──────┬──────┬─────────┬──────────┬───────────┬──────────┐
//! │ 0xAA │ 0xBB │ Len 0x03│ Opcode(1)│ Param (1) │ Tail (1) │
//! └──────┴──────┴─────────┴──────────┴───────────┴──────────┘
//! ```
//!
//! Commands end in the `0xEE` sentinel. The status reply ends in a
//! check byte instead (`param + 0x16`).
//!
//! ### Opcodes
//! - 0x01: SWITCH INPUT       - Param: zero-based input index
//! - 0x02: BUZZER             - Param: 0x00 mute, 0x01 unmute
//! - 0x03: LED TIMEOUT        - Param: seconds (0 disables)
//! - 0x10: GET CURRENT INPUT  - Param: 0x00
//! - 0x11: STATUS (reply)     - Param: zero-based input index
//! - 0x81: AUTO INPUT DETECT  - Param: 0x00 off, 0x01 on

mod frame;
mod command;
mod response;
mod codec;

pub use frame::{Frame, FRAME_LEN};
pub use command::{template, Command, Opcode, LENGTH_MARKER, MAGIC, SENTINEL};
pub use response::{STATUS_CHECK_OFFSET, STATUS_PREFIX, STATUS_TEMPLATE};
pub use codec::{
    decode, encode, encode_command, encode_status, write_frame, FrameReader, ReadOutcome,
};
