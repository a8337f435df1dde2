//! Command definitions
//!
//! Represents the operations the switch accepts.

use super::frame::FRAME_LEN;

/// Leading marker pair of every frame
pub const MAGIC: [u8; 2] = [0xAA, 0xBB];

/// Fixed length marker (byte 2)
pub const LENGTH_MARKER: u8 = 0x03;

/// Trailing sentinel of command frames
pub const SENTINEL: u8 = 0xEE;

/// Operation selector (byte 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    SwitchInput = 0x01,
    Buzzer = 0x02,
    LedTimeout = 0x03,
    GetCurrentInput = 0x10,
    Status = 0x11,
    AutoInputDetection = 0x81,
}

/// Command template for an opcode: parameter byte zeroed, sentinel in place
pub const fn template(opcode: Opcode) -> [u8; FRAME_LEN] {
    [MAGIC[0], MAGIC[1], LENGTH_MARKER, opcode as u8, 0x00, SENTINEL]
}

/// A command to send to the switch
///
/// Parameters are already in wire form (zero-based input index, raw
/// seconds); range checks belong to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Select an input by zero-based index
    SwitchInput { index: u8 },

    /// Set the LED display timeout (0 disables)
    SetLedTimeout { seconds: u8 },

    MuteBuzzer,
    UnmuteBuzzer,

    /// Only honoured by the 8-port hardware
    EnableAutoInputDetection,
    DisableAutoInputDetection,

    /// Ask for the active input (answered with a status frame)
    GetCurrentInput,
}

impl Command {
    /// Get the opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::SwitchInput { .. } => Opcode::SwitchInput,
            Command::SetLedTimeout { .. } => Opcode::LedTimeout,
            Command::MuteBuzzer | Command::UnmuteBuzzer => Opcode::Buzzer,
            Command::EnableAutoInputDetection | Command::DisableAutoInputDetection => {
                Opcode::AutoInputDetection
            }
            Command::GetCurrentInput => Opcode::GetCurrentInput,
        }
    }

    /// Get the parameter byte
    pub fn param(&self) -> u8 {
        match self {
            Command::SwitchInput { index } => *index,
            Command::SetLedTimeout { seconds } => *seconds,
            Command::MuteBuzzer => 0x00,
            Command::UnmuteBuzzer => 0x01,
            Command::EnableAutoInputDetection => 0x01,
            Command::DisableAutoInputDetection => 0x00,
            Command::GetCurrentInput => 0x00,
        }
    }

    /// Whether the switch answers this command with a status frame
    pub fn expects_response(&self) -> bool {
        matches!(self, Command::SwitchInput { .. } | Command::GetCurrentInput)
    }
}
