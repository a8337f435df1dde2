//! Raw wire frame

use std::fmt;

use crate::error::{Result, SwitchError};

/// Size of every frame on the wire
pub const FRAME_LEN: usize = 6;

/// A single 6-byte frame, either a command or a reply
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a frame out of a slice that must be exactly `FRAME_LEN` long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| {
            SwitchError::InvalidResponse(format!(
                "expected {} bytes, got {}",
                FRAME_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.0[3]
    }

    /// Parameter byte
    pub fn param(&self) -> u8 {
        self.0[4]
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Upper-case hex, space separated: `AA BB 03 01 02 EE`
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}]", self)
    }
}
