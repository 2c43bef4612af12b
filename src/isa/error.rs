use std::fmt;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Failure while decoding machine code back into instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The opcode byte is not assigned in the instruction set.
    UnknownOpcode { opcode: u8 },
    /// The stream ended inside a multi-byte instruction.
    Truncated { expected: usize, available: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownOpcode { opcode } => {
                write!(f, "unknown opcode 0x{opcode:02X}")
            }
            DecodeError::Truncated { expected, available } => {
                write!(
                    f,
                    "truncated instruction: expected {expected} byte(s), {available} available"
                )
            }
        }
    }
}

impl std::error::Error for DecodeError {}
