pub mod decode;
pub mod disasm;
pub mod encode;
pub mod error;
pub mod flags;
pub mod instruction;
pub mod register;

pub use decode::decode;
pub use disasm::{ListingEntry, disassemble};
pub use encode::EncodedBytes;
pub use error::{DecodeError, DecodeResult};
pub use flags::ConditionFlags;
pub use instruction::Instruction;
pub use register::{Condition, IndirectPair, Register, RegisterPair, RestartIndex, StackPair};
