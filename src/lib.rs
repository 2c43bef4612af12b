//! Emulator for the Leben-80 teaching machine: an 8080-class processor with
//! 64 KiB of memory, a binary instruction codec, a two-pass assembler, and a
//! steppable execution core.

pub mod asm;
pub mod isa;
pub mod machine;
