//! Listing generation over a program image.

use smallvec::SmallVec;

use crate::isa::decode::decode;
use crate::isa::error::DecodeError;

/// One listing row: where the instruction sits, its raw bytes, and its
/// rendered text. Bytes the decoder rejects are listed as `DB` rows so a
/// listing can span data regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub address: u16,
    pub bytes: SmallVec<[u8; 3]>,
    pub text: String,
}

/// Walks `image` from `origin`, decoding until the slice is exhausted.
pub fn disassemble(image: &[u8], origin: u16) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    let mut offset = 0usize;
    while offset < image.len() {
        let address = origin.wrapping_add(offset as u16);
        match decode(&image[offset..]) {
            Ok((instruction, len)) => {
                entries.push(ListingEntry {
                    address,
                    bytes: SmallVec::from_slice(&image[offset..offset + len]),
                    text: instruction.to_string(),
                });
                offset += len;
            }
            Err(DecodeError::UnknownOpcode { .. }) | Err(DecodeError::Truncated { .. }) => {
                let opcode = image[offset];
                entries.push(ListingEntry {
                    address,
                    bytes: SmallVec::from_slice(&[opcode]),
                    text: format!("DB 0x{opcode:02X}"),
                });
                offset += 1;
            }
        }
    }
    entries
}
