//! Binary decoder: mask-compare on the opcode byte, then bit-field extraction
//! for the DDD/SSS/RP/CCC operands.

use std::ops::Range;

use crate::isa::error::{DecodeError, DecodeResult};
use crate::isa::instruction::Instruction;
use crate::isa::register::{
    Condition, IndirectPair, Register, RegisterPair, RestartIndex, StackPair,
};

#[inline]
fn is_eq_masked(opcode: u8, pattern: u8, mask: u8) -> bool {
    opcode & mask == pattern & mask
}

#[inline]
fn extract_bits(byte: u8, range: Range<u8>) -> u8 {
    let shifted = byte >> range.start;
    let mask = (1u8 << range.len()) - 1;
    shifted & mask
}

fn imm8(bytes: &[u8]) -> DecodeResult<u8> {
    bytes.get(1).copied().ok_or(DecodeError::Truncated {
        expected: 2,
        available: bytes.len(),
    })
}

fn imm16(bytes: &[u8]) -> DecodeResult<u16> {
    match bytes {
        [_, low, high, ..] => Ok(u16::from_le_bytes([*low, *high])),
        _ => Err(DecodeError::Truncated {
            expected: 3,
            available: bytes.len(),
        }),
    }
}

/// Decodes the instruction at the start of `bytes`, returning it together
/// with the number of bytes consumed.
///
/// Opcode bytes the instruction set does not assign (0x08, 0x10, the 0xCB/
/// 0xD9/0xDD/0xED/0xFD aliases, ...) are reported as
/// [`DecodeError::UnknownOpcode`] instead of being skipped.
pub fn decode(bytes: &[u8]) -> DecodeResult<(Instruction, usize)> {
    let opcode = *bytes.first().ok_or(DecodeError::Truncated {
        expected: 1,
        available: 0,
    })?;

    // Fully fixed opcodes first; the masked field groups below never overlap
    // with these because each group's mask keeps the distinguishing bits.
    let fixed = match opcode {
        0x00 => Some(Instruction::Nop),
        0x07 => Some(Instruction::Rlc),
        0x0F => Some(Instruction::Rrc),
        0x17 => Some(Instruction::Ral),
        0x1F => Some(Instruction::Rar),
        0x27 => Some(Instruction::Daa),
        0x2F => Some(Instruction::Cma),
        0x37 => Some(Instruction::Stc),
        0x3F => Some(Instruction::Cmc),
        0x76 => Some(Instruction::Hlt),
        0xC9 => Some(Instruction::Ret),
        0xE3 => Some(Instruction::Xthl),
        0xE9 => Some(Instruction::Pchl),
        0xEB => Some(Instruction::Xchg),
        0xF3 => Some(Instruction::Di),
        0xF9 => Some(Instruction::Sphl),
        0xFB => Some(Instruction::Ei),
        _ => None,
    };
    if let Some(instruction) = fixed {
        return Ok((instruction, 1));
    }

    let fixed_with_operand = match opcode {
        0x22 => Some(Instruction::Shld(imm16(bytes)?)),
        0x2A => Some(Instruction::Lhld(imm16(bytes)?)),
        0x32 => Some(Instruction::Sta(imm16(bytes)?)),
        0x3A => Some(Instruction::Lda(imm16(bytes)?)),
        0xC3 => Some(Instruction::Jmp(imm16(bytes)?)),
        0xCD => Some(Instruction::Call(imm16(bytes)?)),
        0xD3 => Some(Instruction::Out(imm8(bytes)?)),
        0xDB => Some(Instruction::In(imm8(bytes)?)),
        _ => None,
    };
    if let Some(instruction) = fixed_with_operand {
        return Ok((instruction, instruction.len()));
    }

    let instruction = if is_eq_masked(opcode, 0x01, 0xCF) {
        Instruction::Lxi(RegisterPair::from_code(extract_bits(opcode, 4..6)), imm16(bytes)?)
    } else if is_eq_masked(opcode, 0x02, 0xEF) {
        let rp = IndirectPair::from_code(extract_bits(opcode, 4..6))
            .ok_or(DecodeError::UnknownOpcode { opcode })?;
        Instruction::Stax(rp)
    } else if is_eq_masked(opcode, 0x0A, 0xEF) {
        let rp = IndirectPair::from_code(extract_bits(opcode, 4..6))
            .ok_or(DecodeError::UnknownOpcode { opcode })?;
        Instruction::Ldax(rp)
    } else if is_eq_masked(opcode, 0x03, 0xCF) {
        Instruction::Inx(RegisterPair::from_code(extract_bits(opcode, 4..6)))
    } else if is_eq_masked(opcode, 0x0B, 0xCF) {
        Instruction::Dcx(RegisterPair::from_code(extract_bits(opcode, 4..6)))
    } else if is_eq_masked(opcode, 0x09, 0xCF) {
        Instruction::Dad(RegisterPair::from_code(extract_bits(opcode, 4..6)))
    } else if is_eq_masked(opcode, 0x04, 0xC7) {
        Instruction::Inr(Register::from_code(extract_bits(opcode, 3..6)))
    } else if is_eq_masked(opcode, 0x05, 0xC7) {
        Instruction::Dcr(Register::from_code(extract_bits(opcode, 3..6)))
    } else if is_eq_masked(opcode, 0x06, 0xC7) {
        Instruction::Mvi(Register::from_code(extract_bits(opcode, 3..6)), imm8(bytes)?)
    } else if is_eq_masked(opcode, 0x40, 0xC0) {
        // 0x76 (MOV M, M) is HLT and was consumed above.
        Instruction::Mov(
            Register::from_code(extract_bits(opcode, 3..6)),
            Register::from_code(extract_bits(opcode, 0..3)),
        )
    } else if is_eq_masked(opcode, 0x80, 0xC0) {
        let operand = Register::from_code(extract_bits(opcode, 0..3));
        match extract_bits(opcode, 3..6) {
            0b000 => Instruction::Add(operand),
            0b001 => Instruction::Adc(operand),
            0b010 => Instruction::Sub(operand),
            0b011 => Instruction::Sbb(operand),
            0b100 => Instruction::Ana(operand),
            0b101 => Instruction::Xra(operand),
            0b110 => Instruction::Ora(operand),
            _ => Instruction::Cmp(operand),
        }
    } else if is_eq_masked(opcode, 0xC0, 0xC7) {
        Instruction::Rcond(Condition::from_code(extract_bits(opcode, 3..6)))
    } else if is_eq_masked(opcode, 0xC1, 0xCF) {
        Instruction::Pop(StackPair::from_code(extract_bits(opcode, 4..6)))
    } else if is_eq_masked(opcode, 0xC2, 0xC7) {
        Instruction::Jcond(Condition::from_code(extract_bits(opcode, 3..6)), imm16(bytes)?)
    } else if is_eq_masked(opcode, 0xC4, 0xC7) {
        Instruction::Ccond(Condition::from_code(extract_bits(opcode, 3..6)), imm16(bytes)?)
    } else if is_eq_masked(opcode, 0xC5, 0xCF) {
        Instruction::Push(StackPair::from_code(extract_bits(opcode, 4..6)))
    } else if is_eq_masked(opcode, 0xC6, 0xC7) {
        let data = imm8(bytes)?;
        match extract_bits(opcode, 3..6) {
            0b000 => Instruction::Adi(data),
            0b001 => Instruction::Aci(data),
            0b010 => Instruction::Sui(data),
            0b011 => Instruction::Sbi(data),
            0b100 => Instruction::Ani(data),
            0b101 => Instruction::Xri(data),
            0b110 => Instruction::Ori(data),
            _ => Instruction::Cpi(data),
        }
    } else if is_eq_masked(opcode, 0xC7, 0xC7) {
        Instruction::Rst(RestartIndex::from_code(extract_bits(opcode, 3..6)))
    } else {
        return Err(DecodeError::UnknownOpcode { opcode });
    };

    Ok((instruction, instruction.len()))
}
