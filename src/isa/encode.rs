//! Binary encoder. Field placement follows the DDD/SSS/RP/CCC layouts; the
//! inverse lives in [`super::decode`].

use smallvec::SmallVec;

use crate::isa::instruction::Instruction;

/// Encoded byte buffer; no instruction exceeds three bytes.
pub type EncodedBytes = SmallVec<[u8; 3]>;

fn op(opcode: u8) -> EncodedBytes {
    SmallVec::from_slice(&[opcode])
}

fn op_imm8(opcode: u8, data: u8) -> EncodedBytes {
    SmallVec::from_slice(&[opcode, data])
}

fn op_imm16(opcode: u8, data: u16) -> EncodedBytes {
    let [low, high] = data.to_le_bytes();
    SmallVec::from_slice(&[opcode, low, high])
}

impl Instruction {
    /// Serialises to machine code. Immediates are emitted low byte first.
    pub fn encode(&self) -> EncodedBytes {
        match *self {
            Instruction::Nop => op(0x00),
            Instruction::Lxi(rp, data) => op_imm16(0x01 | rp.code() << 4, data),
            Instruction::Stax(rp) => op(0x02 | rp.code() << 4),
            Instruction::Inx(rp) => op(0x03 | rp.code() << 4),
            Instruction::Inr(r) => op(0x04 | r.code() << 3),
            Instruction::Dcr(r) => op(0x05 | r.code() << 3),
            Instruction::Mvi(r, data) => op_imm8(0x06 | r.code() << 3, data),
            Instruction::Dad(rp) => op(0x09 | rp.code() << 4),
            Instruction::Ldax(rp) => op(0x0A | rp.code() << 4),
            Instruction::Dcx(rp) => op(0x0B | rp.code() << 4),
            Instruction::Rlc => op(0x07),
            Instruction::Rrc => op(0x0F),
            Instruction::Ral => op(0x17),
            Instruction::Rar => op(0x1F),
            Instruction::Shld(addr) => op_imm16(0x22, addr),
            Instruction::Daa => op(0x27),
            Instruction::Lhld(addr) => op_imm16(0x2A, addr),
            Instruction::Cma => op(0x2F),
            Instruction::Sta(addr) => op_imm16(0x32, addr),
            Instruction::Stc => op(0x37),
            Instruction::Lda(addr) => op_imm16(0x3A, addr),
            Instruction::Cmc => op(0x3F),
            Instruction::Mov(dst, src) => op(0x40 | dst.code() << 3 | src.code()),
            Instruction::Hlt => op(0x76),
            Instruction::Add(r) => op(0x80 | r.code()),
            Instruction::Adc(r) => op(0x88 | r.code()),
            Instruction::Sub(r) => op(0x90 | r.code()),
            Instruction::Sbb(r) => op(0x98 | r.code()),
            Instruction::Ana(r) => op(0xA0 | r.code()),
            Instruction::Xra(r) => op(0xA8 | r.code()),
            Instruction::Ora(r) => op(0xB0 | r.code()),
            Instruction::Cmp(r) => op(0xB8 | r.code()),
            Instruction::Rcond(cc) => op(0xC0 | cc.code() << 3),
            Instruction::Pop(rp) => op(0xC1 | rp.code() << 4),
            Instruction::Jcond(cc, addr) => op_imm16(0xC2 | cc.code() << 3, addr),
            Instruction::Jmp(addr) => op_imm16(0xC3, addr),
            Instruction::Ccond(cc, addr) => op_imm16(0xC4 | cc.code() << 3, addr),
            Instruction::Push(rp) => op(0xC5 | rp.code() << 4),
            Instruction::Adi(data) => op_imm8(0xC6, data),
            Instruction::Aci(data) => op_imm8(0xCE, data),
            Instruction::Sui(data) => op_imm8(0xD6, data),
            Instruction::Sbi(data) => op_imm8(0xDE, data),
            Instruction::Ani(data) => op_imm8(0xE6, data),
            Instruction::Xri(data) => op_imm8(0xEE, data),
            Instruction::Ori(data) => op_imm8(0xF6, data),
            Instruction::Cpi(data) => op_imm8(0xFE, data),
            Instruction::Rst(n) => op(0xC7 | n.code() << 3),
            Instruction::Ret => op(0xC9),
            Instruction::Call(addr) => op_imm16(0xCD, addr),
            Instruction::Out(port) => op_imm8(0xD3, port),
            Instruction::In(port) => op_imm8(0xDB, port),
            Instruction::Xthl => op(0xE3),
            Instruction::Pchl => op(0xE9),
            Instruction::Xchg => op(0xEB),
            Instruction::Di => op(0xF3),
            Instruction::Sphl => op(0xF9),
            Instruction::Ei => op(0xFB),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::isa::register::{Condition, Register, RegisterPair, StackPair};

    #[test]
    fn encodes_known_opcodes() {
        assert_eq!(Instruction::Nop.encode().as_slice(), hex!("00"));
        assert_eq!(
            Instruction::Lxi(RegisterPair::Sp, 0x2400).encode().as_slice(),
            hex!("31 00 24")
        );
        assert_eq!(
            Instruction::Mov(Register::A, Register::B).encode().as_slice(),
            hex!("78")
        );
        assert_eq!(
            Instruction::Mvi(Register::C, 0x0A).encode().as_slice(),
            hex!("0E 0A")
        );
        assert_eq!(Instruction::Hlt.encode().as_slice(), hex!("76"));
        assert_eq!(
            Instruction::Jcond(Condition::Zero, 0x0105).encode().as_slice(),
            hex!("CA 05 01")
        );
        assert_eq!(
            Instruction::Push(StackPair::Psw).encode().as_slice(),
            hex!("F5")
        );
        assert_eq!(Instruction::Cpi(0x30).encode().as_slice(), hex!("FE 30"));
    }

    #[test]
    fn encoded_length_matches_len() {
        let samples = [
            Instruction::Nop,
            Instruction::Out(0x00),
            Instruction::Call(0x1234),
            Instruction::Dad(RegisterPair::Hl),
        ];
        for instr in samples {
            assert_eq!(instr.encode().len(), instr.len(), "{instr}");
        }
    }
}
