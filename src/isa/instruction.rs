//! The Leben-80 instruction set.

use std::fmt;

use crate::isa::register::{
    Condition, IndirectPair, Register, RegisterPair, RestartIndex, StackPair,
};

/// One decoded machine instruction. 16-bit immediates and addresses are held
/// in host order; the codec is responsible for the little-endian byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Nop,
    Lxi(RegisterPair, u16),
    Stax(IndirectPair),
    Inx(RegisterPair),
    Inr(Register),
    Dcr(Register),
    Mvi(Register, u8),
    Dad(RegisterPair),
    Ldax(IndirectPair),
    Dcx(RegisterPair),
    Rlc,
    Rrc,
    Ral,
    Rar,
    Shld(u16),
    Daa,
    Lhld(u16),
    Cma,
    Sta(u16),
    Stc,
    Lda(u16),
    Cmc,
    Mov(Register, Register),
    Hlt,
    Add(Register),
    Adc(Register),
    Sub(Register),
    Sbb(Register),
    Ana(Register),
    Xra(Register),
    Ora(Register),
    Cmp(Register),
    Rcond(Condition),
    Pop(StackPair),
    Jcond(Condition, u16),
    Jmp(u16),
    Ccond(Condition, u16),
    Push(StackPair),
    Adi(u8),
    Aci(u8),
    Sui(u8),
    Sbi(u8),
    Ani(u8),
    Xri(u8),
    Ori(u8),
    Cpi(u8),
    Rst(RestartIndex),
    Ret,
    Call(u16),
    Out(u8),
    In(u8),
    Xthl,
    Pchl,
    Xchg,
    Di,
    Sphl,
    Ei,
}

impl Instruction {
    /// Encoded length in bytes (1 to 3).
    pub fn len(&self) -> usize {
        match self {
            Instruction::Lxi(..)
            | Instruction::Shld(..)
            | Instruction::Lhld(..)
            | Instruction::Sta(..)
            | Instruction::Lda(..)
            | Instruction::Jcond(..)
            | Instruction::Jmp(..)
            | Instruction::Ccond(..)
            | Instruction::Call(..) => 3,
            Instruction::Mvi(..)
            | Instruction::Adi(..)
            | Instruction::Aci(..)
            | Instruction::Sui(..)
            | Instruction::Sbi(..)
            | Instruction::Ani(..)
            | Instruction::Xri(..)
            | Instruction::Ori(..)
            | Instruction::Cpi(..)
            | Instruction::Out(..)
            | Instruction::In(..) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => f.write_str("NOP"),
            Instruction::Lxi(rp, data) => write!(f, "LXI {rp}, 0x{data:04X}"),
            Instruction::Stax(rp) => write!(f, "STAX {rp}"),
            Instruction::Inx(rp) => write!(f, "INX {rp}"),
            Instruction::Inr(r) => write!(f, "INR {r}"),
            Instruction::Dcr(r) => write!(f, "DCR {r}"),
            Instruction::Mvi(r, data) => write!(f, "MVI {r}, 0x{data:02X}"),
            Instruction::Dad(rp) => write!(f, "DAD {rp}"),
            Instruction::Ldax(rp) => write!(f, "LDAX {rp}"),
            Instruction::Dcx(rp) => write!(f, "DCX {rp}"),
            Instruction::Rlc => f.write_str("RLC"),
            Instruction::Rrc => f.write_str("RRC"),
            Instruction::Ral => f.write_str("RAL"),
            Instruction::Rar => f.write_str("RAR"),
            Instruction::Shld(addr) => write!(f, "SHLD 0x{addr:04X}"),
            Instruction::Daa => f.write_str("DAA"),
            Instruction::Lhld(addr) => write!(f, "LHLD 0x{addr:04X}"),
            Instruction::Cma => f.write_str("CMA"),
            Instruction::Sta(addr) => write!(f, "STA 0x{addr:04X}"),
            Instruction::Stc => f.write_str("STC"),
            Instruction::Lda(addr) => write!(f, "LDA 0x{addr:04X}"),
            Instruction::Cmc => f.write_str("CMC"),
            Instruction::Mov(dst, src) => write!(f, "MOV {dst}, {src}"),
            Instruction::Hlt => f.write_str("HLT"),
            Instruction::Add(r) => write!(f, "ADD {r}"),
            Instruction::Adc(r) => write!(f, "ADC {r}"),
            Instruction::Sub(r) => write!(f, "SUB {r}"),
            Instruction::Sbb(r) => write!(f, "SBB {r}"),
            Instruction::Ana(r) => write!(f, "ANA {r}"),
            Instruction::Xra(r) => write!(f, "XRA {r}"),
            Instruction::Ora(r) => write!(f, "ORA {r}"),
            Instruction::Cmp(r) => write!(f, "CMP {r}"),
            Instruction::Rcond(cc) => write!(f, "R{}", cc.suffix()),
            Instruction::Pop(rp) => write!(f, "POP {rp}"),
            Instruction::Jcond(cc, addr) => write!(f, "J{} 0x{addr:04X}", cc.suffix()),
            Instruction::Jmp(addr) => write!(f, "JMP 0x{addr:04X}"),
            Instruction::Ccond(cc, addr) => write!(f, "C{} 0x{addr:04X}", cc.suffix()),
            Instruction::Push(rp) => write!(f, "PUSH {rp}"),
            Instruction::Adi(data) => write!(f, "ADI 0x{data:02X}"),
            Instruction::Aci(data) => write!(f, "ACI 0x{data:02X}"),
            Instruction::Sui(data) => write!(f, "SUI 0x{data:02X}"),
            Instruction::Sbi(data) => write!(f, "SBI 0x{data:02X}"),
            Instruction::Ani(data) => write!(f, "ANI 0x{data:02X}"),
            Instruction::Xri(data) => write!(f, "XRI 0x{data:02X}"),
            Instruction::Ori(data) => write!(f, "ORI 0x{data:02X}"),
            Instruction::Cpi(data) => write!(f, "CPI 0x{data:02X}"),
            Instruction::Rst(n) => write!(f, "RST {n}"),
            Instruction::Ret => f.write_str("RET"),
            Instruction::Call(addr) => write!(f, "CALL 0x{addr:04X}"),
            Instruction::Out(port) => write!(f, "OUT 0x{port:02X}"),
            Instruction::In(port) => write!(f, "IN 0x{port:02X}"),
            Instruction::Xthl => f.write_str("XTHL"),
            Instruction::Pchl => f.write_str("PCHL"),
            Instruction::Xchg => f.write_str("XCHG"),
            Instruction::Di => f.write_str("DI"),
            Instruction::Sphl => f.write_str("SPHL"),
            Instruction::Ei => f.write_str("EI"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_match_operand_widths() {
        assert_eq!(Instruction::Nop.len(), 1);
        assert_eq!(Instruction::Mvi(Register::A, 0x3E).len(), 2);
        assert_eq!(Instruction::Lxi(RegisterPair::Sp, 0x2400).len(), 3);
        assert_eq!(Instruction::Rst(RestartIndex::from_code(2)).len(), 1);
    }

    #[test]
    fn display_uses_assembly_mnemonics() {
        assert_eq!(
            Instruction::Mov(Register::A, Register::M).to_string(),
            "MOV A, M"
        );
        assert_eq!(
            Instruction::Jcond(Condition::NonZero, 0x0100).to_string(),
            "JNZ 0x0100"
        );
        assert_eq!(Instruction::Push(StackPair::Psw).to_string(), "PUSH PSW");
    }
}
