//! Operand types for the Leben-80 instruction set and their bit encodings.

use std::fmt;

/// Single 8-bit register operand. `M` addresses memory through the HL pair.
///
/// The 3-bit field encoding follows the DDD/SSS layout: B=0, C=1, D=2, E=3,
/// H=4, L=5, M=6, A=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    B,
    C,
    D,
    E,
    H,
    L,
    M,
    A,
}

impl Register {
    pub fn code(self) -> u8 {
        match self {
            Register::B => 0b000,
            Register::C => 0b001,
            Register::D => 0b010,
            Register::E => 0b011,
            Register::H => 0b100,
            Register::L => 0b101,
            Register::M => 0b110,
            Register::A => 0b111,
        }
    }

    /// Decodes a 3-bit DDD/SSS field. Every value is a register, so only the
    /// low three bits participate.
    pub fn from_code(bits: u8) -> Register {
        match bits & 0b111 {
            0b000 => Register::B,
            0b001 => Register::C,
            0b010 => Register::D,
            0b011 => Register::E,
            0b100 => Register::H,
            0b101 => Register::L,
            0b110 => Register::M,
            _ => Register::A,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
            Register::M => "M",
            Register::A => "A",
        };
        f.write_str(name)
    }
}

/// 16-bit register pair operand, RP field encoding BC=0, DE=1, HL=2, SP=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterPair {
    Bc,
    De,
    Hl,
    Sp,
}

impl RegisterPair {
    pub fn code(self) -> u8 {
        match self {
            RegisterPair::Bc => 0b00,
            RegisterPair::De => 0b01,
            RegisterPair::Hl => 0b10,
            RegisterPair::Sp => 0b11,
        }
    }

    pub fn from_code(bits: u8) -> RegisterPair {
        match bits & 0b11 {
            0b00 => RegisterPair::Bc,
            0b01 => RegisterPair::De,
            0b10 => RegisterPair::Hl,
            _ => RegisterPair::Sp,
        }
    }
}

impl fmt::Display for RegisterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterPair::Bc => "BC",
            RegisterPair::De => "DE",
            RegisterPair::Hl => "HL",
            RegisterPair::Sp => "SP",
        };
        f.write_str(name)
    }
}

/// Pair subset usable for indirect byte access (STAX/LDAX): BC and DE only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndirectPair {
    Bc,
    De,
}

impl IndirectPair {
    pub fn code(self) -> u8 {
        match self {
            IndirectPair::Bc => 0b00,
            IndirectPair::De => 0b01,
        }
    }

    pub fn from_code(bits: u8) -> Option<IndirectPair> {
        match bits & 0b11 {
            0b00 => Some(IndirectPair::Bc),
            0b01 => Some(IndirectPair::De),
            _ => None,
        }
    }

    pub fn widen(self) -> RegisterPair {
        match self {
            IndirectPair::Bc => RegisterPair::Bc,
            IndirectPair::De => RegisterPair::De,
        }
    }
}

impl fmt::Display for IndirectPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.widen().fmt(f)
    }
}

/// Pair set addressable by PUSH/POP: the SP slot is replaced by PSW
/// (accumulator + flag byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackPair {
    Bc,
    De,
    Hl,
    Psw,
}

impl StackPair {
    pub fn code(self) -> u8 {
        match self {
            StackPair::Bc => 0b00,
            StackPair::De => 0b01,
            StackPair::Hl => 0b10,
            StackPair::Psw => 0b11,
        }
    }

    pub fn from_code(bits: u8) -> StackPair {
        match bits & 0b11 {
            0b00 => StackPair::Bc,
            0b01 => StackPair::De,
            0b10 => StackPair::Hl,
            _ => StackPair::Psw,
        }
    }
}

impl fmt::Display for StackPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackPair::Bc => "BC",
            StackPair::De => "DE",
            StackPair::Hl => "HL",
            StackPair::Psw => "PSW",
        };
        f.write_str(name)
    }
}

/// Branch condition, CCC field encoding NZ=0 .. M=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    NonZero,
    Zero,
    NoCarry,
    Carry,
    ParityOdd,
    ParityEven,
    Plus,
    Minus,
}

impl Condition {
    pub fn code(self) -> u8 {
        match self {
            Condition::NonZero => 0b000,
            Condition::Zero => 0b001,
            Condition::NoCarry => 0b010,
            Condition::Carry => 0b011,
            Condition::ParityOdd => 0b100,
            Condition::ParityEven => 0b101,
            Condition::Plus => 0b110,
            Condition::Minus => 0b111,
        }
    }

    pub fn from_code(bits: u8) -> Condition {
        match bits & 0b111 {
            0b000 => Condition::NonZero,
            0b001 => Condition::Zero,
            0b010 => Condition::NoCarry,
            0b011 => Condition::Carry,
            0b100 => Condition::ParityOdd,
            0b101 => Condition::ParityEven,
            0b110 => Condition::Plus,
            _ => Condition::Minus,
        }
    }

    /// Suffix appended to the R/J/C mnemonic stems (RNZ, JZ, CPE, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Condition::NonZero => "NZ",
            Condition::Zero => "Z",
            Condition::NoCarry => "NC",
            Condition::Carry => "C",
            Condition::ParityOdd => "PO",
            Condition::ParityEven => "PE",
            Condition::Plus => "P",
            Condition::Minus => "M",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Restart vector index for RST; the target address is `8 * index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RestartIndex(u8);

impl RestartIndex {
    pub fn new(index: u8) -> Option<RestartIndex> {
        (index < 8).then_some(RestartIndex(index))
    }

    pub fn from_code(bits: u8) -> RestartIndex {
        RestartIndex(bits & 0b111)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn target(self) -> u16 {
        u16::from(self.0) * 8
    }
}

impl fmt::Display for RestartIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_codes_round_trip() {
        for bits in 0..8u8 {
            assert_eq!(Register::from_code(bits).code(), bits);
        }
    }

    #[test]
    fn indirect_pair_rejects_hl_and_sp() {
        assert_eq!(IndirectPair::from_code(0b10), None);
        assert_eq!(IndirectPair::from_code(0b11), None);
        assert_eq!(IndirectPair::from_code(0b01), Some(IndirectPair::De));
    }

    #[test]
    fn restart_index_bounds() {
        assert!(RestartIndex::new(7).is_some());
        assert!(RestartIndex::new(8).is_none());
        assert_eq!(RestartIndex::from_code(0b101).target(), 40);
    }
}
