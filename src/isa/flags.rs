//! Condition flags in their PSW bit positions.

use bitflags::bitflags;

bitflags! {
    /// Processor status flags. Bit positions match the byte pushed by
    /// `PUSH PSW`: S Z 0 A 0 P 1 C.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConditionFlags: u8 {
        const CARRY = 1 << 0;
        const PARITY = 1 << 2;
        const AUX_CARRY = 1 << 4;
        const ZERO = 1 << 6;
        const SIGN = 1 << 7;
    }
}

impl ConditionFlags {
    /// Materialises the flag byte as stored on the stack by PUSH PSW.
    /// Bit 1 reads as one, bits 3 and 5 read as zero.
    pub fn to_psw_byte(self) -> u8 {
        self.bits() | 0b0000_0010
    }

    /// Restores flags from a PSW byte, discarding the constant bits.
    pub fn from_psw_byte(byte: u8) -> ConditionFlags {
        ConditionFlags::from_bits_truncate(byte)
    }

    /// Sets Zero, Sign, and Parity from an 8-bit result. Parity is even
    /// parity over all eight bits.
    pub fn set_zsp(&mut self, value: u8) {
        self.set(ConditionFlags::ZERO, value == 0);
        self.set(ConditionFlags::SIGN, value & 0x80 != 0);
        self.set(ConditionFlags::PARITY, value.count_ones() % 2 == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psw_byte_keeps_constant_bits() {
        let mut flags = ConditionFlags::empty();
        flags.insert(ConditionFlags::CARRY | ConditionFlags::ZERO);
        assert_eq!(flags.to_psw_byte(), 0b0100_0011);
        assert_eq!(ConditionFlags::from_psw_byte(0b0100_0011), flags);
    }

    #[test]
    fn zsp_helper_matches_definitions() {
        let mut flags = ConditionFlags::empty();
        flags.set_zsp(0x00);
        assert!(flags.contains(ConditionFlags::ZERO));
        assert!(flags.contains(ConditionFlags::PARITY), "0x00 has even parity");
        assert!(!flags.contains(ConditionFlags::SIGN));

        flags.set_zsp(0x80);
        assert!(!flags.contains(ConditionFlags::ZERO));
        assert!(flags.contains(ConditionFlags::SIGN));
        assert!(!flags.contains(ConditionFlags::PARITY), "one set bit is odd");
    }
}
