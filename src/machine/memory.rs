//! Flat 64 KiB address space.

use std::fmt;

pub const MEMORY_SIZE: usize = 1 << 16;

/// Byte-addressable memory covering the full 16-bit address space. 16-bit
/// accesses are little endian and wrap at the address-space boundary.
pub struct Memory(Box<[u8; MEMORY_SIZE]>);

impl Memory {
    pub fn new() -> Self {
        Memory(Box::new([0u8; MEMORY_SIZE]))
    }

    #[inline]
    pub fn read_u8(&self, address: u16) -> u8 {
        self.0[address as usize]
    }

    #[inline]
    pub fn write_u8(&mut self, address: u16, value: u8) {
        self.0[address as usize] = value;
    }

    #[inline]
    pub fn read_u16(&self, address: u16) -> u16 {
        let low = self.read_u8(address);
        let high = self.read_u8(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    #[inline]
    pub fn write_u16(&mut self, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_u8(address, low);
        self.write_u8(address.wrapping_add(1), high);
    }

    /// Copies `image` into memory starting at `origin`, wrapping if the image
    /// crosses the top of the address space.
    pub fn load(&mut self, origin: u16, image: &[u8]) {
        for (index, byte) in image.iter().enumerate() {
            self.write_u8(origin.wrapping_add(index as u16), *byte);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory").field("len", &MEMORY_SIZE).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bit_access_is_little_endian() {
        let mut memory = Memory::new();
        memory.write_u16(0x1000, 0xBEEF);
        assert_eq!(memory.read_u8(0x1000), 0xEF);
        assert_eq!(memory.read_u8(0x1001), 0xBE);
        assert_eq!(memory.read_u16(0x1000), 0xBEEF);
    }

    #[test]
    fn sixteen_bit_access_wraps_at_top_of_memory() {
        let mut memory = Memory::new();
        memory.write_u16(0xFFFF, 0x1234);
        assert_eq!(memory.read_u8(0xFFFF), 0x34);
        assert_eq!(memory.read_u8(0x0000), 0x12);
        assert_eq!(memory.read_u16(0xFFFF), 0x1234);
    }

    #[test]
    fn load_places_image_at_origin() {
        let mut memory = Memory::new();
        memory.load(0x0100, &[1, 2, 3]);
        assert_eq!(memory.read_u8(0x0100), 1);
        assert_eq!(memory.read_u8(0x0102), 3);
        assert_eq!(memory.read_u8(0x0103), 0);
        assert_eq!(&memory.as_slice()[0x0100..0x0103], &[1, 2, 3]);
        assert_eq!(memory.as_slice().len(), MEMORY_SIZE);
    }
}
