//! Memory bus for the CPU.
//!
//! The core sees a flat 64 KiB address space. Mirroring, PPU/APU registers and
//! bank switching belong to the surrounding system, not to this bus.

use crate::error::MemoryError;

/// Size of the 6502 address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Checks that `len` bytes starting at `addr` fit below $10000.
pub fn check_block(addr: u16, len: usize) -> Result<(), MemoryError> {
    if addr as usize + len > MEMORY_SIZE {
        return Err(MemoryError::BlockOutOfRange { addr, len });
    }
    Ok(())
}

/// Trait for memory access used by the CPU.
pub trait Bus {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Little-endian 16-bit read. With `page_wrap` set and `addr` at $xxFF, the
    /// high byte comes from $xx00 instead of the next page (the 6502 indirect
    /// addressing bug).
    fn read_word(&self, addr: u16, page_wrap: bool) -> u16 {
        let lo = self.read(addr) as u16;
        let hi_addr = if page_wrap && addr & 0x00FF == 0x00FF {
            addr & 0xFF00
        } else {
            addr.wrapping_add(1)
        };
        let hi = self.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    /// Copy `data` to `addr..addr + data.len()`. Fails without writing anything
    /// if the block would run past $FFFF.
    fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<(), MemoryError> {
        check_block(addr, data.len())?;
        for (offset, byte) in data.iter().enumerate() {
            self.write(addr + offset as u16, *byte);
        }
        Ok(())
    }
}

/// Flat 64 KiB RAM. Every address is backed; there is no open bus.
pub struct Memory {
    ram: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            ram: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Raw view of the whole address space.
    pub fn as_slice(&self) -> &[u8] {
        &self.ram
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for Memory {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }

    fn write_block(&mut self, addr: u16, data: &[u8]) -> Result<(), MemoryError> {
        check_block(addr, data.len())?;
        let start = addr as usize;
        self.ram[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_word_is_little_endian() {
        let mut mem = Memory::new();
        mem.write(0x0200, 0x34);
        mem.write(0x0201, 0x12);
        assert_eq!(mem.read_word(0x0200, false), 0x1234);
    }

    #[test]
    fn page_wrap_takes_high_byte_from_same_page() {
        let mut mem = Memory::new();
        mem.write(0x10FF, 0xCD);
        mem.write(0x1000, 0xAB);
        mem.write(0x1100, 0xEE);

        assert_eq!(mem.read_word(0x10FF, true), 0xABCD);
        assert_eq!(mem.read_word(0x10FF, false), 0xEECD);
    }

    #[test]
    fn read_word_at_top_of_memory_wraps_to_zero() {
        let mut mem = Memory::new();
        mem.write(0xFFFF, 0x01);
        mem.write(0x0000, 0x80);
        assert_eq!(mem.read_word(0xFFFF, false), 0x8001);
    }

    #[test]
    fn write_block_fills_up_to_last_address() {
        let mut mem = Memory::new();
        let prg = vec![0xEA; 0x4000];
        mem.write_block(0xC000, &prg).unwrap();
        assert_eq!(mem.read(0xC000), 0xEA);
        assert_eq!(mem.read(0xFFFF), 0xEA);
        assert_eq!(mem.read(0xBFFF), 0x00);
    }

    #[test]
    fn write_block_past_end_fails_without_writing() {
        let mut mem = Memory::new();
        let err = mem.write_block(0xFFFE, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            MemoryError::BlockOutOfRange {
                addr: 0xFFFE,
                len: 3
            }
        );
        assert_eq!(mem.read(0xFFFE), 0);
        assert_eq!(mem.read(0x0000), 0);
    }
}
