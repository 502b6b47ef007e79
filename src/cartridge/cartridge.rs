//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper, etc.), optional
//! 512-byte trainer, then PRG ROM, then CHR ROM. Only the raw data and header metadata are
//! exposed; mapping PRG onto the CPU bus is the caller's choice (see [`Cartridge::nrom_mappings`]).

use std::fs;
use std::path::Path;

use crate::cartridge::Mirroring;
use crate::error::CartridgeError;

/// "NES\x1A" read as a little-endian u32.
pub const INES_SIGNATURE: u32 = 0x1A53454E;
pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_BANK_LEN: usize = 16 * 1024;
pub const CHR_BANK_LEN: usize = 8 * 1024;
pub const PRG_RAM_BANK_LEN: usize = 8 * 1024;

const FLAG6_VERTICAL: u8 = 1 << 0;
const FLAG6_BATTERY: u8 = 1 << 1;
const FLAG6_TRAINER: u8 = 1 << 2;
const FLAG6_FOUR_SCREEN: u8 = 1 << 3;

/// Cartridge: PRG/CHR data plus the header fields the rest of the system needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    /// Empty when the board uses CHR RAM.
    pub chr_rom: Vec<u8>,
    pub trainer: Option<Vec<u8>>,
    /// Low nibble of byte 6 | high nibble of byte 7.
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    /// Byte 8 in 8 KiB units; 0 means one bank for compatibility.
    pub prg_ram_size: usize,
}

impl Cartridge {
    /// Load cartridge from an iNES file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an iNES image. A zero CHR size yields an empty `chr_rom`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_LEN {
            return Err(CartridgeError::Truncated {
                needed: HEADER_LEN,
                actual: data.len(),
            });
        }

        let signature = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if signature != INES_SIGNATURE {
            return Err(CartridgeError::BadSignature(signature));
        }

        let prg_rom_size = data[4] as usize * PRG_BANK_LEN;
        let chr_rom_size = data[5] as usize * CHR_BANK_LEN;
        let flags6 = data[6];
        let flags7 = data[7];

        let has_trainer = flags6 & FLAG6_TRAINER != 0;
        let prg_start = HEADER_LEN + if has_trainer { TRAINER_LEN } else { 0 };
        let prg_end = prg_start + prg_rom_size;
        let chr_end = prg_end + chr_rom_size;

        if data.len() < chr_end {
            return Err(CartridgeError::Truncated {
                needed: chr_end,
                actual: data.len(),
            });
        }

        let mirroring = if flags6 & FLAG6_FOUR_SCREEN != 0 {
            Mirroring::FourScreen
        } else if flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            prg_rom: data[prg_start..prg_end].to_vec(),
            chr_rom: data[prg_end..chr_end].to_vec(),
            trainer: has_trainer.then(|| data[HEADER_LEN..prg_start].to_vec()),
            mapper_id: (flags6 >> 4) | (flags7 & 0xF0),
            mirroring,
            battery: flags6 & FLAG6_BATTERY != 0,
            prg_ram_size: (data[8].max(1)) as usize * PRG_RAM_BANK_LEN,
        })
    }

    /// Like [`Cartridge::from_bytes`], but a board without CHR ROM is an error.
    pub fn from_bytes_strict(data: &[u8]) -> Result<Self, CartridgeError> {
        let cart = Self::from_bytes(data)?;
        if cart.has_chr_ram() {
            return Err(CartridgeError::NoChrRom);
        }
        Ok(cart)
    }

    pub fn has_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    /// NROM layout of PRG on the CPU bus: a 16 KiB image appears at both $8000
    /// and $C000, anything larger starts at $8000.
    pub fn nrom_mappings(&self) -> Vec<(u16, Vec<u8>)> {
        if self.prg_rom.len() == PRG_BANK_LEN {
            vec![(0x8000, self.prg_rom.clone()), (0xC000, self.prg_rom.clone())]
        } else {
            vec![(0x8000, self.prg_rom.clone())]
        }
    }

    /// Reset vector ($FFFC) as seen through the NROM layout.
    pub fn reset_vector(&self) -> Option<u16> {
        let len = self.prg_rom.len();
        if len < 4 {
            return None;
        }
        Some(u16::from_le_bytes([self.prg_rom[len - 4], self.prg_rom[len - 3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags6, 0];
        data.resize(HEADER_LEN, 0);
        if flags6 & FLAG6_TRAINER != 0 {
            data.extend(std::iter::repeat_n(0x77, TRAINER_LEN));
        }
        data.extend(std::iter::repeat_n(0xAA, prg_banks as usize * PRG_BANK_LEN));
        data.extend(std::iter::repeat_n(0xBB, chr_banks as usize * CHR_BANK_LEN));
        data
    }

    #[test]
    fn parses_prg_and_chr() {
        let cart = Cartridge::from_bytes(&image(1, 1, 0)).unwrap();
        assert_eq!(cart.prg_rom.len(), 16 * 1024);
        assert_eq!(cart.chr_rom.len(), 8 * 1024);
        assert!(cart.prg_rom.iter().all(|&b| b == 0xAA));
        assert!(cart.chr_rom.iter().all(|&b| b == 0xBB));
        assert_eq!(cart.mapper_id, 0);
        assert_eq!(cart.mirroring, Mirroring::Horizontal);
        assert_eq!(cart.prg_ram_size, 8 * 1024);
        assert!(cart.trainer.is_none());
    }

    #[test]
    fn trainer_shifts_prg_start() {
        let cart = Cartridge::from_bytes(&image(1, 1, FLAG6_TRAINER | FLAG6_VERTICAL)).unwrap();
        assert_eq!(cart.trainer.as_ref().map(Vec::len), Some(TRAINER_LEN));
        assert!(cart.prg_rom.iter().all(|&b| b == 0xAA));
        assert_eq!(cart.mirroring, Mirroring::Vertical);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = image(1, 1, 0);
        data[3] = 0x00;
        assert!(matches!(
            Cartridge::from_bytes(&data),
            Err(CartridgeError::BadSignature(0x0053454E))
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        let mut data = image(2, 1, 0);
        data.truncate(HEADER_LEN + PRG_BANK_LEN);
        assert!(matches!(
            Cartridge::from_bytes(&data),
            Err(CartridgeError::Truncated { .. })
        ));
        assert!(matches!(
            Cartridge::from_bytes(&[0x4E, 0x45]),
            Err(CartridgeError::Truncated { needed: 16, actual: 2 })
        ));
    }

    #[test]
    fn chr_ram_board_is_an_error_only_when_strict() {
        let data = image(1, 0, 0);
        assert!(Cartridge::from_bytes(&data).unwrap().has_chr_ram());
        assert!(matches!(
            Cartridge::from_bytes_strict(&data),
            Err(CartridgeError::NoChrRom)
        ));
    }

    #[test]
    fn mapper_number_combines_both_nibbles() {
        let mut data = image(1, 1, 0x10);
        data[7] = 0x40;
        assert_eq!(Cartridge::from_bytes(&data).unwrap().mapper_id, 0x41);
    }

    #[test]
    fn sixteen_kib_prg_is_mirrored() {
        let cart = Cartridge::from_bytes(&image(1, 1, 0)).unwrap();
        let bases: Vec<u16> = cart.nrom_mappings().iter().map(|(base, _)| *base).collect();
        assert_eq!(bases, [0x8000, 0xC000]);

        let cart = Cartridge::from_bytes(&image(2, 1, 0)).unwrap();
        assert_eq!(cart.nrom_mappings().len(), 1);
    }

    #[test]
    fn reset_vector_reads_last_prg_bank() {
        let mut data = image(1, 1, 0);
        let vector = HEADER_LEN + PRG_BANK_LEN - 4;
        data[vector] = 0x04;
        data[vector + 1] = 0xC0;
        assert_eq!(Cartridge::from_bytes(&data).unwrap().reset_vector(), Some(0xC004));
    }
}
