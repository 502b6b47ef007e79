//! NES cartridge loading.
//!
//! - **cartridge**: Parses iNES (.nes) images into PRG/CHR data and header metadata.
//!   Bank switching is out of scope; PRG is mapped linearly by the caller.

pub mod cartridge;

/// Nametable mirroring declared by the header (byte 6, bits 0 and 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}
