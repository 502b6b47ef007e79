//! 6502 processor status register (P) flag bits.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3;  // NES 2A03 has no BCD; stored but ignored
pub const FLAG_BREAK: u8 = 1 << 4;    // Set in the BRK / PHP stack frame
pub const FLAG_UNUSED: u8 = 1 << 5;   // Always 1 when read on 6502
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// The seven status flags as independent booleans.
///
/// Packs to the P register layout with bit 5 forced on. Unpacking ignores bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub break_flag: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Status {
    pub fn from_bits(value: u8) -> Self {
        Self {
            carry: value & FLAG_CARRY != 0,
            zero: value & FLAG_ZERO != 0,
            interrupt_disable: value & FLAG_INTERRUPT_DISABLE != 0,
            decimal: value & FLAG_DECIMAL != 0,
            break_flag: value & FLAG_BREAK != 0,
            overflow: value & FLAG_OVERFLOW != 0,
            negative: value & FLAG_NEGATIVE != 0,
        }
    }

    pub fn bits(self) -> u8 {
        let mut p = FLAG_UNUSED;
        for (set, bit) in [
            (self.carry, FLAG_CARRY),
            (self.zero, FLAG_ZERO),
            (self.interrupt_disable, FLAG_INTERRUPT_DISABLE),
            (self.decimal, FLAG_DECIMAL),
            (self.break_flag, FLAG_BREAK),
            (self.overflow, FLAG_OVERFLOW),
            (self.negative, FLAG_NEGATIVE),
        ] {
            if set {
                p |= bit;
            }
        }
        p
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        Status::from_bits(value)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.bits()
    }
}
