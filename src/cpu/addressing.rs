//! Addressing-mode resolution.
//!
//! Every resolver reads operands relative to the PC of the opcode being
//! executed (the PC is advanced by the engine only after the handler runs).
//! None of them mutate state, so a handler may resolve the same operand twice.

use crate::{bus::Bus, cpu::cpu::CPU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

impl<B: Bus> CPU<B> {
    fn operand_byte(&self) -> u8 {
        self.bus.read(self.pc.wrapping_add(1))
    }

    fn operand_word(&self) -> u16 {
        self.bus.read_word(self.pc.wrapping_add(1), false)
    }

    pub(crate) fn immediate(&self) -> u8 {
        self.operand_byte()
    }

    pub(crate) fn relative_offset(&self) -> i8 {
        self.operand_byte() as i8
    }

    pub(crate) fn zero_page(&self) -> u16 {
        self.operand_byte() as u16
    }

    // Indexed zero page stays inside page zero.
    pub(crate) fn zero_page_x(&self) -> u16 {
        self.operand_byte().wrapping_add(self.x) as u16
    }

    pub(crate) fn zero_page_y(&self) -> u16 {
        self.operand_byte().wrapping_add(self.y) as u16
    }

    pub(crate) fn absolute(&self) -> u16 {
        self.operand_word()
    }

    pub(crate) fn absolute_x(&self) -> u16 {
        self.operand_word().wrapping_add(self.x as u16)
    }

    pub(crate) fn absolute_y(&self) -> u16 {
        self.operand_word().wrapping_add(self.y as u16)
    }

    /// JMP ($xxFF) fetches its high byte from $xx00.
    pub(crate) fn indirect(&self) -> u16 {
        self.bus.read_word(self.operand_word(), true)
    }

    pub(crate) fn indirect_x(&self) -> u16 {
        let ptr = self.operand_byte().wrapping_add(self.x) as u16;
        self.bus.read_word(ptr, true)
    }

    pub(crate) fn indirect_y(&self) -> u16 {
        let ptr = self.zero_page();
        self.bus.read_word(ptr, true).wrapping_add(self.y as u16)
    }

    /// Effective address for `mode`. Immediate and relative operands resolve
    /// to the operand byte itself; implied and accumulator modes have no
    /// operand and resolve to the opcode address.
    pub(crate) fn operand_address(&self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => self.pc,
            AddressingMode::Immediate | AddressingMode::Relative => self.pc.wrapping_add(1),
            AddressingMode::ZeroPage => self.zero_page(),
            AddressingMode::ZeroPageX => self.zero_page_x(),
            AddressingMode::ZeroPageY => self.zero_page_y(),
            AddressingMode::Absolute => self.absolute(),
            AddressingMode::AbsoluteX => self.absolute_x(),
            AddressingMode::AbsoluteY => self.absolute_y(),
            AddressingMode::Indirect => self.indirect(),
            AddressingMode::IndirectX => self.indirect_x(),
            AddressingMode::IndirectY => self.indirect_y(),
        }
    }

    /// Operand value for `mode`; the accumulator for accumulator mode.
    pub(crate) fn operand_value(&self, mode: AddressingMode) -> u8 {
        match mode {
            AddressingMode::Accumulator => self.a,
            AddressingMode::Immediate => self.immediate(),
            _ => self.bus.read(self.operand_address(mode)),
        }
    }

    /// Read-modify-write on memory or on A.
    pub(crate) fn modify(&mut self, mode: AddressingMode, op: fn(&mut Self, u8) -> u8) -> u8 {
        if mode == AddressingMode::Accumulator {
            let value = self.a;
            let result = op(self, value);
            self.a = result;
            return result;
        }
        let addr = self.operand_address(mode);
        let value = self.bus.read(addr);
        let result = op(self, value);
        self.bus.write(addr, result);
        result
    }
}
