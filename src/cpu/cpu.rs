use crate::{
    bus::Bus,
    cpu::flags::{FLAG_BREAK, Status},
};

/// Base of the fixed stack page ($0100-$01FF).
pub const STACK_BASE: u16 = 0x0100;
/// Stack pointer after reset.
pub const RESET_SP: u8 = 0xFD;
/// BRK / IRQ vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Programmer-visible 6502 state plus the bus it executes against.
pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub flags: Status,
    pub bus: B,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            flags: Status::default(),
            bus,
        }
    }

    /// Power-on state: I and B set, everything else clear, SP at $FD.
    /// The PC is left alone; the session decides where execution starts.
    pub fn reset(&mut self) {
        self.flags = Status {
            interrupt_disable: true,
            break_flag: true,
            ..Status::default()
        };

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = RESET_SP; // resets at 0xFD instead of 0xFF for some reason
    }

    /// Packed P register.
    pub fn status(&self) -> u8 {
        self.flags.bits()
    }

    pub fn set_status(&mut self, value: u8) {
        self.flags = Status::from_bits(value);
    }

    pub(crate) fn push(&mut self, value: u8) {
        let addr = STACK_BASE | self.sp as u16;
        self.bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = STACK_BASE | self.sp as u16;
        self.bus.read(addr)
    }

    pub(crate) fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    pub(crate) fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    /// Pull P for PLP / RTI. The break bit never survives the pull.
    pub(crate) fn pop_status(&mut self) {
        let value = self.pop();
        self.set_status(value & !FLAG_BREAK);
    }

    pub(crate) fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.flags.zero = value == 0;
        self.flags.negative = value & 0x80 != 0;
    }

    /// A + M + C. Decimal mode is ignored, as on the 2A03.
    pub(crate) fn add_with_carry(&mut self, value: u8) {
        let carry_in = self.flags.carry as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.flags.carry = sum > 0xFF;
        self.flags.overflow = (self.a ^ result) & (value ^ result) & 0x80 != 0;

        self.a = result;
        self.update_zero_and_negative_flags(self.a);
    }

    /// A - M - !C, done as A + !M + C.
    pub(crate) fn subtract_with_borrow(&mut self, value: u8) {
        self.add_with_carry(!value);
    }

    /// CMP / CPX / CPY. Leaves V and the register untouched.
    pub(crate) fn compare(&mut self, register: u8, value: u8) {
        self.flags.carry = register >= value;
        self.flags.zero = register == value;
        self.flags.negative = register.wrapping_sub(value) & 0x80 != 0;
    }

    pub(crate) fn shift_left(&mut self, value: u8) -> u8 {
        self.flags.carry = value & 0x80 != 0;
        let result = value << 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    pub(crate) fn shift_right(&mut self, value: u8) -> u8 {
        self.flags.carry = value & 0x01 != 0;
        let result = value >> 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    pub(crate) fn rotate_left(&mut self, value: u8) -> u8 {
        let carry_in = self.flags.carry as u8;
        self.flags.carry = value & 0x80 != 0;
        let result = (value << 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    pub(crate) fn rotate_right(&mut self, value: u8) -> u8 {
        let carry_in = if self.flags.carry { 0x80 } else { 0 };
        self.flags.carry = value & 0x01 != 0;
        let result = (value >> 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    /// Relative branch. The PC still points at the branch opcode; the engine
    /// adds the instruction length afterwards, so the target is measured from
    /// the following instruction either way.
    pub(crate) fn branch(&mut self, condition: bool) {
        if condition {
            let offset = self.relative_offset();
            self.pc = self.pc.wrapping_add(offset as u16);
        }
    }
}
