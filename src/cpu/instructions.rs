//! Instruction handlers.
//!
//! Each handler receives the CPU with the PC still on its opcode and the
//! addressing mode from its table entry. Handlers for control flow set the PC
//! themselves; their table entries turn off the engine's PC advance.

use crate::{
    bus::Bus,
    cpu::{
        addressing::AddressingMode,
        cpu::{CPU, IRQ_VECTOR},
        flags::FLAG_BREAK,
    },
};

// Loads and stores

pub fn lda<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.a = cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.a);
}

pub fn ldx<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.x = cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.x);
}

pub fn ldy<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.y = cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.y);
}

pub fn sta<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let addr = cpu.operand_address(mode);
    cpu.bus.write(addr, cpu.a);
}

pub fn stx<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let addr = cpu.operand_address(mode);
    cpu.bus.write(addr, cpu.x);
}

pub fn sty<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let addr = cpu.operand_address(mode);
    cpu.bus.write(addr, cpu.y);
}

// Register transfers

pub fn tax<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.x = cpu.a;
    cpu.update_zero_and_negative_flags(cpu.x);
}

pub fn tay<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.y = cpu.a;
    cpu.update_zero_and_negative_flags(cpu.y);
}

pub fn tsx<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.x = cpu.sp;
    cpu.update_zero_and_negative_flags(cpu.x);
}

pub fn txa<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.a = cpu.x;
    cpu.update_zero_and_negative_flags(cpu.a);
}

/// The only transfer that leaves N and Z alone.
pub fn txs<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.sp = cpu.x;
}

pub fn tya<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.a = cpu.y;
    cpu.update_zero_and_negative_flags(cpu.a);
}

// Stack

pub fn pha<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.push(cpu.a);
}

pub fn php<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let status = cpu.status() | FLAG_BREAK;
    cpu.push(status);
}

pub fn pla<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.a = cpu.pop();
    cpu.update_zero_and_negative_flags(cpu.a);
}

pub fn plp<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.pop_status();
}

// Logic and arithmetic

pub fn and<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.a &= cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.a);
}

pub fn ora<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.a |= cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.a);
}

pub fn eor<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.a ^= cpu.operand_value(mode);
    cpu.update_zero_and_negative_flags(cpu.a);
}

pub fn bit<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.flags.zero = cpu.a & value == 0;
    cpu.flags.overflow = value & 0x40 != 0;
    cpu.flags.negative = value & 0x80 != 0;
}

pub fn adc<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.add_with_carry(value);
}

pub fn sbc<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.subtract_with_borrow(value);
}

pub fn cmp<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.compare(cpu.a, value);
}

pub fn cpx<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.compare(cpu.x, value);
}

pub fn cpy<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.compare(cpu.y, value);
}

// Increments and decrements

fn increment<B: Bus>(cpu: &mut CPU<B>, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    cpu.update_zero_and_negative_flags(result);
    result
}

fn decrement<B: Bus>(cpu: &mut CPU<B>, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    cpu.update_zero_and_negative_flags(result);
    result
}

pub fn inc<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, increment);
}

pub fn dec<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, decrement);
}

pub fn inx<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let value = cpu.x;
    cpu.x = increment(cpu, value);
}

pub fn iny<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let value = cpu.y;
    cpu.y = increment(cpu, value);
}

pub fn dex<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let value = cpu.x;
    cpu.x = decrement(cpu, value);
}

pub fn dey<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let value = cpu.y;
    cpu.y = decrement(cpu, value);
}

// Shifts and rotates

pub fn asl<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, CPU::shift_left);
}

pub fn lsr<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, CPU::shift_right);
}

pub fn rol<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, CPU::rotate_left);
}

pub fn ror<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.modify(mode, CPU::rotate_right);
}

// Branches

pub fn bcc<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(!cpu.flags.carry);
}

pub fn bcs<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(cpu.flags.carry);
}

pub fn beq<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(cpu.flags.zero);
}

pub fn bne<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(!cpu.flags.zero);
}

pub fn bmi<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(cpu.flags.negative);
}

pub fn bpl<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(!cpu.flags.negative);
}

pub fn bvc<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(!cpu.flags.overflow);
}

pub fn bvs<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.branch(cpu.flags.overflow);
}

// Flag set/clear

pub fn clc<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.carry = false;
}

pub fn cld<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.decimal = false;
}

pub fn cli<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.interrupt_disable = false;
}

pub fn clv<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.overflow = false;
}

pub fn sec<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.carry = true;
}

pub fn sed<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.decimal = true;
}

pub fn sei<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.flags.interrupt_disable = true;
}

// Jumps, calls and interrupts. These own the PC.

pub fn jmp<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    cpu.pc = cpu.operand_address(mode);
}

/// Pushes the address of the JSR's last byte; RTS adds the missing one.
pub fn jsr<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    let target = cpu.absolute();
    cpu.push_word(cpu.pc.wrapping_add(2));
    cpu.pc = target;
}

pub fn rts<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.pc = cpu.pop_word().wrapping_add(1);
}

pub fn rti<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.pop_status();
    cpu.pc = cpu.pop_word();
}

/// BRK is a two-byte instruction; the byte after the opcode is padding and
/// the pushed return address skips it.
pub fn brk<B: Bus>(cpu: &mut CPU<B>, _: AddressingMode) {
    cpu.push_word(cpu.pc.wrapping_add(2));

    let status = cpu.status() | FLAG_BREAK;
    cpu.push(status);

    cpu.flags.interrupt_disable = true;
    cpu.pc = cpu.bus.read_word(IRQ_VECTOR, false);
}

/// NOP in every addressing mode. The operand read has no side effect on a
/// flat bus, so nothing is touched.
pub fn nop<B: Bus>(_: &mut CPU<B>, _: AddressingMode) {}

// Undocumented NMOS opcodes

pub fn lax<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.operand_value(mode);
    cpu.a = value;
    cpu.x = value;
    cpu.update_zero_and_negative_flags(value);
}

pub fn sax<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let addr = cpu.operand_address(mode);
    cpu.bus.write(addr, cpu.a & cpu.x);
}

/// DEC then CMP.
pub fn dcp<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, |_, v| v.wrapping_sub(1));
    cpu.compare(cpu.a, value);
}

/// INC then SBC.
pub fn isc<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, |_, v| v.wrapping_add(1));
    cpu.subtract_with_borrow(value);
}

/// ASL then ORA.
pub fn slo<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, CPU::shift_left);
    cpu.a |= value;
    cpu.update_zero_and_negative_flags(cpu.a);
}

/// ROL then AND.
pub fn rla<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, CPU::rotate_left);
    cpu.a &= value;
    cpu.update_zero_and_negative_flags(cpu.a);
}

/// LSR then EOR.
pub fn sre<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, CPU::shift_right);
    cpu.a ^= value;
    cpu.update_zero_and_negative_flags(cpu.a);
}

/// ROR then ADC, with the carry out of the rotate feeding the add.
pub fn rra<B: Bus>(cpu: &mut CPU<B>, mode: AddressingMode) {
    let value = cpu.modify(mode, CPU::rotate_right);
    cpu.add_with_carry(value);
}
