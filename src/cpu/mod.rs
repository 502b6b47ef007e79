//! 6502 CPU emulation for the NES.
//!
//! Register/flag state, addressing modes, instruction handlers and the opcode
//! table; nestest-compatible. The fetch-decode-execute loop lives in
//! [`crate::engine`].

pub mod addressing;
pub mod cpu;
pub mod flags;
pub mod instructions;
pub mod opcodes;
