//! Opcode table: opcode byte -> handler, mnemonic, addressing mode, base
//! cycle cost, and whether the engine advances the PC after the handler runs.
//!
//! Built once per session and read-only afterwards. Registering the same byte
//! twice is a construction error; a fetched byte with no entry halts the
//! engine.

use crate::{
    bus::Bus,
    cpu::{addressing::AddressingMode, cpu::CPU, instructions::*},
    error::TableError,
};

use AddressingMode::{
    Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, Indirect, IndirectX,
    IndirectY, Relative, ZeroPage, ZeroPageX, ZeroPageY,
};

pub type Handler<B> = fn(&mut CPU<B>, AddressingMode);

/// Every official NMOS 6502 opcode byte. A table missing any of these
/// cannot run nestest's official section.
#[rustfmt::skip]
pub const OFFICIAL_OPCODES: [u8; 151] = [
    0x00, 0x01, 0x05, 0x06, 0x08, 0x09, 0x0A, 0x0D, 0x0E,
    0x10, 0x11, 0x15, 0x16, 0x18, 0x19, 0x1D, 0x1E,
    0x20, 0x21, 0x24, 0x25, 0x26, 0x28, 0x29, 0x2A, 0x2C, 0x2D, 0x2E,
    0x30, 0x31, 0x35, 0x36, 0x38, 0x39, 0x3D, 0x3E,
    0x40, 0x41, 0x45, 0x46, 0x48, 0x49, 0x4A, 0x4C, 0x4D, 0x4E,
    0x50, 0x51, 0x55, 0x56, 0x58, 0x59, 0x5D, 0x5E,
    0x60, 0x61, 0x65, 0x66, 0x68, 0x69, 0x6A, 0x6C, 0x6D, 0x6E,
    0x70, 0x71, 0x75, 0x76, 0x78, 0x79, 0x7D, 0x7E,
    0x81, 0x84, 0x85, 0x86, 0x88, 0x8A, 0x8C, 0x8D, 0x8E,
    0x90, 0x91, 0x94, 0x95, 0x96, 0x98, 0x99, 0x9A, 0x9D,
    0xA0, 0xA1, 0xA2, 0xA4, 0xA5, 0xA6, 0xA8, 0xA9, 0xAA, 0xAC, 0xAD, 0xAE,
    0xB0, 0xB1, 0xB4, 0xB5, 0xB6, 0xB8, 0xB9, 0xBA, 0xBC, 0xBD, 0xBE,
    0xC0, 0xC1, 0xC4, 0xC5, 0xC6, 0xC8, 0xC9, 0xCA, 0xCC, 0xCD, 0xCE,
    0xD0, 0xD1, 0xD5, 0xD6, 0xD8, 0xD9, 0xDD, 0xDE,
    0xE0, 0xE1, 0xE4, 0xE5, 0xE6, 0xE8, 0xE9, 0xEA, 0xEC, 0xED, 0xEE,
    0xF0, 0xF1, 0xF5, 0xF6, 0xF8, 0xF9, 0xFD, 0xFE,
];

/// One table entry.
pub struct Opcode<B: Bus> {
    pub code: u8,
    /// Three-letter name written to the trace.
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub cycles: u8,
    /// False for opcodes that set the PC themselves (JMP, JSR, RTS, RTI, BRK).
    pub auto_advance: bool,
    pub handler: Handler<B>,
}

// Manual impls: derive would demand `B: Clone`.
impl<B: Bus> Clone for Opcode<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Bus> Copy for Opcode<B> {}

impl<B: Bus> Opcode<B> {
    pub fn new(
        code: u8,
        mnemonic: &'static str,
        mode: AddressingMode,
        cycles: u8,
        handler: Handler<B>,
    ) -> Self {
        Self {
            code,
            mnemonic,
            mode,
            cycles,
            auto_advance: true,
            handler,
        }
    }

    /// Marks the entry as owning the PC.
    fn jumps(mut self) -> Self {
        self.auto_advance = false;
        self
    }

    pub fn operand_bytes(&self) -> u8 {
        self.mode.operand_bytes()
    }

    /// Total instruction length in bytes.
    pub fn size_bytes(&self) -> u8 {
        1 + self.operand_bytes()
    }
}

impl<B: Bus> std::fmt::Debug for Opcode<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Opcode")
            .field("code", &format_args!("${:02X}", self.code))
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("cycles", &self.cycles)
            .field("auto_advance", &self.auto_advance)
            .finish()
    }
}

pub struct OpcodeTable<B: Bus> {
    entries: [Option<Opcode<B>>; 256],
}

impl<B: Bus> OpcodeTable<B> {
    pub fn empty() -> Self {
        Self {
            entries: [None; 256],
        }
    }

    /// Registers `entries`, then checks that every byte in `required` is
    /// covered. Either failure aborts construction.
    pub fn build(
        entries: impl IntoIterator<Item = Opcode<B>>,
        required: &[u8],
    ) -> Result<Self, TableError> {
        let mut table = Self::empty();
        table.register_all(entries)?;
        table.require(required.iter().copied())?;
        Ok(table)
    }

    /// The 151 documented NMOS 6502 opcodes.
    pub fn documented() -> Result<Self, TableError> {
        Self::build(documented_opcodes(), &OFFICIAL_OPCODES)
    }

    /// Documented opcodes plus the stable undocumented ones exercised by
    /// nestest after its official-opcode section.
    pub fn with_undocumented() -> Result<Self, TableError> {
        let entries = documented_opcodes().into_iter().chain(undocumented_opcodes());
        Self::build(entries, &OFFICIAL_OPCODES)
    }

    pub fn register(&mut self, opcode: Opcode<B>) -> Result<(), TableError> {
        let slot = &mut self.entries[opcode.code as usize];
        if slot.is_some() {
            return Err(TableError::DuplicateOpcode(opcode.code));
        }
        *slot = Some(opcode);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        opcodes: impl IntoIterator<Item = Opcode<B>>,
    ) -> Result<(), TableError> {
        opcodes.into_iter().try_for_each(|op| self.register(op))
    }

    /// Checks that every byte in `required` has an entry.
    pub fn require(&self, required: impl IntoIterator<Item = u8>) -> Result<(), TableError> {
        for code in required {
            if self.get(code).is_none() {
                return Err(TableError::MissingOpcode(code));
            }
        }
        Ok(())
    }

    pub fn get(&self, code: u8) -> Option<&Opcode<B>> {
        self.entries[code as usize].as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opcode<B>> {
        self.entries.iter().flatten()
    }
}

pub(crate) fn documented_opcodes<B: Bus>() -> Vec<Opcode<B>> {
    vec![
        // ADC
        Opcode::new(0x69, "ADC", Immediate, 2, adc),
        Opcode::new(0x65, "ADC", ZeroPage, 3, adc),
        Opcode::new(0x75, "ADC", ZeroPageX, 4, adc),
        Opcode::new(0x6D, "ADC", Absolute, 4, adc),
        Opcode::new(0x7D, "ADC", AbsoluteX, 4, adc),
        Opcode::new(0x79, "ADC", AbsoluteY, 4, adc),
        Opcode::new(0x61, "ADC", IndirectX, 6, adc),
        Opcode::new(0x71, "ADC", IndirectY, 5, adc),
        // AND
        Opcode::new(0x29, "AND", Immediate, 2, and),
        Opcode::new(0x25, "AND", ZeroPage, 3, and),
        Opcode::new(0x35, "AND", ZeroPageX, 4, and),
        Opcode::new(0x2D, "AND", Absolute, 4, and),
        Opcode::new(0x3D, "AND", AbsoluteX, 4, and),
        Opcode::new(0x39, "AND", AbsoluteY, 4, and),
        Opcode::new(0x21, "AND", IndirectX, 6, and),
        Opcode::new(0x31, "AND", IndirectY, 5, and),
        // ASL
        Opcode::new(0x0A, "ASL", Accumulator, 2, asl),
        Opcode::new(0x06, "ASL", ZeroPage, 5, asl),
        Opcode::new(0x16, "ASL", ZeroPageX, 6, asl),
        Opcode::new(0x0E, "ASL", Absolute, 6, asl),
        Opcode::new(0x1E, "ASL", AbsoluteX, 7, asl),
        // Branches
        Opcode::new(0x90, "BCC", Relative, 2, bcc),
        Opcode::new(0xB0, "BCS", Relative, 2, bcs),
        Opcode::new(0xF0, "BEQ", Relative, 2, beq),
        Opcode::new(0x30, "BMI", Relative, 2, bmi),
        Opcode::new(0xD0, "BNE", Relative, 2, bne),
        Opcode::new(0x10, "BPL", Relative, 2, bpl),
        Opcode::new(0x50, "BVC", Relative, 2, bvc),
        Opcode::new(0x70, "BVS", Relative, 2, bvs),
        // BIT
        Opcode::new(0x24, "BIT", ZeroPage, 3, bit),
        Opcode::new(0x2C, "BIT", Absolute, 4, bit),
        // BRK
        Opcode::new(0x00, "BRK", Implied, 7, brk).jumps(),
        // Flag clears
        Opcode::new(0x18, "CLC", Implied, 2, clc),
        Opcode::new(0xD8, "CLD", Implied, 2, cld),
        Opcode::new(0x58, "CLI", Implied, 2, cli),
        Opcode::new(0xB8, "CLV", Implied, 2, clv),
        // CMP
        Opcode::new(0xC9, "CMP", Immediate, 2, cmp),
        Opcode::new(0xC5, "CMP", ZeroPage, 3, cmp),
        Opcode::new(0xD5, "CMP", ZeroPageX, 4, cmp),
        Opcode::new(0xCD, "CMP", Absolute, 4, cmp),
        Opcode::new(0xDD, "CMP", AbsoluteX, 4, cmp),
        Opcode::new(0xD9, "CMP", AbsoluteY, 4, cmp),
        Opcode::new(0xC1, "CMP", IndirectX, 6, cmp),
        Opcode::new(0xD1, "CMP", IndirectY, 5, cmp),
        // CPX / CPY
        Opcode::new(0xE0, "CPX", Immediate, 2, cpx),
        Opcode::new(0xE4, "CPX", ZeroPage, 3, cpx),
        Opcode::new(0xEC, "CPX", Absolute, 4, cpx),
        Opcode::new(0xC0, "CPY", Immediate, 2, cpy),
        Opcode::new(0xC4, "CPY", ZeroPage, 3, cpy),
        Opcode::new(0xCC, "CPY", Absolute, 4, cpy),
        // DEC / DEX / DEY
        Opcode::new(0xC6, "DEC", ZeroPage, 5, dec),
        Opcode::new(0xD6, "DEC", ZeroPageX, 6, dec),
        Opcode::new(0xCE, "DEC", Absolute, 6, dec),
        Opcode::new(0xDE, "DEC", AbsoluteX, 7, dec),
        Opcode::new(0xCA, "DEX", Implied, 2, dex),
        Opcode::new(0x88, "DEY", Implied, 2, dey),
        // EOR
        Opcode::new(0x49, "EOR", Immediate, 2, eor),
        Opcode::new(0x45, "EOR", ZeroPage, 3, eor),
        Opcode::new(0x55, "EOR", ZeroPageX, 4, eor),
        Opcode::new(0x4D, "EOR", Absolute, 4, eor),
        Opcode::new(0x5D, "EOR", AbsoluteX, 4, eor),
        Opcode::new(0x59, "EOR", AbsoluteY, 4, eor),
        Opcode::new(0x41, "EOR", IndirectX, 6, eor),
        Opcode::new(0x51, "EOR", IndirectY, 5, eor),
        // INC / INX / INY
        Opcode::new(0xE6, "INC", ZeroPage, 5, inc),
        Opcode::new(0xF6, "INC", ZeroPageX, 6, inc),
        Opcode::new(0xEE, "INC", Absolute, 6, inc),
        Opcode::new(0xFE, "INC", AbsoluteX, 7, inc),
        Opcode::new(0xE8, "INX", Implied, 2, inx),
        Opcode::new(0xC8, "INY", Implied, 2, iny),
        // Jumps and calls
        Opcode::new(0x4C, "JMP", Absolute, 3, jmp).jumps(),
        Opcode::new(0x6C, "JMP", Indirect, 5, jmp).jumps(),
        Opcode::new(0x20, "JSR", Absolute, 6, jsr).jumps(),
        // LDA
        Opcode::new(0xA9, "LDA", Immediate, 2, lda),
        Opcode::new(0xA5, "LDA", ZeroPage, 3, lda),
        Opcode::new(0xB5, "LDA", ZeroPageX, 4, lda),
        Opcode::new(0xAD, "LDA", Absolute, 4, lda),
        Opcode::new(0xBD, "LDA", AbsoluteX, 4, lda),
        Opcode::new(0xB9, "LDA", AbsoluteY, 4, lda),
        Opcode::new(0xA1, "LDA", IndirectX, 6, lda),
        Opcode::new(0xB1, "LDA", IndirectY, 5, lda),
        // LDX
        Opcode::new(0xA2, "LDX", Immediate, 2, ldx),
        Opcode::new(0xA6, "LDX", ZeroPage, 3, ldx),
        Opcode::new(0xB6, "LDX", ZeroPageY, 4, ldx),
        Opcode::new(0xAE, "LDX", Absolute, 4, ldx),
        Opcode::new(0xBE, "LDX", AbsoluteY, 4, ldx),
        // LDY
        Opcode::new(0xA0, "LDY", Immediate, 2, ldy),
        Opcode::new(0xA4, "LDY", ZeroPage, 3, ldy),
        Opcode::new(0xB4, "LDY", ZeroPageX, 4, ldy),
        Opcode::new(0xAC, "LDY", Absolute, 4, ldy),
        Opcode::new(0xBC, "LDY", AbsoluteX, 4, ldy),
        // LSR
        Opcode::new(0x4A, "LSR", Accumulator, 2, lsr),
        Opcode::new(0x46, "LSR", ZeroPage, 5, lsr),
        Opcode::new(0x56, "LSR", ZeroPageX, 6, lsr),
        Opcode::new(0x4E, "LSR", Absolute, 6, lsr),
        Opcode::new(0x5E, "LSR", AbsoluteX, 7, lsr),
        // NOP
        Opcode::new(0xEA, "NOP", Implied, 2, nop),
        // ORA
        Opcode::new(0x09, "ORA", Immediate, 2, ora),
        Opcode::new(0x05, "ORA", ZeroPage, 3, ora),
        Opcode::new(0x15, "ORA", ZeroPageX, 4, ora),
        Opcode::new(0x0D, "ORA", Absolute, 4, ora),
        Opcode::new(0x1D, "ORA", AbsoluteX, 4, ora),
        Opcode::new(0x19, "ORA", AbsoluteY, 4, ora),
        Opcode::new(0x01, "ORA", IndirectX, 6, ora),
        Opcode::new(0x11, "ORA", IndirectY, 5, ora),
        // Stack
        Opcode::new(0x48, "PHA", Implied, 3, pha),
        Opcode::new(0x08, "PHP", Implied, 3, php),
        Opcode::new(0x68, "PLA", Implied, 4, pla),
        Opcode::new(0x28, "PLP", Implied, 4, plp),
        // ROL / ROR
        Opcode::new(0x2A, "ROL", Accumulator, 2, rol),
        Opcode::new(0x26, "ROL", ZeroPage, 5, rol),
        Opcode::new(0x36, "ROL", ZeroPageX, 6, rol),
        Opcode::new(0x2E, "ROL", Absolute, 6, rol),
        Opcode::new(0x3E, "ROL", AbsoluteX, 7, rol),
        Opcode::new(0x6A, "ROR", Accumulator, 2, ror),
        Opcode::new(0x66, "ROR", ZeroPage, 5, ror),
        Opcode::new(0x76, "ROR", ZeroPageX, 6, ror),
        Opcode::new(0x6E, "ROR", Absolute, 6, ror),
        Opcode::new(0x7E, "ROR", AbsoluteX, 7, ror),
        // Returns
        Opcode::new(0x40, "RTI", Implied, 6, rti).jumps(),
        Opcode::new(0x60, "RTS", Implied, 6, rts).jumps(),
        // SBC
        Opcode::new(0xE9, "SBC", Immediate, 2, sbc),
        Opcode::new(0xE5, "SBC", ZeroPage, 3, sbc),
        Opcode::new(0xF5, "SBC", ZeroPageX, 4, sbc),
        Opcode::new(0xED, "SBC", Absolute, 4, sbc),
        Opcode::new(0xFD, "SBC", AbsoluteX, 4, sbc),
        Opcode::new(0xF9, "SBC", AbsoluteY, 4, sbc),
        Opcode::new(0xE1, "SBC", IndirectX, 6, sbc),
        Opcode::new(0xF1, "SBC", IndirectY, 5, sbc),
        // Flag sets
        Opcode::new(0x38, "SEC", Implied, 2, sec),
        Opcode::new(0xF8, "SED", Implied, 2, sed),
        Opcode::new(0x78, "SEI", Implied, 2, sei),
        // STA
        Opcode::new(0x85, "STA", ZeroPage, 3, sta),
        Opcode::new(0x95, "STA", ZeroPageX, 4, sta),
        Opcode::new(0x8D, "STA", Absolute, 4, sta),
        Opcode::new(0x9D, "STA", AbsoluteX, 5, sta),
        Opcode::new(0x99, "STA", AbsoluteY, 5, sta),
        Opcode::new(0x81, "STA", IndirectX, 6, sta),
        Opcode::new(0x91, "STA", IndirectY, 6, sta),
        // STX / STY
        Opcode::new(0x86, "STX", ZeroPage, 3, stx),
        Opcode::new(0x96, "STX", ZeroPageY, 4, stx),
        Opcode::new(0x8E, "STX", Absolute, 4, stx),
        Opcode::new(0x84, "STY", ZeroPage, 3, sty),
        Opcode::new(0x94, "STY", ZeroPageX, 4, sty),
        Opcode::new(0x8C, "STY", Absolute, 4, sty),
        // Transfers
        Opcode::new(0xAA, "TAX", Implied, 2, tax),
        Opcode::new(0xA8, "TAY", Implied, 2, tay),
        Opcode::new(0xBA, "TSX", Implied, 2, tsx),
        Opcode::new(0x8A, "TXA", Implied, 2, txa),
        Opcode::new(0x9A, "TXS", Implied, 2, txs),
        Opcode::new(0x98, "TYA", Implied, 2, tya),
    ]
}

fn undocumented_opcodes<B: Bus>() -> Vec<Opcode<B>> {
    let mut ops = vec![
        // LAX
        Opcode::new(0xA7, "LAX", ZeroPage, 3, lax),
        Opcode::new(0xB7, "LAX", ZeroPageY, 4, lax),
        Opcode::new(0xAF, "LAX", Absolute, 4, lax),
        Opcode::new(0xBF, "LAX", AbsoluteY, 4, lax),
        Opcode::new(0xA3, "LAX", IndirectX, 6, lax),
        Opcode::new(0xB3, "LAX", IndirectY, 5, lax),
        // SAX
        Opcode::new(0x87, "SAX", ZeroPage, 3, sax),
        Opcode::new(0x97, "SAX", ZeroPageY, 4, sax),
        Opcode::new(0x8F, "SAX", Absolute, 4, sax),
        Opcode::new(0x83, "SAX", IndirectX, 6, sax),
        // SBC mirror
        Opcode::new(0xEB, "SBC", Immediate, 2, sbc),
    ];

    // The read-modify-write combos share one layout across seven modes.
    let rmw: [(u8, &'static str, Handler<B>); 6] = [
        (0xC3, "DCP", dcp),
        (0xE3, "ISB", isc),
        (0x03, "SLO", slo),
        (0x23, "RLA", rla),
        (0x43, "SRE", sre),
        (0x63, "RRA", rra),
    ];
    for (base, mnemonic, handler) in rmw {
        ops.extend([
            Opcode::new(base, mnemonic, IndirectX, 8, handler),
            Opcode::new(base + 0x04, mnemonic, ZeroPage, 5, handler),
            Opcode::new(base + 0x0C, mnemonic, Absolute, 6, handler),
            Opcode::new(base + 0x10, mnemonic, IndirectY, 8, handler),
            Opcode::new(base + 0x14, mnemonic, ZeroPageX, 6, handler),
            Opcode::new(base + 0x18, mnemonic, AbsoluteY, 7, handler),
            Opcode::new(base + 0x1C, mnemonic, AbsoluteX, 7, handler),
        ]);
    }

    for code in [0x1A, 0x3A, 0x5A, 0x7A, 0xDA, 0xFA] {
        ops.push(Opcode::new(code, "NOP", Implied, 2, nop));
    }
    for code in [0x80, 0x82, 0x89, 0xC2, 0xE2] {
        ops.push(Opcode::new(code, "NOP", Immediate, 2, nop));
    }
    for code in [0x04, 0x44, 0x64] {
        ops.push(Opcode::new(code, "NOP", ZeroPage, 3, nop));
    }
    for code in [0x14, 0x34, 0x54, 0x74, 0xD4, 0xF4] {
        ops.push(Opcode::new(code, "NOP", ZeroPageX, 4, nop));
    }
    ops.push(Opcode::new(0x0C, "NOP", Absolute, 4, nop));
    for code in [0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC] {
        ops.push(Opcode::new(code, "NOP", AbsoluteX, 4, nop));
    }

    ops
}
