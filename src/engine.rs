//! Fetch-decode-execute loop.
//!
//! An [`Engine`] owns the CPU, its bus and the opcode table. A session starts
//! Idle; [`Engine::setup`] resets the CPU, maps program bytes and moves to
//! Running. Each step fetches the opcode at the PC, snapshots the trace
//! record, runs the handler, emits the line, then advances the PC by the
//! instruction size unless the entry owns the PC. Fetching a byte with no
//! table entry finishes the trace and halts the engine for good.

use log::{debug, error, trace};

use crate::{
    bus::{Bus, Memory, check_block},
    cpu::{cpu::CPU, opcodes::OpcodeTable},
    error::EngineError,
    trace::{TraceRecord, TraceSink},
};

/// Instruction budget for the nestest automation run.
pub const NESTEST_STEPS: usize = 5000;
pub const NESTEST_ENTRY: u16 = 0xC000;
pub const NESTEST_STATUS: u8 = 0x24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Halted,
}

/// Caller-controlled session start: replaces any reset-vector logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub entry_pc: u16,
    pub initial_status: u8,
    /// Blocks written to the bus before the first step, in order.
    pub mappings: Vec<(u16, Vec<u8>)>,
    /// Instructions executed by [`Engine::run`].
    pub step_budget: usize,
}

impl SessionConfig {
    pub fn new(entry_pc: u16, initial_status: u8, step_budget: usize) -> Self {
        Self {
            entry_pc,
            initial_status,
            mappings: Vec::new(),
            step_budget,
        }
    }

    pub fn map(mut self, base: u16, bytes: impl Into<Vec<u8>>) -> Self {
        self.mappings.push((base, bytes.into()));
        self
    }

    /// nestest automation mode: 16 KiB PRG mirrored at $8000 and $C000,
    /// start at $C000 with P = $24.
    pub fn nestest(prg_rom: &[u8]) -> Self {
        Self::new(NESTEST_ENTRY, NESTEST_STATUS, NESTEST_STEPS)
            .map(0x8000, prg_rom)
            .map(0xC000, prg_rom)
    }
}

pub struct Engine<B: Bus = Memory> {
    cpu: CPU<B>,
    table: OpcodeTable<B>,
    state: EngineState,
    step_budget: usize,
    steps: usize,
    cycles: u64,
}

impl Engine<Memory> {
    /// Engine over a zeroed flat 64 KiB memory.
    pub fn new(table: OpcodeTable<Memory>) -> Self {
        Self::with_bus(Memory::new(), table)
    }
}

impl<B: Bus> Engine<B> {
    pub fn with_bus(bus: B, table: OpcodeTable<B>) -> Self {
        Self {
            cpu: CPU::new(bus),
            table,
            state: EngineState::Idle,
            step_budget: 0,
            steps: 0,
            cycles: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn cpu(&self) -> &CPU<B> {
        &self.cpu
    }

    pub fn table(&self) -> &OpcodeTable<B> {
        &self.table
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Sum of base cycle costs; page-crossing and branch penalties are not
    /// modelled.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Idle -> Running. Resets the CPU, then applies the entry PC, the
    /// initial status and every mapping in order. Mappings are range-checked
    /// up front, so a rejected config leaves the CPU and bus untouched.
    pub fn setup(&mut self, config: &SessionConfig) -> Result<(), EngineError> {
        self.expect_state(EngineState::Idle)?;
        for (base, bytes) in &config.mappings {
            check_block(*base, bytes.len())?;
        }

        self.cpu.reset();
        self.cpu.pc = config.entry_pc;
        self.cpu.set_status(config.initial_status);

        for (base, bytes) in &config.mappings {
            debug!("mapping {} bytes at ${:04X}", bytes.len(), base);
            self.cpu.bus.write_block(*base, bytes)?;
        }

        self.step_budget = config.step_budget;
        self.state = EngineState::Running;
        debug!(
            "session running: entry ${:04X}, P={:02X}, budget {}",
            self.cpu.pc,
            self.cpu.status(),
            self.step_budget
        );
        Ok(())
    }

    /// Executes one instruction and returns its trace record.
    pub fn step<S: TraceSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<TraceRecord, EngineError> {
        self.expect_state(EngineState::Running)?;

        let pc = self.cpu.pc;
        let code = self.cpu.bus.read(pc);

        let Some(&opcode) = self.table.get(code) else {
            error!("unimplemented opcode ${:02X} at ${:04X}", code, pc);
            self.state = EngineState::Halted;
            // A flush failure here is logged, never returned.
            if let Err(err) = sink.finish() {
                error!("trace sink failed while halting: {}", err);
            }
            return Err(EngineError::UnimplementedOpcode { opcode: code, pc });
        };

        let record = TraceRecord::capture(&self.cpu, &opcode);
        (opcode.handler)(&mut self.cpu, opcode.mode);

        let line = record.to_string();
        trace!("{}", line);
        sink.append(&line)?;

        if opcode.auto_advance {
            self.cpu.pc = self.cpu.pc.wrapping_add(opcode.size_bytes() as u16);
        }

        self.steps += 1;
        self.cycles += opcode.cycles as u64;
        Ok(record)
    }

    /// Runs until the session's step budget is used up, then finishes the
    /// sink. Returns the number of instructions executed by this call.
    pub fn run<S: TraceSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize, EngineError> {
        let start = self.steps;
        while self.steps < self.step_budget {
            self.step(sink)?;
        }
        sink.finish()?;
        debug!(
            "budget reached after {} instructions, {} cycles",
            self.steps, self.cycles
        );
        Ok(self.steps - start)
    }

    fn expect_state(&self, expected: EngineState) -> Result<(), EngineError> {
        if self.state != expected {
            return Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::trace::MemorySink;

    fn engine() -> Engine {
        Engine::new(OpcodeTable::documented().unwrap())
    }

    #[test]
    fn setup_moves_idle_to_running() {
        let mut engine = engine();
        assert_eq!(engine.state(), EngineState::Idle);

        let config = SessionConfig::new(0x8000, 0x24, 1).map(0x8000, [0xEA]);
        engine.setup(&config).unwrap();

        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.cpu().pc, 0x8000);
        assert_eq!(engine.cpu().status(), 0x24);
        assert_eq!(engine.cpu().sp, 0xFD);
    }

    #[test]
    fn setup_twice_is_rejected() {
        let mut engine = engine();
        let config = SessionConfig::new(0x8000, 0x24, 1);
        engine.setup(&config).unwrap();
        assert!(matches!(
            engine.setup(&config),
            Err(EngineError::InvalidState {
                expected: EngineState::Idle,
                actual: EngineState::Running
            })
        ));
    }

    #[test]
    fn step_before_setup_is_rejected() {
        let mut engine = engine();
        let mut sink = MemorySink::new();
        assert!(matches!(
            engine.step(&mut sink),
            Err(EngineError::InvalidState { .. })
        ));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn oversized_mapping_fails_setup() {
        let mut engine = engine();
        let config = SessionConfig::new(0x8000, 0x24, 1).map(0xFFFF, [0xEA, 0xEA]);
        assert!(matches!(engine.setup(&config), Err(EngineError::Memory(_))));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn rejected_mapping_writes_nothing() {
        let mut engine = engine();
        let config = SessionConfig::new(0x8000, 0x24, 1)
            .map(0x8000, [0xA9, 0x01])
            .map(0xFFFF, [0xEA, 0xEA]);
        assert!(engine.setup(&config).is_err());

        let cpu = engine.cpu();
        assert_eq!(cpu.bus.read(0x8000), 0x00);
        assert_eq!(cpu.bus.read(0xFFFF), 0x00);
        assert_eq!((cpu.pc, cpu.sp, cpu.status()), (0, 0, 0x20));
    }

    /// Accepts lines but fails to flush.
    struct BrokenSink;

    impl TraceSink for BrokenSink {
        fn append(&mut self, _: &str) -> io::Result<()> {
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn halt_reports_opcode_even_if_sink_fails() {
        let mut engine = engine();
        let config = SessionConfig::new(0x8000, 0x24, 5).map(0x8000, [0xEA, 0x02]);
        engine.setup(&config).unwrap();

        let err = engine.run(&mut BrokenSink).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnimplementedOpcode {
                opcode: 0x02,
                pc: 0x8001
            }
        ));
        assert_eq!(engine.state(), EngineState::Halted);
    }

    #[test]
    fn table_is_the_one_given_at_construction() {
        let engine = Engine::new(OpcodeTable::with_undocumented().unwrap());
        assert_eq!(engine.table().len(), 231);
        assert_eq!(engine.table().get(0xEB).map(|op| op.mnemonic), Some("SBC"));
    }

    #[test]
    fn unimplemented_opcode_halts_and_keeps_trace() {
        let mut engine = engine();
        // LDA #$01, then an undocumented byte
        let config = SessionConfig::new(0x8000, 0x24, 10).map(0x8000, [0xA9, 0x01, 0x02]);
        engine.setup(&config).unwrap();

        let mut sink = MemorySink::new();
        let err = engine.run(&mut sink).unwrap_err();

        assert!(matches!(
            err,
            EngineError::UnimplementedOpcode {
                opcode: 0x02,
                pc: 0x8002
            }
        ));
        assert_eq!(engine.state(), EngineState::Halted);
        assert_eq!(
            sink.lines(),
            ["8000  A9 01    LDA A:00 X:00 Y:00 P:24 SP:FD"]
        );
        assert!(matches!(
            engine.step(&mut sink),
            Err(EngineError::InvalidState {
                actual: EngineState::Halted,
                ..
            })
        ));
    }

    #[test]
    fn run_stops_at_budget_and_counts_cycles() {
        let mut engine = engine();
        let config = SessionConfig::new(0x8000, 0x24, 3).map(0x8000, [0xEA; 8]);
        engine.setup(&config).unwrap();

        let mut sink = MemorySink::new();
        assert_eq!(engine.run(&mut sink).unwrap(), 3);
        assert_eq!(engine.steps(), 3);
        assert_eq!(engine.cycles(), 6);
        assert_eq!(engine.cpu().pc, 0x8003);
        assert_eq!(sink.lines().len(), 3);
    }

    #[test]
    fn jump_is_not_advanced_after_handler() {
        let mut engine = engine();
        let config = SessionConfig::new(0xC000, 0x24, 1).map(0xC000, [0x4C, 0xF5, 0xC5]);
        engine.setup(&config).unwrap();

        let mut sink = MemorySink::new();
        let record = engine.step(&mut sink).unwrap();

        assert_eq!(engine.cpu().pc, 0xC5F5);
        assert_eq!(record.mnemonic, "JMP");
        assert_eq!(
            sink.lines(),
            ["C000  4C F5 C5 JMP A:00 X:00 Y:00 P:24 SP:FD"]
        );
    }
}
