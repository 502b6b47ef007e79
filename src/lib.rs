//! nestrace: a trace-exact 6502 CPU core for the NES.
//!
//! Executes PRG code against a flat 64 KiB address space and emits one trace line per
//! instruction in the layout of the [nestest](https://www.nesdev.org/wiki/Emulator_tests)
//! reference log, so a run can be diffed line-for-line against known-good output.
//!
//! ## Modules (NESdev references)
//!
//! - **bus** – flat [CPU memory](https://www.nesdev.org/wiki/CPU_memory_map) with the
//!   indirect-addressing page-wrap read
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) parsing: PRG/CHR, trainer,
//!   mapper id, mirroring
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) registers,
//!   [status flags](https://www.nesdev.org/wiki/Status_flags), addressing modes, handlers
//!   and the opcode table
//! - **engine** – session setup and the fetch-decode-execute loop
//! - **trace** – trace records, sinks and reference comparison
//! - **error** – error types for all of the above

pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod engine;
pub mod error;
pub mod trace;

pub use bus::{Bus, Memory};
pub use cartridge::cartridge::Cartridge;
pub use engine::{Engine, EngineState, SessionConfig};
pub use error::{CartridgeError, EngineError, MemoryError, TableError, TraceError};
pub use trace::{MemorySink, TraceRecord, TraceSink, WriterSink, compare_traces};
