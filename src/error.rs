//! Error types for cartridge parsing, opcode table construction, memory
//! mapping, execution and trace comparison.

use std::fmt;
use std::io;

use crate::engine::EngineState;

/// Failure while parsing an iNES container.
#[derive(Debug)]
pub enum CartridgeError {
    /// First four bytes were not `NES\x1A`. Holds the little-endian value read.
    BadSignature(u32),
    /// The image is shorter than its header claims.
    Truncated { needed: usize, actual: usize },
    /// CHR size field is zero; the board uses CHR RAM instead of CHR ROM.
    NoChrRom,
    Io(io::Error),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CartridgeError::BadSignature(sig) => {
                write!(f, "not a valid iNES ROM (signature 0x{:08X})", sig)
            }
            CartridgeError::Truncated { needed, actual } => {
                write!(f, "ROM image truncated: need {} bytes, have {}", needed, actual)
            }
            CartridgeError::NoChrRom => write!(f, "cartridge has CHR RAM instead of CHR ROM"),
            CartridgeError::Io(err) => write!(f, "failed to read ROM: {}", err),
        }
    }
}

impl std::error::Error for CartridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CartridgeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CartridgeError {
    fn from(err: io::Error) -> Self {
        CartridgeError::Io(err)
    }
}

/// Opcode table construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The same opcode byte was registered twice.
    DuplicateOpcode(u8),
    /// A required opcode byte has no entry.
    MissingOpcode(u8),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableError::DuplicateOpcode(op) => write!(f, "opcode ${:02X} registered twice", op),
            TableError::MissingOpcode(op) => write!(f, "opcode ${:02X} has no table entry", op),
        }
    }
}

impl std::error::Error for TableError {}

/// Caller contract violation on the memory bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A block write would run past $FFFF.
    BlockOutOfRange { addr: u16, len: usize },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryError::BlockOutOfRange { addr, len } => write!(
                f,
                "block of {} bytes at ${:04X} overflows the 64 KiB address space",
                len, addr
            ),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors surfaced by [`crate::engine::Engine`].
#[derive(Debug)]
pub enum EngineError {
    /// The fetched byte has no opcode table entry. The engine is halted.
    UnimplementedOpcode { opcode: u8, pc: u16 },
    /// The requested operation is not valid in the current state.
    InvalidState {
        expected: EngineState,
        actual: EngineState,
    },
    Memory(MemoryError),
    /// The trace sink failed to accept a line.
    Sink(io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::UnimplementedOpcode { opcode, pc } => {
                write!(f, "opcode not implemented: {:02X} at ${:04X}", opcode, pc)
            }
            EngineError::InvalidState { expected, actual } => {
                write!(f, "engine is {:?}, expected {:?}", actual, expected)
            }
            EngineError::Memory(err) => write!(f, "{}", err),
            EngineError::Sink(err) => write!(f, "trace sink failed: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Memory(err) => Some(err),
            EngineError::Sink(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemoryError> for EngineError {
    fn from(err: MemoryError) -> Self {
        EngineError::Memory(err)
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Sink(err)
    }
}

/// A produced trace does not match its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// First differing line. `previous` is the produced line before it, if any.
    Diverged {
        index: usize,
        expected: String,
        actual: String,
        previous: Option<String>,
    },
    /// The reference ran out before the produced trace did.
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TraceError::Diverged {
                index,
                expected,
                actual,
                previous,
            } => {
                writeln!(f, "trace diverged at line {}", index + 1)?;
                if let Some(prev) = previous {
                    writeln!(f, "  previous: {}", prev)?;
                }
                writeln!(f, "  expected: {}", expected)?;
                write!(f, "  actual:   {}", actual)
            }
            TraceError::LengthMismatch { expected, actual } => write!(
                f,
                "reference has {} lines but {} were produced",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for TraceError {}
