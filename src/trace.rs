//! Instruction trace in the truncated nestest log layout:
//!
//! ```text
//! C000  4C F5 C5 JMP A:00 X:00 Y:00 P:24 SP:FD
//! ```
//!
//! Columns are left-aligned: PC in 6, instruction bytes in 9, mnemonic in 4,
//! then the registers as they were before the instruction ran.

use std::fmt;
use std::io::{self, Write};

use crate::{
    bus::Bus,
    cpu::{cpu::CPU, opcodes::Opcode},
    error::TraceError,
};

/// Pre-execution snapshot of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub pc: u16,
    /// Opcode and operand bytes; only the first `size` are meaningful.
    pub bytes: [u8; 3],
    pub size: u8,
    pub mnemonic: &'static str,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
}

impl TraceRecord {
    /// Snapshot `cpu` before `opcode` executes. Operand bytes are read up to
    /// the entry's declared size, whatever the handler goes on to read.
    pub fn capture<B: Bus>(cpu: &CPU<B>, opcode: &Opcode<B>) -> Self {
        let size = opcode.size_bytes();
        let mut bytes = [0; 3];
        for (i, byte) in bytes.iter_mut().enumerate().take(size as usize) {
            *byte = cpu.bus.read(cpu.pc.wrapping_add(i as u16));
        }

        Self {
            pc: cpu.pc,
            bytes,
            size,
            mnemonic: opcode.mnemonic,
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            p: cpu.status(),
            sp: cpu.sp,
        }
    }

    /// Instruction bytes as space-separated hex pairs.
    pub fn instruction_hex(&self) -> String {
        self.bytes[..self.size as usize]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<6}{:<9}{:<4}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            format!("{:04X}", self.pc),
            self.instruction_hex(),
            self.mnemonic,
            self.a,
            self.x,
            self.y,
            self.p,
            self.sp
        )
    }
}

/// Destination for trace lines. The engine appends one line per executed
/// instruction and calls `finish` when the session stops or halts.
pub trait TraceSink {
    fn append(&mut self, line: &str) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps the trace in memory. Used by tests and the conformance check.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// The whole trace, newline-joined.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl TraceSink for MemorySink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_owned());
        Ok(())
    }
}

/// Streams lines to any writer; flushes on finish.
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn append(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Line-by-line comparison of a produced trace against a reference. Every
/// produced line must match; a reference longer than the produced trace is
/// fine (the session may have a smaller budget).
pub fn compare_traces<E, A>(expected: &[E], actual: &[A]) -> Result<(), TraceError>
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    if expected.len() < actual.len() {
        return Err(TraceError::LengthMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    for (index, (want, got)) in expected.iter().zip(actual).enumerate() {
        let (want, got) = (want.as_ref(), got.as_ref());
        if want != got {
            return Err(TraceError::Diverged {
                index,
                expected: want.to_owned(),
                actual: got.to_owned(),
                previous: index
                    .checked_sub(1)
                    .map(|prev| actual[prev].as_ref().to_owned()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bytes: &[u8], mnemonic: &'static str) -> TraceRecord {
        let mut buf = [0; 3];
        buf[..bytes.len()].copy_from_slice(bytes);
        TraceRecord {
            pc: 0xC000,
            bytes: buf,
            size: bytes.len() as u8,
            mnemonic,
            a: 0,
            x: 0,
            y: 0,
            p: 0x24,
            sp: 0xFD,
        }
    }

    #[test]
    fn formats_three_byte_instruction() {
        let line = record(&[0x4C, 0xF5, 0xC5], "JMP").to_string();
        assert_eq!(line, "C000  4C F5 C5 JMP A:00 X:00 Y:00 P:24 SP:FD");
    }

    #[test]
    fn pads_short_instructions() {
        assert_eq!(
            record(&[0xA2, 0x00], "LDX").to_string(),
            "C000  A2 00    LDX A:00 X:00 Y:00 P:24 SP:FD"
        );
        assert_eq!(
            record(&[0xEA], "NOP").to_string(),
            "C000  EA       NOP A:00 X:00 Y:00 P:24 SP:FD"
        );
    }

    #[test]
    fn memory_sink_joins_lines() {
        let mut sink = MemorySink::new();
        assert_eq!(sink.text(), "");
        sink.append("first").unwrap();
        sink.append("second").unwrap();
        assert_eq!(sink.text(), "first\nsecond");
        assert_eq!(sink.into_lines(), ["first", "second"]);
    }

    #[test]
    fn writer_sink_writes_one_line_per_append() {
        let mut sink = WriterSink::new(Vec::new());
        sink.append("first").unwrap();
        sink.append("second").unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.into_inner(), b"first\nsecond\n");
    }

    #[test]
    fn compare_reports_first_divergence_with_previous_line() {
        let expected = ["a", "b", "c"];
        let actual = ["a", "b", "x"];
        assert_eq!(
            compare_traces(&expected, &actual),
            Err(TraceError::Diverged {
                index: 2,
                expected: "c".to_string(),
                actual: "x".to_string(),
                previous: Some("b".to_string()),
            })
        );
    }

    #[test]
    fn compare_first_line_has_no_previous() {
        let err = compare_traces(&["a"], &["b"]).unwrap_err();
        assert!(matches!(err, TraceError::Diverged { index: 0, previous: None, .. }));
    }

    #[test]
    fn compare_accepts_longer_reference() {
        assert!(compare_traces(&["a", "b"], &["a"]).is_ok());
        assert_eq!(
            compare_traces(&["a"], &["a", "b"]),
            Err(TraceError::LengthMismatch {
                expected: 1,
                actual: 2
            })
        );
    }
}
