//! nestrace entry point.
//!
//! Loads a cartridge, runs the CPU for a fixed number of instructions and
//! writes the trace to stdout, or checks it against a reference log.
//! Usage: nestrace [path/to/game.nes] [steps] [reference.log]
//! Set RUST_LOG=debug (or trace) for engine diagnostics on stderr.

use std::env;
use std::fs;
use std::io::{self, BufWriter};
use std::process::ExitCode;

use ansi_term::Colour::{Green, Red, Yellow};
use log::{Level, LevelFilter, Log, Metadata, Record};
use nestrace::{
    Cartridge, Engine, MemorySink, SessionConfig, WriterSink, compare_traces,
    cpu::opcodes::OpcodeTable, engine::NESTEST_STEPS,
};

/// Prints records to stderr with a coloured level tag.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => Red.bold().paint("ERROR"),
            Level::Warn => Yellow.bold().paint("WARN"),
            Level::Info => Green.bold().paint("INFO"),
            Level::Debug => Green.paint("DEBUG"),
            Level::Trace => Green.dimmed().paint("TRACE"),
        };
        eprintln!("{} {}", tag, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging() {
    let level = env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> ExitCode {
    init_logging();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "tests/data/nestest.nes".to_string());
    let steps = match args.next().map(|s| s.parse::<usize>()) {
        Some(Ok(n)) => n,
        Some(Err(err)) => {
            eprintln!("{} bad step count: {}", Red.bold().paint("ERROR"), err);
            return ExitCode::FAILURE;
        }
        None => NESTEST_STEPS,
    };
    let reference = args.next();

    match run(&path, steps, reference.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{} {}", Red.bold().paint("ERROR"), msg);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str, steps: usize, reference: Option<&str>) -> Result<(), String> {
    let cart = Cartridge::load(path).map_err(|e| format!("{}: {}", path, e))?;

    // nestest automation mode starts at $C000; anything else from its reset vector.
    let mut config = if path.contains("nestest") {
        SessionConfig::nestest(&cart.prg_rom)
    } else {
        let entry = cart
            .reset_vector()
            .ok_or_else(|| format!("{}: PRG ROM too small", path))?;
        let mut config = SessionConfig::new(entry, 0x24, steps);
        config.mappings = cart.nrom_mappings();
        config
    };
    config.step_budget = steps;

    let table = OpcodeTable::with_undocumented().map_err(|e| e.to_string())?;
    let mut engine = Engine::new(table);
    engine.setup(&config).map_err(|e| e.to_string())?;

    match reference {
        None => {
            let stdout = io::stdout();
            let mut sink = WriterSink::new(BufWriter::new(stdout.lock()));
            engine.run(&mut sink).map_err(|e| e.to_string())?;
            Ok(())
        }
        Some(reference) => {
            let expected = fs::read_to_string(reference)
                .map_err(|e| format!("{}: {}", reference, e))?;
            let expected: Vec<&str> = expected.lines().collect();

            let mut sink = MemorySink::new();
            let outcome = engine.run(&mut sink);
            // A halt still leaves a partial trace worth diffing.
            compare_traces(&expected[..], sink.lines()).map_err(|e| e.to_string())?;
            outcome.map_err(|e| e.to_string())?;

            println!(
                "{} {} lines match {}",
                Green.bold().paint("OK"),
                sink.lines().len(),
                reference
            );
            Ok(())
        }
    }
}
