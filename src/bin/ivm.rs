// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Run an Intcode program, using stdin and stdout for I/O

use ivm::prelude::*;
use ivm::program::{Encoding, read_program};
use std::collections::VecDeque;
use std::error::Error;
use std::io::{self, BufRead, Write, stderr, stdin, stdout};
use std::num::ParseIntError;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum CodeFormat {
    /// comma-separated ASCII-encoded decimal numbers
    #[value(alias("text"))]
    #[value(alias("aoc"))]
    Ascii,
    /// little-endian 64-bit integers
    #[cfg_attr(target_endian = "little", value(alias("binary-native")))]
    #[value(name("binary-little-endian"), alias("binle"))]
    LittleEndian,
    #[cfg_attr(target_endian = "big", value(alias("binary-native")))]
    #[value(name("binary-big-endian"), alias("binbe"))]
    /// big-endian 64-bit integers
    BigEndian,
}

impl From<CodeFormat> for Encoding {
    fn from(format: CodeFormat) -> Self {
        match format {
            CodeFormat::Ascii => Encoding::Text,
            CodeFormat::LittleEndian => Encoding::LittleEndian,
            CodeFormat::BigEndian => Encoding::BigEndian,
        }
    }
}

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum IoMode {
    /// decimal ints, separated by whitespace or commas on input and one per line on output
    #[value(alias("num"))]
    Numbers,
    /// ASCII text, fed a line at a time; output ints outside of ASCII are printed as numbers
    #[value(alias("text"))]
    Ascii,
}

const VERSION: &str = concat!(env!("CARGO_CRATE_NAME"), '-', env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = VERSION)]
#[command(about = "Intcode virtual machine", long_about = None)]
struct Args {
    #[arg(help = "The program to run")]
    source: PathBuf,
    #[arg(help = "Format of the program file")]
    #[arg(short, long)]
    #[arg(default_value = "ascii")]
    format: CodeFormat,
    #[arg(help = "How to interpret input and output ints")]
    #[arg(short = 'm', long = "io")]
    #[arg(default_value = "numbers")]
    io_mode: IoMode,
    #[arg(long, help = "Stop after executing this many instructions")]
    max_steps: Option<u64>,
    #[arg(long, help = "Treat addresses at or past this as out of range")]
    memory_limit: Option<i64>,
    #[arg(long, help = "Print every executed instruction to stderr once stopped")]
    trace: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("an I/O error occured: {0}")]
    Io(#[from] io::Error),
    #[error("{0:?} is not a valid ASCII character")]
    InvalidAsciiChar(char),
    #[error("{token:?} is not a valid integer: {source}")]
    InvalidInt {
        token: Box<str>,
        #[source]
        source: ParseIntError,
    },
    #[error("program is waiting for input at address {0}, but stdin is exhausted")]
    InputExhausted(i64),
    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// Queue up the ints in one line of input
fn parse_line(mode: IoMode, line: &str, pending: &mut VecDeque<i64>) -> Result<(), CliError> {
    match mode {
        IoMode::Numbers => {
            for token in line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
            {
                let value = token.parse().map_err(|source| CliError::InvalidInt {
                    token: Box::from(token),
                    source,
                })?;
                pending.push_back(value);
            }
        }
        IoMode::Ascii => {
            if let Some(c) = line.chars().find(|c| !c.is_ascii()) {
                return Err(CliError::InvalidAsciiChar(c));
            }
            pending.extend(line.bytes().map(i64::from));
            pending.push_back(i64::from(b'\n'));
        }
    }
    Ok(())
}

/// Write one output int the way `mode` presents it
fn render<W: Write>(mode: IoMode, value: i64, out: &mut W) -> io::Result<()> {
    match (mode, u8::try_from(value)) {
        (IoMode::Ascii, Ok(byte)) if byte.is_ascii() => write!(out, "{}", char::from(byte)),
        _ => writeln!(out, "{value}"),
    }
}

/// Reads a line at a time, only once the program asks for input
struct TextInput<R> {
    mode: IoMode,
    lines: io::Lines<R>,
    pending: VecDeque<i64>,
    exhausted: bool,
    error: Option<CliError>,
}

impl<R: BufRead> TextInput<R> {
    fn new(mode: IoMode, reader: R) -> Self {
        Self {
            mode,
            lines: reader.lines(),
            pending: VecDeque::new(),
            exhausted: false,
            error: None,
        }
    }

    fn fill(&mut self) -> Result<bool, CliError> {
        // make sure any prompt is visible before blocking
        stdout().flush()?;
        let Some(line) = self.lines.next().transpose()? else {
            return Ok(false);
        };
        parse_line(self.mode, &line, &mut self.pending)?;
        Ok(true)
    }
}

impl<R: BufRead> Input for TextInput<R> {
    fn read(&mut self) -> Option<i64> {
        while self.pending.is_empty() {
            if self.exhausted || self.error.is_some() {
                return None;
            }
            match self.fill() {
                Ok(true) => (),
                Ok(false) => self.exhausted = true,
                Err(err) => self.error = Some(err),
            }
        }
        self.pending.pop_front()
    }
}

struct TextOutput<W> {
    mode: IoMode,
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> Output for TextOutput<W> {
    fn write(&mut self, value: i64) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = render(self.mode, value, &mut self.writer) {
            self.error = Some(err);
        }
    }
}

type TextMachine<R, W> = Machine<TextInput<R>, TextOutput<W>>;

/// Run until the program halts or `max_steps` runs out, turning every way it can stop early
/// into a [CliError]
fn drive<R: BufRead, W: Write>(
    machine: &mut TextMachine<R, W>,
    max_steps: Option<u64>,
) -> Result<State, CliError> {
    let result = machine.run(max_steps);
    machine.output_mut().writer.flush()?;
    if let Some(err) = machine.output_mut().error.take() {
        return Err(CliError::Io(err));
    }
    let state = result?;
    if state == State::Halted {
        return Ok(state);
    }
    if let Some(err) = machine.input_mut().error.take() {
        Err(err)
    } else if machine.input().exhausted {
        Err(CliError::InputExhausted(machine.program_counter()))
    } else {
        Ok(state)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let code = read_program(&args.source, args.format.into())?;
    info!(source = %args.source.display(), len = code.len(), "loaded program");

    let mut config = MachineConfig::new().with_trace(args.trace);
    if let Some(limit) = args.memory_limit {
        config = config.with_memory_limit(limit);
    }

    let input = TextInput::new(args.io_mode, stdin().lock());
    let output = TextOutput {
        mode: args.io_mode,
        writer: stdout(),
        error: None,
    };
    let mut machine = Machine::with_config(code, input, output, config);
    let result = drive(&mut machine, args.max_steps);

    if let Some(trace) = machine.show_trace() {
        eprint!("{trace}");
    }

    match result {
        Ok(State::Halted) => {
            debug!(steps = machine.steps(), "program halted");
            Ok(())
        }
        Ok(_) => {
            eprintln!("stopped after {} steps", machine.steps());
            Ok(())
        }
        Err(err @ CliError::Machine(_)) => {
            eprintln!("MACHINE FAULT\n");
            machine.write_diagnostic(&mut stderr(), 10)?;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
