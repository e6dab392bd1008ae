// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Recording of executed instructions
use std::fmt::{self, Display};
use std::io::{self, Write};

use super::internals::Fetched;
use super::{Machine, OpCode, ParamMode};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Information about an instruction that a [Machine] executed, which can be queried with its
/// various methods, or converted into a [String] using its [Display] impl.
pub struct TracedInstr {
    address: i64,
    op_int: i64,
    rel_base: i64,
    opcode: OpCode,
    modes: [ParamMode; 3],
    /// each parameter as it was in memory, and what it resolved to
    params: [(i64, i64); 3],
    stored: Option<i64>,
}

impl TracedInstr {
    /// Return the relative base at the time the traced instruction was executed
    pub fn rel_base(&self) -> i64 {
        self.rel_base
    }

    /// Return the address of the traced instruction
    pub fn instr_ptr(&self) -> i64 {
        self.address
    }

    /// Return the actual integer of the traced instruction
    pub fn op_int(&self) -> i64 {
        self.op_int
    }

    /// Return the opcode of the traced instruction
    pub fn op_code(&self) -> OpCode {
        self.opcode
    }

    /// If the instruction stored a value, return that value
    pub fn stored_val(&self) -> Option<i64> {
        self.stored
    }

    /// Return an array of the parameter modes of the traced instruction
    ///
    /// Modes for parameters the opcode doesn't take are always [ParamMode::Positional].
    pub fn param_modes(&self) -> [ParamMode; 3] {
        self.modes
    }

    /// Return each parameter as `(raw, resolved)` pairs.
    ///
    /// For read parameters, the resolved value is the value that was used. For the destination of
    /// a store, it's the address that was written to.
    pub fn params(&self) -> &[(i64, i64)] {
        &self.params[..self.opcode.param_count()]
    }

    fn build(instr: &Fetched, rel_base: i64, resolved: &[i64], stored: Option<i64>) -> Self {
        debug_assert_eq!(resolved.len(), instr.opcode.param_count());
        let mut params = [(0, 0); 3];
        for ((param, &raw), &value) in params.iter_mut().zip(&instr.raw).zip(resolved) {
            *param = (raw, value);
        }
        Self {
            address: instr.address,
            op_int: instr.word,
            rel_base,
            opcode: instr.opcode,
            modes: instr.modes,
            params,
            stored,
        }
    }
}

impl Display for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ran instruction at {:0>4}: op int {: <5} | [{}",
            self.address, self.op_int, self.opcode
        )?;
        for (i, (&(raw, resolved), mode)) in self.params().iter().zip(self.modes).enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            if mode == ParamMode::Immediate {
                write!(f, "{sep}{mode}{raw}")?;
            } else {
                write!(f, "{sep}{mode}{raw} (resolves to {resolved})")?;
            }
        }
        write!(f, "]")?;
        match self.opcode {
            OpCode::Jnz | OpCode::Jz => {
                let cond = self.params[0].1;
                let jumped = (self.opcode == OpCode::Jnz) == (cond != 0);
                if jumped {
                    write!(f, " (jumped)")?;
                } else {
                    write!(f, " (didn't jump)")?;
                }
            }
            OpCode::Rbo => write!(
                f,
                " (went from {} to {})",
                self.rel_base,
                self.rel_base.saturating_add(self.params[0].1)
            )?,
            _ => (),
        }
        if let Some(stored) = self.stored {
            write!(f, " (stored {stored})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A log of instructions that a [Machine] has executed since a call to [Machine::start_trace]
pub struct Trace(pub Vec<TracedInstr>);

impl Trace {
    pub(crate) fn push(
        &mut self,
        instr: &Fetched,
        rel_base: i64,
        resolved: &[i64],
        stored: Option<i64>,
    ) {
        self.0
            .push(TracedInstr::build(instr, rel_base, resolved, stored));
    }
}

impl Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|instr| writeln!(f, "{instr}"))
    }
}

impl<I, O> Machine<I, O> {
    /// Begin a [Trace] of executed instructions. If a trace is already running, this replaces that
    /// trace and returns it in a [`Some`], otherwise, it returns [`None`].
    ///
    /// # Example
    /// ```
    /// # use ivm::prelude::*;
    /// let mut machine = Machine::new([1101, 90, 9, 4, 33], (), ());
    /// machine.start_trace();
    /// machine.run(None).unwrap();
    /// let trace = machine.end_trace().unwrap();
    /// assert_eq!(trace.0.len(), 2);
    /// assert_eq!(trace.0[0].stored_val(), Some(99));
    /// assert_eq!(
    ///     trace.0[0].to_string(),
    ///     "ran instruction at 0000: op int 1101  | [ADD #90, #9, 4 (resolves to 4)] (stored 99)"
    /// );
    /// ```
    pub fn start_trace(&mut self) -> Option<Trace> {
        self.trace.replace(Trace::default())
    }

    /// Stop tracing executed instructions into a [Trace]. If no trace was active, returns [`None`]
    ///
    /// see [Machine::start_trace]
    pub fn end_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    /// Get a view of the current trace
    pub fn show_trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Write a human-readable report of the machine's state to `writer`: the fault if there is
    /// one, the registers, the int at the program counter, and the last `recent` traced
    /// instructions, if tracing.
    pub fn write_diagnostic<W: Write>(&self, writer: &mut W, recent: usize) -> io::Result<()> {
        if let Some(ref fault) = self.fault {
            writeln!(writer, "fault: {fault}")?;
        }
        writeln!(
            writer,
            "state: {:?} | ip: {} | rbo: {} | steps: {}",
            self.state, self.index, self.rel_offset, self.steps
        )?;
        writeln!(writer, "int at ip: {}", self.code[self.index])?;
        if let Some(Trace(ref trace)) = self.trace {
            let skip = trace.len().saturating_sub(recent);
            writeln!(writer, "last {} traced instructions:", trace.len() - skip)?;
            for instr in &trace[skip..] {
                writeln!(writer, "  {instr}")?;
            }
        }
        Ok(())
    }
}
