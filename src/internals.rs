// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use super::*;
use tracing::trace;

/// An instruction whose word and raw parameters have been read from memory
pub(crate) struct Fetched {
    pub(crate) address: i64,
    pub(crate) word: i64,
    pub(crate) opcode: OpCode,
    pub(crate) modes: [ParamMode; 3],
    pub(crate) raw: [i64; 3],
}

// Given a 5 digit number, digits ABCDE are used as follows:
// DE is the two-digit opcode
// C is the 1st parameter's mode
// B is the 2nd parameter's mode
// A is the 3rd parameter's mode
//
// So *0*1202 would be parsed as follows:
//
// Opcode 02 is multiply
// C=2: 1st parameter is in relative mode
// B=1: 2nd parameter is in immediate mode
// A=0: 3rd parameter is in positional mode
//
// Only the modes of parameters the opcode actually takes are checked.
pub(crate) fn decode(word: i64, address: i64) -> Result<(OpCode, [ParamMode; 3]), MachineError> {
    let opcode = OpCode::try_from(word % 100)
        .map_err(|_| MachineError::IllegalInstruction { opcode: word, address })?;
    let mut modes = [ParamMode::Positional; 3];
    let mut place = 100;
    for mode in modes.iter_mut().take(opcode.param_count()) {
        *mode = ParamMode::try_from((word / place) % 10)
            .map_err(|mode| MachineError::UnknownMode { mode, address })?;
        place *= 10;
    }
    Ok((opcode, modes))
}

fn offset(address: i64, n: usize) -> Result<i64, MachineError> {
    i64::try_from(n)
        .ok()
        .and_then(|n| address.checked_add(n))
        .ok_or(MachineError::OutOfRange(address))
}

impl<I: Input, O: Output> Machine<I, O> {
    /// Fetch, decode, and execute the instruction at the program counter.
    ///
    /// The program counter is advanced past the instruction before it is dispatched, so jumps
    /// simply overwrite it. On error, the caller is responsible for restoring it.
    pub(crate) fn exec_instruction(&mut self) -> Result<StepOutcome, MachineError> {
        let address = self.index;
        let word = self.code.load(address)?;
        let (opcode, modes) = decode(word, address)?;
        let param_count = opcode.param_count();

        let mut raw = [0; 3];
        for (n, param) in raw.iter_mut().enumerate().take(param_count) {
            *param = self.code.load(offset(address, n + 1)?)?;
        }
        let instr = Fetched {
            address,
            word,
            opcode,
            modes,
            raw,
        };
        self.index = offset(address, param_count + 1)?;

        match opcode {
            OpCode::Add => self.op3(&instr, i64::checked_add),
            OpCode::Mul => self.op3(&instr, i64::checked_mul),
            OpCode::Lt => self.op3(&instr, |a, b| Some(i64::from(a < b))),
            OpCode::Eq => self.op3(&instr, |a, b| Some(i64::from(a == b))),
            OpCode::In => self.input_op(&instr),
            OpCode::Out => {
                let value = self.resolve_param(&instr, 0)?;
                self.output.write(value);
                self.record(&instr, &[value], None);
                Ok(StepOutcome::PerformedIo(IoDirection::Output, value))
            }
            OpCode::Jnz => self.jump(&instr, |v| v != 0),
            OpCode::Jz => self.jump(&instr, |v| v == 0),
            OpCode::Rbo => {
                let adjustment = self.resolve_param(&instr, 0)?;
                let rel_offset = self
                    .rel_offset
                    .checked_add(adjustment)
                    .ok_or(MachineError::ArithmeticOverflow { address })?;
                self.record(&instr, &[adjustment], None);
                self.rel_offset = rel_offset;
                Ok(StepOutcome::Continuing)
            }
            OpCode::Halt => {
                self.index = address;
                self.halted = true;
                self.record(&instr, &[], None);
                Ok(StepOutcome::Halted)
            }
        }
    }

    fn relative_address(&self, param: i64) -> Result<i64, MachineError> {
        param
            .checked_add(self.rel_offset)
            .ok_or(MachineError::OutOfRange(param))
    }

    /// Processes the `n`th parameter into a concrete value using the method appropriate for its
    /// mode
    fn resolve_param(&self, instr: &Fetched, n: usize) -> Result<i64, MachineError> {
        match instr.modes[n] {
            ParamMode::Positional => self.code.load(instr.raw[n]),
            ParamMode::Immediate => Ok(instr.raw[n]),
            ParamMode::Relative => self.code.load(self.relative_address(instr.raw[n])?),
        }
    }

    /// Turns the `n`th parameter into a concrete, writable address according to its mode
    fn resolve_dest(&self, instr: &Fetched, n: usize) -> Result<i64, MachineError> {
        let dest = match instr.modes[n] {
            ParamMode::Positional => instr.raw[n],
            mode @ ParamMode::Immediate => {
                return Err(MachineError::InvalidWriteMode {
                    mode,
                    address: instr.address,
                });
            }
            ParamMode::Relative => self.relative_address(instr.raw[n])?,
        };
        self.code.check(dest)?;
        Ok(dest)
    }

    /// common logic of all 4 instructions that take 3 parameters
    fn op3(
        &mut self,
        instr: &Fetched,
        operation: impl Fn(i64, i64) -> Option<i64>,
    ) -> Result<StepOutcome, MachineError> {
        let a = self.resolve_param(instr, 0)?;
        let b = self.resolve_param(instr, 1)?;
        let dest = self.resolve_dest(instr, 2)?;
        let val = operation(a, b).ok_or(MachineError::ArithmeticOverflow {
            address: instr.address,
        })?;
        self.code.store(dest, val)?;
        self.record(instr, &[a, b, dest], Some(val));
        Ok(StepOutcome::Continuing)
    }

    fn input_op(&mut self, instr: &Fetched) -> Result<StepOutcome, MachineError> {
        // resolved first so that a bad destination never swallows an input
        let dest = self.resolve_dest(instr, 0)?;
        let Some(value) = self.input.read() else {
            return Ok(StepOutcome::AwaitingInput);
        };
        self.code.store(dest, value)?;
        self.record(instr, &[dest], Some(value));
        Ok(StepOutcome::PerformedIo(IoDirection::Input, value))
    }

    fn jump(
        &mut self,
        instr: &Fetched,
        func: impl Fn(i64) -> bool,
    ) -> Result<StepOutcome, MachineError> {
        let expr = self.resolve_param(instr, 0)?;
        let dest = self.resolve_param(instr, 1)?;
        if func(expr) {
            self.index = dest;
        }
        self.record(instr, &[expr, dest], None);
        Ok(StepOutcome::Continuing)
    }

    fn record(&mut self, instr: &Fetched, resolved: &[i64], stored: Option<i64>) {
        trace!(
            address = instr.address,
            word = instr.word,
            opcode = %instr.opcode,
            rbo = self.rel_offset,
            "executed instruction"
        );
        let rel_base = self.rel_offset;
        if let Some(trace) = self.trace.as_mut() {
            trace.push(instr, rel_base, resolved, stored);
        }
    }
}
