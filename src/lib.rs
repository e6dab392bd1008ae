// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD
#![warn(missing_docs)]

//! An Intcode virtual machine with pluggable, suspendable I/O
//!
//! The [Machine] implements all of the [Opcodes] and [Parameter Modes] of the completed Intcode
//! computer from [Day 9], on top of a memory that grows on demand.
//!
//! Input and output go through hooks supplied when the machine is built: anything implementing
//! [Input] and [Output], which includes plain closures.
//!
//! # Example
//!
//! ```rust
//! use ivm::prelude::*;
//! let mut machine = Machine::new([104, 1024, 99], (), Vec::new());
//!
//! assert_eq!(machine.run(None).unwrap(), State::Halted);
//! assert_eq!(machine.output(), &[1024]);
//! ```
//!
//! Machines can also be driven one instruction at a time, which is how several of them can share
//! a single thread:
//!
//! ```rust
//! use ivm::prelude::*;
//! let mut machine = Machine::new([3, 0, 4, 0, 99], || 42, Vec::new());
//!
//! assert_eq!(machine.step(), Ok(StepOutcome::PerformedIo(IoDirection::Input, 42)));
//! assert_eq!(machine.step(), Ok(StepOutcome::PerformedIo(IoDirection::Output, 42)));
//! assert_eq!(machine.step(), Ok(StepOutcome::Halted));
//! assert_eq!(machine.output(), &[42]);
//! ```
//!
//! [Opcodes]: https://esolangs.org/wiki/Intcode#Opcodes
//! [Parameter Modes]: https://esolangs.org/wiki/Intcode#Parameter_Modes
//! [Day 9]: https://adventofcode.com/2019/day/9
//! [Input]: io::Input
//! [Output]: io::Output

/// Instruction decoding and the shared logic of the instruction families
mod internals;
/// A paged memory, split into fixed-size segments stored in a hashmap
mod mmu;

pub mod config;
pub mod io;
pub mod program;
pub mod trace;

/// A small module that re-exports items needed when working with the Intcode machine
pub mod prelude {
    pub use crate::config::MachineConfig;
    pub use crate::io::{Input, IoQueue, Output};
    pub use crate::{IoDirection, Machine, MachineError, State, StepOutcome};
}

pub use mmu::Memory;

use config::MachineConfig;
use io::{Input, Output};
use trace::Trace;

use std::fmt::{self, Display};
use std::ops::Index;
use thiserror::Error;
use tracing::{debug, warn};

/// The lifecycle state of a [Machine]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// Constructed, but no instruction has been executed yet
    Ready,
    /// The last instruction executed neither performed I/O nor halted
    Running,
    /// Execution stopped after I/O, while awaiting input, or because a step budget ran out.
    /// Further calls to [Machine::step] or [Machine::run] resume it.
    Suspended,
    /// A `HALT` instruction has been executed. No more instructions will be executed.
    Halted,
}

/// Which way a value moved during an I/O instruction
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IoDirection {
    /// The value was read from the input hook and stored in memory
    Input,
    /// The value was passed to the output hook
    Output,
}

/// The result of executing a single instruction with [Machine::step]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepOutcome {
    /// An instruction other than I/O or `HALT` was executed
    Continuing,
    /// An `IN` or `OUT` instruction was executed, moving the contained value
    PerformedIo(IoDirection, i64),
    /// The next instruction is `IN`, but the input hook had nothing to give.
    ///
    /// Nothing was executed, so the same instruction is retried on the next step. Closure hooks
    /// always produce a value, so this only comes from hooks like [`VecDeque`] or
    /// [`IoQueue`](io::IoQueue).
    ///
    /// [`VecDeque`]: std::collections::VecDeque
    AwaitingInput,
    /// The machine has halted
    Halted,
}

/// A fatal error that occurred while executing an Intcode instruction
///
/// Once a [Machine] returns one of these, it is poisoned: its program counter points back at the
/// faulting instruction, and all later calls to [Machine::step] and [Machine::run] return the same
/// error without executing anything.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MachineError {
    /// The instruction word's low two digits are not a known opcode. Contains the whole word.
    #[error("encountered illegal instruction {opcode} at address {address}")]
    IllegalInstruction {
        /// the full instruction word
        opcode: i64,
        /// the address the word was read from
        address: i64,
    },
    /// A parameter mode digit other than 0, 1, or 2 was encountered
    #[error("encountered unknown parameter mode {mode} at address {address}")]
    UnknownMode {
        /// the offending digit
        mode: i64,
        /// address of the instruction
        address: i64,
    },
    /// An instruction tried to write to an immediate destination
    #[error("instruction at address {address} attempted to write to an {mode:?} destination")]
    InvalidWriteMode {
        /// the mode of the destination parameter
        mode: ParamMode,
        /// address of the instruction
        address: i64,
    },
    /// An address was negative, or beyond the configured memory limit
    #[error("memory address {0} is out of range")]
    OutOfRange(i64),
    /// An addition, multiplication, or relative base adjustment overflowed an `i64`
    #[error("arithmetic overflow in instruction at address {address}")]
    ArithmeticOverflow {
        /// address of the instruction
        address: i64,
    },
}

/// Parameter mode for an Intcode instruction
///
/// Intcode instruction parameters each have a mode: [positional], [immediate], or [relative].
///
/// When executing an intcode instruction, the instruction's parameters are interpreted in
/// accordance with their associated modes.
///
/// [positional]: ParamMode::Positional
/// [immediate]: ParamMode::Immediate
/// [relative]: ParamMode::Relative
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ParamMode {
    /// Positional Mode
    ///
    /// A parameter in positional mode evaluates to the value at the address specified by the
    /// parameter.
    Positional = 0,
    /// Immediate Mode
    ///
    /// A parameter in immediate mode evaluates directly to the value specified. Instructions which
    /// write to memory may not use immediate mode for their destinations.
    #[doc(alias = "#")]
    Immediate = 1,
    /// Relative Mode
    ///
    /// A parameter in relative mode evaluates to the value at the address specified by the
    /// parameter, added to the relative base, which starts out as `0` and is adjusted by `RBO`
    /// instructions.
    #[doc(alias = "@")]
    Relative = 2,
}

impl Display for ParamMode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Positional => Ok(()),
            ParamMode::Immediate => write!(fmt, "#"),
            ParamMode::Relative => write!(fmt, "@"),
        }
    }
}

impl TryFrom<i64> for ParamMode {
    type Error = i64;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(ParamMode::Positional),
            1 => Ok(ParamMode::Immediate),
            2 => Ok(ParamMode::Relative),
            _ => Err(i),
        }
    }
}

/// An Intcode opcode
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs, reason = "trivial")]
pub enum OpCode {
    Add = 1,
    Mul = 2,
    In = 3,
    Out = 4,
    Jnz = 5,
    Jz = 6,
    Lt = 7,
    Eq = 8,
    Rbo = 9,
    Halt = 99,
}

impl OpCode {
    /// The number of parameters that follow an instruction with this opcode
    pub const fn param_count(self) -> usize {
        match self {
            OpCode::Halt => 0,
            OpCode::In | OpCode::Out | OpCode::Rbo => 1,
            OpCode::Jnz | OpCode::Jz => 2,
            OpCode::Add | OpCode::Mul | OpCode::Lt | OpCode::Eq => 3,
        }
    }
}

impl TryFrom<i64> for OpCode {
    type Error = i64;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            1 => Ok(OpCode::Add),
            2 => Ok(OpCode::Mul),
            3 => Ok(OpCode::In),
            4 => Ok(OpCode::Out),
            5 => Ok(OpCode::Jnz),
            6 => Ok(OpCode::Jz),
            7 => Ok(OpCode::Lt),
            8 => Ok(OpCode::Eq),
            9 => Ok(OpCode::Rbo),
            99 => Ok(OpCode::Halt),
            _ => Err(i),
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpCode::Add => "ADD",
            OpCode::Mul => "MUL",
            OpCode::In => "IN",
            OpCode::Out => "OUT",
            OpCode::Jnz => "JNZ",
            OpCode::Jz => "JZ",
            OpCode::Lt => "LT",
            OpCode::Eq => "EQ",
            OpCode::Rbo => "RBO",
            OpCode::Halt => "HALT",
        })
    }
}

#[derive(Clone)]
/// An Intcode machine, generic over its input hook `I` and output hook `O`
pub struct Machine<I, O> {
    index: i64,
    rel_offset: i64,
    code: Memory,
    halted: bool,
    state: State,
    steps: u64,
    fault: Option<MachineError>,
    trace: Option<Trace>,
    input: I,
    output: O,
}

// ignore the hooks and the trace
impl<I, O> PartialEq for Machine<I, O> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.rel_offset == other.rel_offset
            && self.halted == other.halted
            && self.fault == other.fault
            && self.code == other.code
    }
}

impl<I, O> fmt::Debug for Machine<I, O> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Machine")
            .field("code", &self.code)
            .field("rbo", &self.rel_offset)
            .field("ip", &self.index)
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("fault", &self.fault)
            .field("tracing", &self.trace.is_some())
            .finish_non_exhaustive()
    }
}

impl<I, O> Index<i64> for Machine<I, O> {
    type Output = i64;

    fn index(&self, i: i64) -> &Self::Output {
        self.code.index(i)
    }
}

impl<I, O> Machine<I, O> {
    /// Create a new machine. Collects `code` into the starting memory state, with every address
    /// past the end of `code` reading as zero.
    pub fn new(code: impl IntoIterator<Item = i64>, input: I, output: O) -> Self {
        Self::with_config(code, input, output, MachineConfig::default())
    }

    /// Create a new machine, applying the settings in `config`
    pub fn with_config(
        code: impl IntoIterator<Item = i64>,
        input: I,
        output: O,
        config: MachineConfig,
    ) -> Self {
        Self {
            index: 0,
            rel_offset: 0,
            code: Memory::new(code, config.memory_limit),
            halted: false,
            state: State::Ready,
            steps: 0,
            fault: None,
            trace: config.trace.then(Trace::default),
            input,
            output,
        }
    }

    /// The address of the next instruction to execute
    #[doc(alias("ip", "pc"))]
    pub fn program_counter(&self) -> i64 {
        self.index
    }

    /// The current relative base
    #[doc(alias = "rbo")]
    pub fn relative_base(&self) -> i64 {
        self.rel_offset
    }

    /// Whether a `HALT` instruction has been executed
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The current lifecycle [State]
    pub fn state(&self) -> State {
        self.state
    }

    /// The number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The error that poisoned this machine, if any
    pub fn fault(&self) -> Option<&MachineError> {
        self.fault.as_ref()
    }

    /// A read-only view of the machine's memory
    pub fn memory(&self) -> &Memory {
        &self.code
    }

    /// Get the memory at `address`
    #[doc(alias = "peek")]
    pub fn mem_get(&self, address: i64) -> Result<i64, MachineError> {
        self.code.load(address)
    }

    /// Manually set a memory location
    #[doc(alias("poke", "write"))]
    pub fn mem_override(&mut self, address: i64, value: i64) -> Result<(), MachineError> {
        self.code.store(address, value)
    }

    /// The input hook
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Mutable access to the input hook, e.g. to queue more values
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// The output hook
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Mutable access to the output hook
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Consume the machine, returning its hooks
    pub fn into_io(self) -> (I, O) {
        (self.input, self.output)
    }

    fn check_fault(&self) -> Result<(), MachineError> {
        match self.fault {
            Some(ref err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl<I: Input, O: Output> Machine<I, O> {
    /// Decode and execute exactly one instruction.
    ///
    /// Once halted, this does nothing and keeps returning [StepOutcome::Halted].
    ///
    /// # Example
    ///
    /// ```
    /// use ivm::prelude::*;
    /// let mut machine = Machine::new([1101, 4, 3, 5, 99], (), ());
    /// assert_eq!(machine.step(), Ok(StepOutcome::Continuing));
    /// assert_eq!(machine[5], 7);
    /// assert_eq!(machine.step(), Ok(StepOutcome::Halted));
    /// assert_eq!(machine.step(), Ok(StepOutcome::Halted));
    /// assert_eq!(machine.program_counter(), 4);
    /// ```
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        self.check_fault()?;
        if self.halted {
            return Ok(StepOutcome::Halted);
        }

        let address = self.index;
        let outcome = match self.exec_instruction() {
            Ok(outcome) => outcome,
            Err(err) => {
                self.index = address;
                warn!(address, steps = self.steps, error = %err, "machine faulted");
                self.fault = Some(err.clone());
                return Err(err);
            }
        };

        match outcome {
            StepOutcome::AwaitingInput => {
                self.index = address;
                self.state = State::Suspended;
                debug!(address, "awaiting input");
                return Ok(outcome);
            }
            StepOutcome::Continuing => self.state = State::Running,
            StepOutcome::PerformedIo(..) => self.state = State::Suspended,
            StepOutcome::Halted => self.state = State::Halted,
        }
        self.steps += 1;
        if self.halted {
            debug!(address, steps = self.steps, "halted");
        }
        Ok(outcome)
    }

    /// Execute until the machine halts, the input hook runs dry, or `budget` instructions have
    /// been executed. A `budget` of [`None`] means no limit.
    ///
    /// Returns either [State::Halted] or [State::Suspended]. Running out of budget is not an
    /// error.
    ///
    /// # Example
    ///
    /// ```
    /// use ivm::prelude::*;
    /// // ADD #1, #1, 7 ; JNZ #1, #0
    /// let mut machine = Machine::new([1101, 1, 1, 7, 1105, 1, 0], (), ());
    /// assert_eq!(machine.run(Some(10)), Ok(State::Suspended));
    /// assert_eq!(machine.steps(), 10);
    /// ```
    pub fn run(&mut self, budget: Option<u64>) -> Result<State, MachineError> {
        self.check_fault()?;
        let mut taken = 0;
        loop {
            if self.halted {
                return Ok(State::Halted);
            }
            if budget.is_some_and(|budget| taken >= budget) {
                self.state = State::Suspended;
                return Ok(State::Suspended);
            }
            match self.step()? {
                StepOutcome::Halted => return Ok(State::Halted),
                StepOutcome::AwaitingInput => return Ok(State::Suspended),
                StepOutcome::Continuing | StepOutcome::PerformedIo(..) => taken += 1,
            }
        }
    }

    /// Execute until an instruction performs I/O, the machine halts, the input hook runs dry, or
    /// `budget` instructions have been executed, returning the outcome of the last step.
    ///
    /// If the budget runs out first, returns [StepOutcome::Continuing].
    pub fn run_until_io(&mut self, budget: Option<u64>) -> Result<StepOutcome, MachineError> {
        self.check_fault()?;
        if self.halted {
            return Ok(StepOutcome::Halted);
        }
        let mut taken = 0;
        while budget.is_none_or(|budget| taken < budget) {
            match self.step()? {
                StepOutcome::Continuing => taken += 1,
                outcome => return Ok(outcome),
            }
        }
        self.state = State::Suspended;
        Ok(StepOutcome::Continuing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    /// Example program from day 9, which takes no input and outputs its own code
    #[test]
    fn quine() {
        let quine_code = vec![
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];
        let mut machine = Machine::new(quine_code.clone(), (), Vec::new());
        assert_eq!(machine.run(None), Ok(State::Halted));
        assert_eq!(machine.output(), &quine_code);
        assert_eq!(
            machine.memory().get_range(0..quine_code.len() as i64)[..12],
            quine_code[..12]
        );
    }

    #[test]
    fn immediate_and_positional_modes() {
        let mut machine = Machine::new([1101, 4, 3, 5, 99], (), ());
        assert_eq!(machine.state(), State::Ready);
        assert_eq!(machine.step(), Ok(StepOutcome::Continuing));
        assert_eq!(machine[5], 7);
        assert_eq!(machine.program_counter(), 4);
        assert_eq!(machine.state(), State::Running);
        assert_eq!(machine.step(), Ok(StepOutcome::Halted));
        assert!(machine.is_halted());
        assert_eq!(machine.state(), State::Halted);
    }

    #[test]
    fn relative_write_lands_at_base_plus_operand() {
        let mut machine = Machine::new([109, 5, 203, 0, 99, 0], || 42, ());
        assert_eq!(machine.step(), Ok(StepOutcome::Continuing));
        assert_eq!(machine.relative_base(), 5);
        assert_eq!(
            machine.step(),
            Ok(StepOutcome::PerformedIo(IoDirection::Input, 42))
        );
        assert_eq!(machine[5], 42);
        assert_eq!(machine[0], 109);
    }

    #[test]
    fn halt_is_idempotent() {
        let mut machine = Machine::new([1101, 4, 3, 5, 99], (), ());
        assert_eq!(machine.run(None), Ok(State::Halted));
        let snapshot = machine.clone();
        let steps = machine.steps();
        for _ in 0..3 {
            assert_eq!(machine.step(), Ok(StepOutcome::Halted));
        }
        assert_eq!(machine.program_counter(), 4);
        assert_eq!(machine.steps(), steps);
        assert_eq!(machine, snapshot);
        assert_eq!(machine.run(Some(5)), Ok(State::Halted));
        assert_eq!(machine.run_until_io(None), Ok(StepOutcome::Halted));
    }

    #[test]
    fn echo_suspend_cycle() {
        let mut machine = Machine::new([3, 0, 4, 0, 99], || 42, Vec::new());
        assert_eq!(
            machine.step(),
            Ok(StepOutcome::PerformedIo(IoDirection::Input, 42))
        );
        assert_eq!(machine.state(), State::Suspended);
        assert_eq!(
            machine.step(),
            Ok(StepOutcome::PerformedIo(IoDirection::Output, 42))
        );
        assert_eq!(machine.step(), Ok(StepOutcome::Halted));
        assert_eq!(machine.into_io().1, vec![42]);
    }

    #[test]
    fn illegal_instruction() {
        let mut machine = Machine::new([5555, 99], (), ());
        let before = machine.clone();
        let err = MachineError::IllegalInstruction {
            opcode: 5555,
            address: 0,
        };
        assert_eq!(machine.step(), Err(err.clone()));
        assert_eq!(machine.program_counter(), 0);
        assert_eq!(machine.memory(), before.memory());
        assert_eq!(machine.fault(), Some(&err));
        assert_eq!(machine.steps(), 0);
    }

    #[test]
    fn negative_words_are_illegal() {
        let mut machine = Machine::new([-1], (), ());
        assert_eq!(
            machine.step(),
            Err(MachineError::IllegalInstruction {
                opcode: -1,
                address: 0
            })
        );
    }

    #[test]
    fn faults_are_sticky() {
        let mut machine = Machine::new([1, 0, 0, 0, 77], (), ());
        let err = MachineError::IllegalInstruction {
            opcode: 77,
            address: 4,
        };
        assert_eq!(machine.run(None), Err(err.clone()));
        assert_eq!(machine.program_counter(), 4);
        assert_eq!(machine.step(), Err(err.clone()));
        assert_eq!(machine.run(Some(0)), Err(err.clone()));
        assert_eq!(machine.run_until_io(None), Err(err));
        assert_eq!(machine.steps(), 1);
    }

    #[test]
    fn immediate_write_rejected() {
        // ADD #1, #1, #1
        let mut machine = Machine::new([11101, 1, 1, 1, 99], (), ());
        assert_eq!(
            machine.step(),
            Err(MachineError::InvalidWriteMode {
                mode: ParamMode::Immediate,
                address: 0
            })
        );
        assert_eq!(machine[1], 1);
        assert_eq!(machine.program_counter(), 0);
    }

    #[test]
    fn immediate_input_does_not_consume() {
        let mut machine = Machine::new([103, 0, 99], VecDeque::from([5]), ());
        assert!(matches!(
            machine.step(),
            Err(MachineError::InvalidWriteMode { .. })
        ));
        assert_eq!(machine.into_io().0, VecDeque::from([5]));
    }

    #[test]
    fn unknown_mode() {
        let mut machine = Machine::new([301, 0, 0, 0, 99], (), ());
        assert_eq!(
            machine.step(),
            Err(MachineError::UnknownMode {
                mode: 3,
                address: 0
            })
        );
    }

    /// mode digits past the opcode's parameters are ignored
    #[test]
    fn halt_ignores_mode_digits() {
        let mut machine = Machine::new([21299], (), ());
        assert_eq!(machine.run(None), Ok(State::Halted));
    }

    #[test]
    fn negative_address_out_of_range() {
        let mut machine = Machine::new([1, -1, 0, 0, 99], (), ());
        assert_eq!(machine.step(), Err(MachineError::OutOfRange(-1)));

        let mut machine = Machine::new([109, -10, 22101, 0, 0, 0, 99], (), ());
        machine.step().unwrap();
        assert_eq!(machine.step(), Err(MachineError::OutOfRange(-10)));
        assert_eq!(machine.relative_base(), -10);
    }

    #[test]
    fn jump_to_negative_faults_on_next_step() {
        let mut machine = Machine::new([1105, 1, -4], (), ());
        assert_eq!(machine.step(), Ok(StepOutcome::Continuing));
        assert_eq!(machine.program_counter(), -4);
        assert_eq!(machine.step(), Err(MachineError::OutOfRange(-4)));
    }

    #[test]
    fn extended_memory() {
        // ADD #7, #8, 9999 ; OUT 9999 ; HALT
        let mut machine = Machine::new([1101, 7, 8, 9999, 4, 9999, 99], (), Vec::new());
        assert_eq!(machine.run(None), Ok(State::Halted));
        assert_eq!(machine.output(), &[15]);
        assert_eq!(machine.mem_get(9999), Ok(15));
        assert_eq!(machine[9998], 0);
    }

    #[test]
    fn memory_limit_enforced() {
        let config = MachineConfig::default().with_memory_limit(10_000);
        let mut machine = Machine::with_config([1101, 7, 8, 9999, 99], (), (), config);
        assert_eq!(machine.run(None), Ok(State::Halted));
        assert_eq!(machine.mem_get(9999), Ok(15));

        let config = MachineConfig::default().with_memory_limit(4096);
        let mut machine = Machine::with_config([1101, 7, 8, 9999, 99], (), (), config);
        assert_eq!(machine.run(None), Err(MachineError::OutOfRange(9999)));
        assert_eq!(machine.mem_get(9999), Err(MachineError::OutOfRange(9999)));
        assert_eq!(
            machine.mem_override(4096, 1),
            Err(MachineError::OutOfRange(4096))
        );
    }

    #[test]
    fn awaiting_input_is_recoverable() {
        let mut machine = Machine::new([3, 10, 4, 10, 99], VecDeque::new(), Vec::new());
        let old_state = machine.clone();

        assert_eq!(machine.step(), Ok(StepOutcome::AwaitingInput));
        assert_eq!(machine, old_state);
        assert_eq!(machine.steps(), 0);
        assert_eq!(machine.run(None), Ok(State::Suspended));
        assert_eq!(machine.state(), State::Suspended);

        machine.input_mut().push_back(1);
        assert_eq!(machine.run(None), Ok(State::Halted));
        assert_eq!(machine.output(), &[1]);
    }

    #[test]
    fn run_budget_suspends() {
        // an infinite loop: ADD #1, 13, 13 ; JNZ #1, #0
        let mut machine = Machine::new([101, 1, 13, 13, 1105, 1, 0], (), ());
        assert_eq!(machine.run(Some(0)), Ok(State::Suspended));
        assert_eq!(machine.steps(), 0);
        assert_eq!(machine.run(Some(7)), Ok(State::Suspended));
        assert_eq!(machine.steps(), 7);
        assert_eq!(machine[13], 4);
        assert_eq!(machine.program_counter(), 4);
        assert_eq!(machine.run_until_io(Some(3)), Ok(StepOutcome::Continuing));
        assert_eq!(machine.state(), State::Suspended);
        assert_eq!(machine.steps(), 10);
    }

    #[test]
    fn run_until_io_stops_at_each_io() {
        let mut machine = Machine::new(
            [1101, 2, 3, 20, 4, 20, 1101, 4, 5, 20, 4, 20, 99],
            (),
            Vec::new(),
        );
        assert_eq!(
            machine.run_until_io(None),
            Ok(StepOutcome::PerformedIo(IoDirection::Output, 5))
        );
        assert_eq!(machine.steps(), 2);
        assert_eq!(
            machine.run_until_io(None),
            Ok(StepOutcome::PerformedIo(IoDirection::Output, 9))
        );
        assert_eq!(machine.run_until_io(None), Ok(StepOutcome::Halted));
        assert_eq!(machine.output(), &[5, 9]);
    }

    #[test]
    fn overflow_is_fatal() {
        let mut machine = Machine::new([1102, i64::MAX, 2, 0, 99], (), ());
        assert_eq!(
            machine.step(),
            Err(MachineError::ArithmeticOverflow { address: 0 })
        );
        assert_eq!(machine[0], 1102);

        let mut machine = Machine::new([109, i64::MAX, 109, 1, 99], (), ());
        machine.step().unwrap();
        assert_eq!(
            machine.step(),
            Err(MachineError::ArithmeticOverflow { address: 2 })
        );
        assert_eq!(machine.relative_base(), i64::MAX);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            MachineError::IllegalInstruction {
                opcode: 5555,
                address: 0
            }
            .to_string(),
            "encountered illegal instruction 5555 at address 0"
        );
        assert_eq!(
            MachineError::InvalidWriteMode {
                mode: ParamMode::Immediate,
                address: 12
            }
            .to_string(),
            "instruction at address 12 attempted to write to an Immediate destination"
        );
        assert_eq!(
            MachineError::OutOfRange(-3).to_string(),
            "memory address -3 is out of range"
        );
    }

    proptest! {
        #[test]
        fn echo_any_value(value: i64) {
            let mut machine = Machine::new([3, 0, 4, 0, 99], move || value, Vec::new());
            prop_assert_eq!(machine.run(None), Ok(State::Halted));
            prop_assert_eq!(machine.output(), &[value]);
        }

        #[test]
        fn arithmetic_matches_i64(a in any::<i32>(), b in any::<i32>()) {
            let (a, b) = (i64::from(a), i64::from(b));
            // ADD, MUL, LT, EQ of two immediates, each followed by an OUT
            let code = [
                1101, a, b, 100, 4, 100,
                1102, a, b, 100, 4, 100,
                1107, a, b, 100, 4, 100,
                1108, a, b, 100, 4, 100,
                99,
            ];
            let mut machine = Machine::new(code, (), Vec::new());
            prop_assert_eq!(machine.run(None), Ok(State::Halted));
            prop_assert_eq!(
                machine.output(),
                &[a + b, a * b, i64::from(a < b), i64::from(a == b)]
            );
        }

        #[test]
        fn conditional_jumps(cond: i64) {
            // JNZ #cond, #6 ; OUT #0 ; HALT ; OUT #1 ; JZ #cond, #13 ; HALT ; DATA 0 ; OUT #2 ; HALT
            let code = [1105, cond, 6, 104, 0, 99, 104, 1, 1106, cond, 13, 99, 0, 104, 2, 99];
            let mut machine = Machine::new(code, (), Vec::new());
            prop_assert_eq!(machine.run(None), Ok(State::Halted));
            if cond == 0 {
                prop_assert_eq!(machine.output(), &[0]);
            } else {
                prop_assert_eq!(machine.output(), &[1]);
            }
        }
    }
}
