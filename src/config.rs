// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Settings applied when constructing a [Machine](crate::Machine)

/// Configuration for [Machine::with_config](crate::Machine::with_config)
///
/// The default has no memory limit and no trace.
///
/// # Example
///
/// ```
/// use ivm::prelude::*;
/// let config = MachineConfig::default().with_memory_limit(4096).with_trace(true);
/// let mut machine = Machine::with_config([1101, 1, 2, 5000, 99], (), (), config);
/// assert_eq!(machine.run(None), Err(MachineError::OutOfRange(5000)));
/// assert!(machine.show_trace().is_some_and(|trace| trace.0.is_empty()));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineConfig {
    /// If set, every address at or above this is out of range instead of growing memory
    pub memory_limit: Option<i64>,
    /// Start a [Trace](crate::trace::Trace) as soon as the machine is constructed
    pub trace: bool,
}

impl MachineConfig {
    /// Same as [MachineConfig::default]
    pub const fn new() -> Self {
        Self {
            memory_limit: None,
            trace: false,
        }
    }

    /// Set the memory limit
    #[must_use]
    pub const fn with_memory_limit(mut self, limit: i64) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Enable or disable tracing from the start
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
