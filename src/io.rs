// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Input and output hooks
//!
//! A [Machine](crate::Machine) owns one [Input] and one [Output]. It calls them synchronously
//! whenever it executes an `IN` or `OUT` instruction.
//!
//! Closures work directly: `FnMut() -> i64` is an [Input], and `FnMut(i64)` is an [Output]. The
//! unit type is an [Input] that never has a value, and an [Output] that discards everything.
//!
//! # Example
//!
//! ```
//! use ivm::prelude::*;
//! use std::collections::VecDeque;
//!
//! let mut total = 0;
//! let mut machine = Machine::new([3, 9, 4, 9, 3, 9, 4, 9, 99], VecDeque::from([5, 6]), |n: i64| total += n);
//! assert_eq!(machine.run(None), Ok(State::Halted));
//! drop(machine);
//! assert_eq!(total, 11);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A source of values for `IN` instructions
pub trait Input {
    /// Produce the next input value, or [`None`] if nothing is available yet.
    ///
    /// Returning [`None`] makes the machine report
    /// [StepOutcome::AwaitingInput](crate::StepOutcome::AwaitingInput) without executing the
    /// instruction.
    fn read(&mut self) -> Option<i64>;
}

/// A destination for values from `OUT` instructions
pub trait Output {
    /// Accept a value emitted by the program
    fn write(&mut self, value: i64);
}

impl<F: FnMut() -> i64> Input for F {
    fn read(&mut self) -> Option<i64> {
        Some(self())
    }
}

impl Input for VecDeque<i64> {
    fn read(&mut self) -> Option<i64> {
        self.pop_front()
    }
}

impl Input for () {
    fn read(&mut self) -> Option<i64> {
        None
    }
}

impl<F: FnMut(i64)> Output for F {
    fn write(&mut self, value: i64) {
        self(value);
    }
}

impl Output for Vec<i64> {
    fn write(&mut self, value: i64) {
        self.push(value);
    }
}

impl Output for VecDeque<i64> {
    fn write(&mut self, value: i64) {
        self.push_back(value);
    }
}

impl Output for () {
    fn write(&mut self, _: i64) {}
}

/// A shared first-in, first-out queue of ints
///
/// Clones share the same queue, so one clone can be the [Output] of a machine while another is
/// the [Input] of a different machine, or is kept by the caller to inspect or feed it.
///
/// # Example
///
/// ```
/// use ivm::prelude::*;
/// let pipe = IoQueue::new();
/// let results = IoQueue::new();
/// let mut doubler = Machine::new([3, 9, 102, 2, 9, 9, 4, 9, 99, 0], pipe.clone(), results.clone());
/// let mut source = Machine::new([104, 21, 99], (), pipe);
///
/// assert_eq!(doubler.step(), Ok(StepOutcome::AwaitingInput));
/// assert_eq!(source.run(None), Ok(State::Halted));
/// assert_eq!(doubler.run(None), Ok(State::Halted));
/// assert_eq!(results.drain(), vec![42]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IoQueue(Rc<RefCell<VecDeque<i64>>>);

impl IoQueue {
    /// Create a new, empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the back of the queue
    pub fn push(&self, value: i64) {
        self.0.borrow_mut().push_back(value);
    }

    /// Add every value in `values` to the back of the queue
    pub fn extend(&self, values: impl IntoIterator<Item = i64>) {
        self.0.borrow_mut().extend(values);
    }

    /// Take the value at the front of the queue
    pub fn pop(&self) -> Option<i64> {
        self.0.borrow_mut().pop_front()
    }

    /// The most recently pushed value that's still queued
    pub fn last(&self) -> Option<i64> {
        self.0.borrow().back().copied()
    }

    /// Number of queued values
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Remove and return everything in the queue
    pub fn drain(&self) -> Vec<i64> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl FromIterator<i64> for IoQueue {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self(Rc::new(RefCell::new(iter.into_iter().collect())))
    }
}

impl Input for IoQueue {
    fn read(&mut self) -> Option<i64> {
        self.pop()
    }
}

impl Output for IoQueue {
    fn write(&mut self, value: i64) {
        self.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_queue() {
        let queue: IoQueue = [1, 2].into_iter().collect();
        let mut writer = queue.clone();
        writer.write(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.last(), Some(3));
        let mut reader = queue.clone();
        assert_eq!(reader.read(), Some(1));
        assert_eq!(queue.drain(), vec![2, 3]);
        assert!(writer.is_empty());
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn closure_hooks() {
        let mut next: i64 = 0;
        let mut counter = || {
            next += 1;
            next
        };
        assert_eq!(Input::read(&mut counter), Some(1));
        assert_eq!(Input::read(&mut counter), Some(2));

        let mut seen = Vec::new();
        let mut sink = |v: i64| seen.push(v);
        Output::write(&mut sink, 9);
        assert_eq!(seen, vec![9]);
    }

    #[test]
    fn unit_hooks() {
        assert_eq!(().read(), None);
        ().write(5);
    }
}
