// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 7 built using the `ivm` library.
//!
//! Each amplifier is its own [Machine], and they're connected through [IoQueue]s.

use ivm::prelude::*;
use ivm::program::{Encoding, read_program};

use itertools::Itertools;
use std::error::Error;
use thiserror::Error;

/// Connect one amplifier per phase setting in a ring, and return the queues along with the
/// machines. Amplifier `i` reads from `queues[i]` and writes to the next one.
fn build_ring(code: &[i64], phases: &[i64]) -> (Vec<Machine<IoQueue, IoQueue>>, Vec<IoQueue>) {
    let queues: Vec<IoQueue> = phases.iter().map(|&p| IoQueue::from_iter([p])).collect();
    let amps = queues
        .iter()
        .zip(queues.iter().cycle().skip(1))
        .map(|(input, output)| Machine::new(code.iter().copied(), input.clone(), output.clone()))
        .collect();
    (amps, queues)
}

#[derive(Debug, Error)]
enum AmpError {
    #[error(transparent)]
    Machine(#[from] MachineError),
    #[error("every amplifier that hasn't halted is waiting for input that never comes")]
    Stalled,
}

fn thruster_signal(code: &[i64], phases: &[i64]) -> Result<i64, AmpError> {
    let (mut amps, queues) = build_ring(code, phases);
    queues[0].push(0);
    while !amps.iter().all(Machine::is_halted) {
        let mut progressed = false;
        for amp in &mut amps {
            let before = amp.steps();
            amp.run(None)?;
            progressed |= amp.steps() != before;
        }
        if !progressed {
            return Err(AmpError::Stalled);
        }
    }
    // the last amplifier writes back into the first one's queue
    queues[0].last().ok_or(AmpError::Stalled)
}

fn best_signal(code: &[i64], phases: std::ops::Range<i64>) -> Result<i64, AmpError> {
    let mut best = i64::MIN;
    for perm in phases.permutations(5) {
        best = best.max(thruster_signal(code, &perm)?);
    }
    Ok(best)
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1).ok_or("must provide file")?;
    let code = read_program(path, Encoding::Text)?;

    println!("part 1: {}", best_signal(&code, 0..5)?);
    println!("part 2: {}", best_signal(&code, 5..10)?);
    Ok(())
}
