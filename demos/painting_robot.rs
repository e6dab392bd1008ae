// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 11 built using the `ivm` library.
//!
//! The robot's state lives outside the machine. The machine's hooks are closures that share it.

use ivm::prelude::*;
use ivm::program::{Encoding, read_program};

use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
enum PanelColor {
    Black { repainted: bool },
    White,
}

impl PanelColor {
    fn report(self) -> i64 {
        i64::from(self == Self::White)
    }

    fn paint(&mut self, color: i64) {
        *self = if color == 1 {
            Self::White
        } else {
            assert_eq!(color, 0, "invalid paint color");
            Self::Black { repainted: true }
        };
    }
}

impl Default for PanelColor {
    fn default() -> Self {
        Self::Black { repainted: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    fn turn(&mut self, code: i64) {
        *self = match (code, *self) {
            (0, Self::Up) | (1, Self::Down) => Self::Left,
            (0, Self::Right) | (1, Self::Left) => Self::Up,
            (0, Self::Down) | (1, Self::Up) => Self::Right,
            (0, Self::Left) | (1, Self::Right) => Self::Down,
            (i, _) => panic!("invalid direction code: {i}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
struct Location {
    x: i32,
    y: i32,
}

impl std::ops::AddAssign<Direction> for Location {
    fn add_assign(&mut self, dir: Direction) {
        match dir {
            Direction::Up => self.y -= 1,
            Direction::Right => self.x += 1,
            Direction::Down => self.y += 1,
            Direction::Left => self.x -= 1,
        }
    }
}

#[derive(Debug)]
struct Robot {
    panels: HashMap<Location, PanelColor>,
    location: Location,
    direction: Direction,
    /// whether the next output is a color, rather than a turn
    expect_color: bool,
}

impl Robot {
    fn new(start: PanelColor) -> Self {
        Self {
            panels: HashMap::from([(Location::default(), start)]),
            location: Location::default(),
            direction: Direction::Up,
            expect_color: true,
        }
    }

    fn camera(&self) -> i64 {
        self.panels
            .get(&self.location)
            .copied()
            .unwrap_or_default()
            .report()
    }

    fn command(&mut self, value: i64) {
        if self.expect_color {
            self.panels.entry(self.location).or_default().paint(value);
        } else {
            self.direction.turn(value);
            self.location += self.direction;
        }
        self.expect_color = !self.expect_color;
    }
}

fn paint(code: &[i64], start: PanelColor) -> Result<Robot, MachineError> {
    let robot = Rc::new(RefCell::new(Robot::new(start)));
    let camera = Rc::clone(&robot);
    let controller = Rc::clone(&robot);
    let mut machine = Machine::new(
        code.iter().copied(),
        move || camera.borrow().camera(),
        move |value: i64| controller.borrow_mut().command(value),
    );
    machine.run(None)?;
    drop(machine);
    Ok(Rc::into_inner(robot)
        .expect("hooks were dropped with the machine")
        .into_inner())
}

fn part1(code: &[i64]) -> Result<usize, MachineError> {
    let robot = paint(code, PanelColor::default())?;
    Ok(robot
        .panels
        .into_values()
        .filter(|v| *v != PanelColor::default())
        .count())
}

fn part2(code: &[i64]) -> Result<(), MachineError> {
    let robot = paint(code, PanelColor::White)?;
    let white: Vec<Location> = robot
        .panels
        .iter()
        .filter(|&(_, &color)| color == PanelColor::White)
        .map(|(&loc, _)| loc)
        .collect();
    let Some(min_x) = white.iter().map(|l| l.x).min() else {
        return Ok(());
    };
    let max_x = white.iter().map(|l| l.x).max().unwrap_or(min_x);
    let min_y = white.iter().map(|l| l.y).min().unwrap_or_default();
    let max_y = white.iter().map(|l| l.y).max().unwrap_or(min_y);

    for y in min_y..=max_y {
        let row: String = (min_x..=max_x)
            .map(|x| {
                match robot.panels.get(&Location { x, y }).copied().unwrap_or_default() {
                    PanelColor::Black { .. } => ' ',
                    PanelColor::White => '#',
                }
            })
            .collect();
        println!("{row}");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1).ok_or("must provide file")?;
    let code = read_program(path, Encoding::Text)?;

    println!("part 1: {}", part1(&code)?);
    println!("part 2:");
    part2(&code)?;
    Ok(())
}
