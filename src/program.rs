// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Loading Intcode program images
//!
//! The usual format is comma-separated decimal ints, possibly spread over several lines. Blank
//! lines and lines starting with `#` are skipped, so program files can carry comments.
//!
//! Programs can also be stored as raw 64-bit ints, in either byte order.
//!
//! # Example
//!
//! ```
//! use ivm::program::parse_program;
//! const SOURCE: &str = "
//! ## outputs 1024
//! 104,1024,
//! 99
//! ";
//! assert_eq!(parse_program(SOURCE).unwrap(), vec![104, 1024, 99]);
//! ```

use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::Utf8Error;
use thiserror::Error;

/// How a program image is stored
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Encoding {
    /// comma-separated ASCII-encoded decimal numbers
    #[default]
    Text,
    /// little-endian 64-bit integers
    LittleEndian,
    /// big-endian 64-bit integers
    BigEndian,
}

/// An error that occurred while loading a program image
#[derive(Debug, Error)]
pub enum ProgramError {
    /// The file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// path of the file
        path: PathBuf,
        /// the underlying error
        #[source]
        source: io::Error,
    },
    /// A text program was not valid UTF-8
    #[error("program text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    /// A token in a text program was not a valid `i64`
    #[error("line {line}: {token:?} is not a valid integer: {source}")]
    InvalidInt {
        /// 1-based line number
        line: usize,
        /// the offending token
        token: Box<str>,
        /// the underlying error
        #[source]
        source: ParseIntError,
    },
    /// A binary program's length was not a multiple of 8 bytes
    #[error("expected 8 bytes, got {}: {:02x?}", .0.len(), .0)]
    IncompleteWord(Box<[u8]>),
}

/// Parse a text program image into its ints.
///
/// Lines are concatenated, skipping blank lines and lines starting with `#`. Each line is split on
/// commas, and empty tokens (such as the one after a trailing comma) are ignored.
pub fn parse_program(text: &str) -> Result<Vec<i64>, ProgramError> {
    let mut program = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let value = token.parse().map_err(|source| ProgramError::InvalidInt {
                line: index + 1,
                token: Box::from(token),
                source,
            })?;
            program.push(value);
        }
    }
    Ok(program)
}

/// Decode a program image stored with `encoding`
///
/// # Example
///
/// ```
/// use ivm::program::{decode_program, Encoding};
/// let bytes: Vec<u8> = [104_i64, 7, 99].iter().flat_map(|i| i.to_be_bytes()).collect();
/// assert_eq!(decode_program(&bytes, Encoding::BigEndian).unwrap(), vec![104, 7, 99]);
/// ```
pub fn decode_program(bytes: &[u8], encoding: Encoding) -> Result<Vec<i64>, ProgramError> {
    match encoding {
        Encoding::Text => parse_program(std::str::from_utf8(bytes)?),
        Encoding::LittleEndian => decode_words(bytes, i64::from_le_bytes),
        Encoding::BigEndian => decode_words(bytes, i64::from_be_bytes),
    }
}

/// Read the program image stored with `encoding` at `path`
pub fn read_program(path: impl AsRef<Path>, encoding: Encoding) -> Result<Vec<i64>, ProgramError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ProgramError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_program(&bytes, encoding)
}

fn decode_words(bytes: &[u8], func: fn([u8; 8]) -> i64) -> Result<Vec<i64>, ProgramError> {
    let chunks = bytes.chunks_exact(8);
    if !chunks.remainder().is_empty() {
        return Err(ProgramError::IncompleteWord(Box::from(chunks.remainder())));
    }
    Ok(chunks
        .map(|chunk| {
            let mut word = [0; 8];
            word.copy_from_slice(chunk);
            func(word)
        })
        .collect())
}
