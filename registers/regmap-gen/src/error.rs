// Licensed under the Apache-2.0 license

use thiserror::Error;

/// Fatal conditions raised while building the register model.
///
/// Every variant carries the 1-based line number of the offending input line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegmapError {
    #[error("line {line}: unrecognized line: \"{text}\"")]
    UnrecognizedLine { line: usize, text: String },

    #[error("line {line}: field `{field}` declared with no active register")]
    FieldWithoutRegister { line: usize, field: String },

    #[error("line {line}: overlap marker with no active register")]
    OverlapWithoutRegister { line: usize },

    #[error("line {line}: `{digits}` is not a valid address in radix {radix}")]
    InvalidAddress {
        line: usize,
        digits: String,
        radix: u32,
    },

    #[error("line {line}: invalid radix `{value}` (expected 2..=36)")]
    InvalidRadix { line: usize, value: String },

    #[error("line {line}: invalid bit index `{value}`")]
    InvalidBitIndex { line: usize, value: String },

    #[error("line {line}: field `{field}` has inverted range [{high}:{low}]")]
    InvertedRange {
        line: usize,
        field: String,
        high: u32,
        low: u32,
    },

    #[error(
        "line {line}: field `{field}` reaches bit {bit}, beyond the {bits}-bit register `{register}`"
    )]
    FieldOutOfRange {
        line: usize,
        field: String,
        register: String,
        bit: u32,
        bits: u32,
    },

    #[error("line {line}: address cursor overflows past register `{register}`")]
    AddressOverflow { line: usize, register: String },
}

pub type Result<T> = std::result::Result<T, RegmapError>;
