// Licensed under the Apache-2.0 license

//! Line classification for register-map sources.
//!
//! Each input line is matched against an ordered list of grammars and the
//! first one that consumes the whole (normalized) line wins:
//!
//! ```text
//! @1000              address directive (digits in the current radix)
//! #module UART       option directive
//! UART/CTRL.HB       register declaration, optional module and B/H/W/R flags
//!     MODE.R [3:0]   field declaration (leading whitespace), A/R flags, range
//! &                  overlap marker, starts a new layer
//! ```
//!
//! Leading whitespace is the only thing separating a register line from a
//! field line, so normalization never touches the start of a line.

use winnow::combinator::{delimited, opt, preceded, terminated};
use winnow::token::{one_of, take_while};
use winnow::{ModalResult, Parser};

/// A classified source line. Tokens borrow from the input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// `@` followed by hex-digit characters.
    Address(&'a str),
    /// `#name value`.
    Option { name: &'a str, value: &'a str },
    /// `[module/]name[.flags]`.
    Register {
        module: Option<&'a str>,
        name: &'a str,
        flags: Option<&'a str>,
    },
    /// `<ws>name[.flags] [[hi] | [hi:lo]]`. The range holds the raw decimal
    /// digits `(hi, lo)`.
    Field {
        name: &'a str,
        flags: Option<&'a str>,
        range: Option<(&'a str, Option<&'a str>)>,
    },
    Overlap,
    Blank,
    /// Anything else, with surrounding whitespace removed.
    Unrecognized(&'a str),
}

/// Classify one line of input. The line terminator may or may not be present.
pub fn classify(line: &str) -> Line<'_> {
    let line = normalize(line);

    if let Ok(digits) = address.parse(line) {
        return Line::Address(digits);
    }
    if let Ok((name, value)) = option.parse(line) {
        return Line::Option { name, value };
    }
    if let Ok((module, name, flags)) = register.parse(line) {
        return Line::Register {
            module,
            name,
            flags,
        };
    }
    if let Ok((name, flags, range)) = field.parse(line) {
        return Line::Field { name, flags, range };
    }
    if line == "&" {
        return Line::Overlap;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        Line::Blank
    } else {
        Line::Unrecognized(trimmed)
    }
}

fn normalize(line: &str) -> &str {
    line.trim_end()
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn whitespace<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., char::is_whitespace).parse_next(input)
}

fn identifier<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., is_word),
    )
        .take()
        .parse_next(input)
}

fn address<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded('@', take_while(1.., |c: char| c.is_ascii_hexdigit())).parse_next(input)
}

fn option<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str)> {
    (
        preceded('#', take_while(1.., |c: char| c.is_ascii_lowercase())),
        preceded(whitespace, take_while(1.., is_word)),
    )
        .parse_next(input)
}

type RegisterTokens<'s> = (Option<&'s str>, &'s str, Option<&'s str>);

fn register<'s>(input: &mut &'s str) -> ModalResult<RegisterTokens<'s>> {
    (
        opt(terminated(identifier, '/')),
        identifier,
        opt(preceded('.', take_while(1.., ['B', 'H', 'W', 'R']))),
    )
        .parse_next(input)
}

type BitRange<'s> = (&'s str, Option<&'s str>);

fn decimal<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

fn bit_range<'s>(input: &mut &'s str) -> ModalResult<BitRange<'s>> {
    delimited('[', (decimal, opt(preceded(':', decimal))), ']').parse_next(input)
}

type FieldTokens<'s> = (&'s str, Option<&'s str>, Option<BitRange<'s>>);

fn field<'s>(input: &mut &'s str) -> ModalResult<FieldTokens<'s>> {
    preceded(
        whitespace,
        (
            identifier,
            opt(preceded('.', take_while(1.., ['A', 'R']))),
            opt(preceded(whitespace, bit_range)),
        ),
    )
    .parse_next(input)
}
