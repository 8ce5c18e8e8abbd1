// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP argument tokenizer using nom
//!
//! Tokenizes the argument region of a STEP entity line into a flat tape.
//! Set structure is preserved with `SetOpen`/`SetClose` markers so the
//! loader can serve random-access cursor reads without re-parsing.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, verify},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// One tape token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Entity reference: #123
    Ref(u32),
    /// Float: 3.14, 0., 1.5E-10
    Real(f64),
    /// Integer: 42
    Integer(i64),
    /// String literal: 'text'
    Str(String),
    /// Enum: .T., .AREA. (dots stripped)
    Enum(String),
    /// Typed-value label: IFCPARAMETERVALUE in IFCPARAMETERVALUE(0.)
    Label(String),
    /// Start of a parenthesized set
    SetOpen,
    /// End of a parenthesized set
    SetClose,
    /// Null value: $
    Null,
    /// Derived value: *
    Derived,
}

/// Peekable token discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ref,
    Real,
    Integer,
    String,
    Enum,
    Label,
    Set,
    SetEnd,
    Null,
    Derived,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Ref(_) => TokenKind::Ref,
            Token::Real(_) => TokenKind::Real,
            Token::Integer(_) => TokenKind::Integer,
            Token::Str(_) => TokenKind::String,
            Token::Enum(_) => TokenKind::Enum,
            Token::Label(_) => TokenKind::Label,
            Token::SetOpen => TokenKind::Set,
            Token::SetClose => TokenKind::SetEnd,
            Token::Null => TokenKind::Null,
            Token::Derived => TokenKind::Derived,
        }
    }
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::Ref,
    )(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.
/// IFC allows floats like "0." without decimal digits
/// Uses lexical-core for 10x faster parsing
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            char('.'),
            opt(digit1), // optional to support "0." format
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| {
            lexical_core::parse::<f64>(s.as_bytes())
                .map(Token::Real)
                .map_err(|_| "parse error")
        },
    )(input)
}

/// Parse integer: 42, -42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(tuple((opt(char('-')), digit1))), |s: &str| {
        lexical_core::parse::<i64>(s.as_bytes())
            .map(Token::Integer)
            .map_err(|_| "parse error")
    })(input)
}

/// Parse string literal: 'text'
/// IFC uses '' to escape a single quote within a string
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn content(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2; // escaped quote
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    map(delimited(char('\''), content, char('\'')), |s: &str| {
        Token::Str(s.replace("''", "'"))
    })(input)
}

/// Parse enum: .T., .F., .AREA.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            char('.'),
        ),
        |s: &str| Token::Enum(s.to_string()),
    )(input)
}

/// Parse typed-value label: IFCPARAMETERVALUE, IFCBOOLEAN
fn label(input: &str) -> IResult<&str, Token> {
    map(
        verify(
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            |s: &str| s.starts_with(|c: char| c.is_alphabetic()),
        ),
        |s: &str| Token::Label(s.to_string()),
    )(input)
}

/// Parse null: $
fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

/// Parse derived: *
fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

/// Parse a single atomic token
fn token(input: &str) -> IResult<&str, Token> {
    alt((
        float, // try float before integer (float includes '.')
        integer,
        entity_ref,
        string_literal,
        enum_value,
        label,
        null,
        derived,
    ))(input)
}

/// Tokenize the argument region of an entity line onto the tape.
///
/// `input` starts right after the opening '(' of the argument list.
/// Returns the number of bytes consumed, including the closing ')'.
pub(crate) fn tokenize_arguments(input: &str, tape: &mut Vec<Token>) -> Result<usize> {
    let bytes = input.as_bytes();
    let mut pos = 0usize;
    let mut depth = 1usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' | b',' => pos += 1,
            b'(' => {
                depth += 1;
                tape.push(Token::SetOpen);
                pos += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
                tape.push(Token::SetClose);
                pos += 1;
            }
            _ => {
                let (rest, tok) = token(&input[pos..]).map_err(|_| {
                    Error::parse(pos, format!("unrecognized token near {:?}", &input[pos..input.len().min(pos + 24)]))
                })?;
                pos = input.len() - rest.len();
                tape.push(tok);
            }
        }
    }

    Err(Error::parse(pos, "unterminated argument list"))
}

/// Skip whitespace, returning the number of bytes consumed
pub(crate) fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}
