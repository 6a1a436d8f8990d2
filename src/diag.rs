use std::error::Error;
use std::fmt;

use crate::token::TokenKind;

/// A syntax error along with the line it was detected on.
#[derive(Debug, PartialEq, Clone)]
pub struct FullParseError {
    pub pos: Position,
    pub error: ParseError,
}

impl fmt::Display for FullParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: line {}: {}", self.pos, self.error)
    }
}

impl Error for FullParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// Line number (starting at one).
pub type Position = u32;

#[derive(Debug, PartialEq, Clone)]
pub enum ParseError {
    /// `expect_peek()` found another kind than the one the grammar requires.
    UnexpectedToken { expected: TokenKind, got: TokenKind },
    /// No expression can start with this token kind.
    NoPrefixParseFn(TokenKind),
    BadIntegerLiteral(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, got } => write!(
                f,
                "expected next token to be {}, got {} instead",
                expected, got
            ),
            ParseError::NoPrefixParseFn(kind) => {
                write!(f, "no prefix parse function for {} found", kind)
            }
            ParseError::BadIntegerLiteral(lit) => {
                write!(f, "could not parse {} as integer", lit)
            }
        }
    }
}
