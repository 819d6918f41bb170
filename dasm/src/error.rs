//! Everything that can go wrong while tokenizing, parsing or packing
//! assembly source. One flat enum per the core's error-enum-plus-`Display`
//! convention (see `dvm::error`); no `anyhow`/`thiserror`.

use std::error::Error as StdError;
use std::fmt;

/// A 1-based source line, attached to every lexical and syntactic error so
/// a failure can be reported without a separate source-map lookup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Location {
    pub line: u32,
}

impl Location {
    pub fn new(line: u32) -> Location {
        Location { line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AssembleError {
    IllegalCharacter(Location, char),
    MalformedNumber(Location),
    UnterminatedString(Location),
    InvalidUtf8InString(Location),
    ExpectedStatement(Location),
    UnknownMnemonic(Location, String),
    WrongOperandCount {
        location: Location,
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    DuplicateLabel(Location, String),
    UndefinedLabel(String),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::IllegalCharacter(loc, c) => {
                write!(f, "{}: illegal character '{}'", loc, c)
            }
            AssembleError::MalformedNumber(loc) => {
                write!(f, "{}: malformed number literal", loc)
            }
            AssembleError::UnterminatedString(loc) => {
                write!(f, "{}: unterminated string literal", loc)
            }
            AssembleError::InvalidUtf8InString(loc) => {
                write!(f, "{}: string literal is not valid UTF-8", loc)
            }
            AssembleError::ExpectedStatement(loc) => {
                write!(f, "{}: expected a label definition or a mnemonic", loc)
            }
            AssembleError::UnknownMnemonic(loc, name) => {
                write!(f, "{}: \"{}\" is not a known mnemonic", loc, name)
            }
            AssembleError::WrongOperandCount {
                location,
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "{}: {} takes {} operand(s), found {}",
                location, mnemonic, expected, found
            ),
            AssembleError::DuplicateLabel(loc, name) => {
                write!(f, "{}: label \"{}\" is already defined", loc, name)
            }
            AssembleError::UndefinedLabel(name) => {
                write!(f, "label \"{}\" is referenced but never defined", name)
            }
        }
    }
}

impl StdError for AssembleError {}
