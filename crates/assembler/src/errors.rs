//! Unified error type across assembler phases.

use std::fmt;

use crate::encoder::EncodeError;
use crate::parser::ParseError;
use crate::schedule::ScheduleError;
use crate::symbols::SymbolError;

/// Any failure while turning source into listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// Parse error during source line parsing.
    Parse(ParseError),
    /// Symbol table error.
    Symbol(SymbolError),
    /// Encoding error.
    Encode(EncodeError),
    /// Malformed input schedule.
    Schedule(ScheduleError),
}

impl AssembleError {
    /// Source line the error points at.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::Parse(e) => e.line,
            Self::Symbol(e) => e.line,
            Self::Encode(e) => e.line,
            Self::Schedule(e) => e.line,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "line {}: {e}", e.line),
            Self::Symbol(e) => write!(f, "line {}: {e}", e.line),
            Self::Encode(e) => write!(f, "line {}: {e}", e.line),
            Self::Schedule(e) => write!(f, "line {}: {e}", e.line),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<ParseError> for AssembleError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<SymbolError> for AssembleError {
    fn from(e: SymbolError) -> Self {
        Self::Symbol(e)
    }
}

impl From<EncodeError> for AssembleError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

impl From<ScheduleError> for AssembleError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}
