//! Error records reported to the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(line, column)` position; the column may be unknown.
pub type Range = (usize, Option<usize>);

/// Source location of a failure inside the user's script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLoc {
    /// Where the failing expression starts.
    pub start: Range,
    /// Where it ends, when known.
    pub end: Option<Range>,
}

impl ErrorLoc {
    /// A location pointing at a single position.
    #[must_use]
    pub const fn at(line: usize, column: Option<usize>) -> Self {
        Self {
            start: (line, column),
            end: None,
        }
    }
}

/// A classified failure of user logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// One-line human-facing description.
    pub summary: String,
    /// Full diagnostic text.
    pub details: String,
    /// Innermost position in user code, if one could be determined.
    pub loc: Option<ErrorLoc>,
}

impl ErrorRecord {
    /// A record without details or location.
    #[must_use]
    pub fn summary_only(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: String::new(),
            loc: None,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(ErrorLoc {
                start: (line, Some(column)),
                ..
            }) => write!(f, "{} (line {line}, column {column})", self.summary),
            Some(ErrorLoc {
                start: (line, None),
                ..
            }) => write!(f, "{} (line {line})", self.summary),
            None => f.write_str(&self.summary),
        }
    }
}

/// Failure of the program as a whole, rather than of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramError {
    /// The script failed to load, lacks valid entry points, or `init_turn`
    /// raised.
    InitError(ErrorRecord),
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitError(record) => write!(f, "init error: {record}"),
        }
    }
}

impl std::error::Error for ProgramError {}
