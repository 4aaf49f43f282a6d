//! The line protocol spoken with the orchestrator.
//!
//! After loading, the harness writes one handshake line. It then reads one
//! JSON state per input line and answers each with exactly one output line,
//! flushed before the next line is read:
//!
//! ```text
//! __rr_init:{"Ok":null}
//! __rr_output:{"Ok":{"robot_actions":{...},"logs":[...],...}}
//! ```
//!
//! Anything on the orchestrator's side that lacks one of the two prefixes is
//! stray output and can be shown to the user as is; see [`parse_line`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::config::WireFormat;
use crate::debug::DebugTable;
use crate::error::ProgramError;
use crate::model::{ObjId, State, StateError};
use crate::script::Program;
use crate::turn::{TurnOutcome, TurnReport, TurnRunner, UnitResult};

/// Prefix of the handshake line.
pub const INIT_PREFIX: &str = "__rr_init:";
/// Prefix of every turn answer.
pub const OUTPUT_PREFIX: &str = "__rr_output:";

/// A fault in the conversation itself, as opposed to in user logic.
#[derive(Debug)]
pub enum ProtocolError {
    /// Reading or writing a line failed.
    Io(io::Error),
    /// An input line was not a valid state.
    State {
        /// 1-based input line number.
        line: usize,
        /// What was wrong with it.
        source: StateError,
    },
    /// A report could not be encoded.
    Encode(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::State { line, source } => write!(f, "invalid state on input line {line}: {source}"),
            Self::Encode(e) => write!(f, "failed to encode report: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::State { source, .. } => Some(source),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Report shape of the older orchestrators.
#[derive(serde::Serialize)]
struct LegacyReport<'a> {
    robot_actions: BTreeMap<&'a ObjId, &'a UnitResult>,
    logs: &'a [String],
    debug_tables: BTreeMap<&'a ObjId, &'a DebugTable>,
    debug_inspections: &'a [ObjId],
}

static EMPTY_TABLE: DebugTable = DebugTable::new();

impl<'a> From<&'a TurnReport> for LegacyReport<'a> {
    fn from(report: &'a TurnReport) -> Self {
        let robot_actions = report
            .robot_actions
            .iter()
            .filter(|(_, result)| !matches!(result, Ok(None)))
            .collect();
        let debug_tables = report
            .robot_actions
            .keys()
            .map(|id| (id, report.debug_inspect_tables.get(id).unwrap_or(&EMPTY_TABLE)))
            .collect();
        Self {
            robot_actions,
            logs: &report.logs,
            debug_tables,
            debug_inspections: &report.debug_locate_queries,
        }
    }
}

/// Encode a turn outcome in the given wire format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_outcome(outcome: &TurnOutcome, wire: WireFormat) -> serde_json::Result<String> {
    match (outcome, wire) {
        (Ok(report), WireFormat::Legacy) => {
            serde_json::to_string(&Ok::<_, &ProgramError>(LegacyReport::from(report)))
        }
        _ => serde_json::to_string(outcome),
    }
}

/// Write the handshake line for a load result.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_handshake<W: Write>(out: &mut W, loaded: &Result<(), ProgramError>) -> io::Result<()> {
    let encoded = serde_json::to_string(loaded)?;
    writeln!(out, "{INIT_PREFIX}{encoded}")?;
    out.flush()
}

/// Answer every state line in `input` until end of input.
///
/// Blank lines are skipped. Returns the number of turns served.
///
/// # Errors
///
/// Returns an error on I/O failure or on the first line that is not a valid
/// state; no answer is written for that line.
pub fn serve<P, R, W>(runner: &mut TurnRunner<P>, input: R, out: &mut W) -> Result<usize, ProtocolError>
where
    P: Program,
    R: BufRead,
    W: Write,
{
    let wire = runner.config().wire;
    let mut turns = 0;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let state = State::from_json(&line).map_err(|source| ProtocolError::State {
            line: index + 1,
            source,
        })?;

        let outcome = runner.run_turn(state);
        let encoded = encode_outcome(&outcome, wire).map_err(ProtocolError::Encode)?;
        writeln!(out, "{OUTPUT_PREFIX}{encoded}")?;
        out.flush()?;

        turns += 1;
        debug!(turns, bytes = encoded.len(), "answered turn");
    }

    info!(turns, "input closed");
    Ok(turns)
}

/// One line of harness output, as seen by an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The handshake.
    Init(Result<(), ProgramError>),
    /// A turn answer.
    Output(TurnOutcome),
    /// Anything else.
    Log(String),
}

/// Classify a line written by the harness.
///
/// Reports in either wire format are accepted.
///
/// # Errors
///
/// Returns an error if a prefixed line does not carry valid JSON.
pub fn parse_line(line: &str) -> serde_json::Result<Message> {
    if let Some(rest) = line.strip_prefix(INIT_PREFIX) {
        Ok(Message::Init(serde_json::from_str(rest)?))
    } else if let Some(rest) = line.strip_prefix(OUTPUT_PREFIX) {
        Ok(Message::Output(serde_json::from_str(rest)?))
    } else {
        Ok(Message::Log(line.to_string()))
    }
}
