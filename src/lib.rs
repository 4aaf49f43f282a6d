// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Gridbot: a turn harness for team-vs-team grid robot games.
//!
//! An orchestrator sends one JSON game state per line; the harness runs the
//! user's `robot` function once for every unit of the controlled team and
//! answers with one line of results, captured logs and debug annotations.
//! A failure in one unit's logic never affects the others.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Line protocol (protocol)        │
//! ├─────────────────────────────────────┤
//! │   Turn loop (turn) + capture/debug  │
//! ├─────────────────────────────────────┤
//! │   Program trait (script)            │
//! ├──────────────────┬──────────────────┤
//! │  Rhai (engine)   │  Rust (native)   │
//! └──────────────────┴──────────────────┘
//! ```

pub mod capture;
pub mod classify;
pub mod config;
pub mod debug;
pub mod engine;
pub mod entry;
pub mod error;
pub mod model;
pub mod native;
pub mod protocol;
pub mod script;
pub mod turn;

pub use config::{HarnessConfig, WireFormat};
pub use engine::{LoadError, RhaiProgram};
pub use error::{ErrorLoc, ErrorRecord, ProgramError};
pub use model::{Action, ActionType, Coords, Direction, GameObject, ObjId, ObjType, State, Team};
pub use native::NativeProgram;
pub use protocol::ProtocolError;
pub use script::Program;
pub use turn::{TurnOutcome, TurnReport, TurnRunner, UnitResult};
