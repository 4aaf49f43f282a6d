//! Domain model for a single turn.
//!
//! Read-only view over the snapshot the orchestrator sends each turn:
//! - Coordinates and cardinal directions
//! - Teams and object descriptors (units and terrain)
//! - The immutable per-turn `State`
//! - The `Action` a unit may decide to take

mod action;
mod coords;
mod state;

pub use action::{Action, ActionType};
pub use coords::{Coords, Direction};
pub use state::{GameObject, ObjId, ObjType, State, StateError, Team};
