//! Actions a unit can decide to take.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Direction;

/// Kind of action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Attack the adjacent tile.
    Attack,
    /// Step onto the adjacent tile.
    Move,
}

impl ActionType {
    /// Name as it appears on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ActionType::Attack => "Attack",
            ActionType::Move => "Move",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionType.{}", self.name())
    }
}

/// A unit's decision for one turn.
///
/// Only constructible through [`Action::movement`] and [`Action::attack`].
/// Serialises as `{"type": "Move", "direction": "East"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    kind: ActionType,
    direction: Direction,
}

impl Action {
    /// Move one tile in `direction`.
    #[must_use]
    pub const fn movement(direction: Direction) -> Self {
        Self {
            kind: ActionType::Move,
            direction,
        }
    }

    /// Attack the tile in `direction`.
    #[must_use]
    pub const fn attack(direction: Direction) -> Self {
        Self {
            kind: ActionType::Attack,
            direction,
        }
    }

    /// The kind of action.
    #[must_use]
    pub const fn kind(self) -> ActionType {
        self.kind
    }

    /// The direction the action targets.
    #[must_use]
    pub const fn direction(self) -> Direction {
        self.direction
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.kind, self.direction)
    }
}
