//! Coordinates and directions.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// One of the four cardinal directions.
///
/// The grid's y axis grows southwards, so `North` is `(0, -1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards decreasing y.
    North,
    /// Towards increasing y.
    South,
    /// Towards increasing x.
    East,
    /// Towards decreasing x.
    West,
}

impl Direction {
    /// All directions, in declaration order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Unit displacement for one step in this direction.
    #[must_use]
    pub const fn to_coords(self) -> Coords {
        match self {
            Direction::North => Coords::new(0, -1),
            Direction::South => Coords::new(0, 1),
            Direction::East => Coords::new(1, 0),
            Direction::West => Coords::new(-1, 0),
        }
    }

    /// Quarter turn clockwise.
    #[must_use]
    pub const fn rotate_cw(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Quarter turn counter-clockwise.
    #[must_use]
    pub const fn rotate_ccw(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Name as it appears on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Direction.{}", self.name())
    }
}

/// A position on the grid.
///
/// Arithmetic saturates instead of overflowing, so every operator is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Coords {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

impl Coords {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance_to(self, other: Coords) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx.hypot(dy)
    }

    /// Manhattan distance, the number of steps a unit has to walk.
    #[must_use]
    pub fn walking_distance_to(self, other: Coords) -> i64 {
        other
            .x
            .saturating_sub(self.x)
            .saturating_abs()
            .saturating_add(other.y.saturating_sub(self.y).saturating_abs())
    }

    /// The four neighbouring coordinates, in `Direction::ALL` order.
    #[must_use]
    pub fn coords_around(self) -> [Coords; 4] {
        Direction::ALL.map(|direction| self + direction)
    }

    /// The cardinal direction that best points from `self` towards `other`.
    ///
    /// The plane is split into four 90° sectors centred on the cardinal
    /// directions. The split is computed on integers so that the 45°
    /// boundaries are exact: a boundary on the western half resolves to
    /// `West`, one on the eastern half to `North` or `South`. Equal
    /// coordinates resolve to `West`.
    #[must_use]
    pub fn direction_to(self, other: Coords) -> Direction {
        let dx = i128::from(self.x) - i128::from(other.x);
        let dy = i128::from(self.y) - i128::from(other.y);
        if dx >= dy.abs() {
            Direction::West
        } else if dy < 0 && dx.abs() <= -dy {
            Direction::South
        } else if dy > 0 && dx.abs() <= dy {
            Direction::North
        } else {
            Direction::East
        }
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i64, i64)> for Coords {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Coords> for (i64, i64) {
    fn from(coords: Coords) -> Self {
        (coords.x, coords.y)
    }
}

impl Add for Coords {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Add<Direction> for Coords {
    type Output = Self;

    fn add(self, rhs: Direction) -> Self {
        self + rhs.to_coords()
    }
}

impl Sub for Coords {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Sub<Direction> for Coords {
    type Output = Self;

    fn sub(self, rhs: Direction) -> Self {
        self - rhs.to_coords()
    }
}

impl Mul<i64> for Coords {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self::new(self.x.saturating_mul(rhs), self.y.saturating_mul(rhs))
    }
}
