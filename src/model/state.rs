//! The per-turn state snapshot.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Coords;

/// One of the two teams in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The red team.
    Red,
    /// The blue team.
    Blue,
}

impl Team {
    /// Both teams.
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    /// The other team.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Name as it appears on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team.{}", self.name())
    }
}

impl FromStr for Team {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Red" => Ok(Team::Red),
            "Blue" => Ok(Team::Blue),
            other => Err(StateError::UnknownTeam(other.to_string())),
        }
    }
}

/// Kind of object on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjType {
    /// A team-owned unit that can act.
    Unit,
    /// Impassable terrain.
    Terrain,
}

impl ObjType {
    /// Name as it appears on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ObjType::Unit => "Unit",
            ObjType::Terrain => "Terrain",
        }
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjType.{}", self.name())
    }
}

/// Unique object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjId(String);

impl ObjId {
    /// Create an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ObjId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An object on the grid.
///
/// `team` and `health` are present exactly when `obj_type` is `Unit`; this is
/// checked when the owning [`State`] is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameObject {
    id: ObjId,
    coords: Coords,
    obj_type: ObjType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    health: Option<i64>,
}

impl GameObject {
    /// Create a unit.
    #[must_use]
    pub fn unit(id: impl Into<String>, coords: Coords, team: Team, health: i64) -> Self {
        Self {
            id: ObjId::new(id),
            coords,
            obj_type: ObjType::Unit,
            team: Some(team),
            health: Some(health),
        }
    }

    /// Create a terrain object.
    #[must_use]
    pub fn terrain(id: impl Into<String>, coords: Coords) -> Self {
        Self {
            id: ObjId::new(id),
            coords,
            obj_type: ObjType::Terrain,
            team: None,
            health: None,
        }
    }

    /// Object id.
    #[must_use]
    pub fn id(&self) -> &ObjId {
        &self.id
    }

    /// Position on the grid.
    #[must_use]
    pub fn coords(&self) -> Coords {
        self.coords
    }

    /// Unit or terrain.
    #[must_use]
    pub fn obj_type(&self) -> ObjType {
        self.obj_type
    }

    /// Owning team, `None` for terrain.
    #[must_use]
    pub fn team(&self) -> Option<Team> {
        self.team
    }

    /// Remaining health, `None` for terrain.
    #[must_use]
    pub fn health(&self) -> Option<i64> {
        self.health
    }
}

impl fmt::Display for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.team, self.health) {
            (Some(team), Some(health)) => write!(
                f,
                "<{} id={} coords={} {team} health={health}>",
                self.obj_type, self.id, self.coords
            ),
            _ => write!(f, "<{} id={} coords={}>", self.obj_type, self.id, self.coords),
        }
    }
}

/// Error building a [`State`] from a request.
#[derive(Debug)]
pub enum StateError {
    /// The request was not valid JSON for the state schema.
    Json(serde_json::Error),
    /// A team name other than `Red` or `Blue`.
    UnknownTeam(String),
    /// An id referenced somewhere that has no object.
    UnknownId {
        /// Where the dangling id was found.
        context: &'static str,
        /// The id.
        id: String,
    },
    /// An object stored under a different key than its own id.
    MismatchedId {
        /// Map key.
        key: String,
        /// The object's own id.
        id: String,
    },
    /// A unit without a team or health.
    MissingUnitField {
        /// The unit id.
        id: String,
        /// Name of the missing field.
        field: &'static str,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid state json: {e}"),
            Self::UnknownTeam(name) => write!(f, "unknown team: {name:?}"),
            Self::UnknownId { context, id } => write!(f, "unknown object id {id:?} in {context}"),
            Self::MismatchedId { key, id } => {
                write!(f, "object stored under {key:?} has id {id:?}")
            }
            Self::MissingUnitField { id, field } => write!(f, "unit {id:?} has no {field}"),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Request body as it arrives on the wire.
#[derive(Debug, Deserialize)]
struct RawState {
    turn: i64,
    team: String,
    #[serde(default)]
    objs: HashMap<String, GameObject>,
    #[serde(default)]
    teams: BTreeMap<String, Vec<ObjId>>,
    #[serde(default)]
    grid: Vec<Vec<Option<ObjId>>>,
    #[serde(default)]
    grid_size: Option<usize>,
}

/// Immutable snapshot of one turn.
///
/// Every id listed for a team and every id on the grid resolves to an object.
/// The grid is indexed `grid[y][x]`.
#[derive(Debug, Clone)]
pub struct State {
    turn: i64,
    our_team: Team,
    objs: HashMap<ObjId, GameObject>,
    red: Vec<ObjId>,
    blue: Vec<ObjId>,
    grid: Vec<Vec<Option<ObjId>>>,
    grid_size: usize,
}

impl State {
    /// Parse and check a request line.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the schema or if any
    /// referenced id does not resolve.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let raw: RawState = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawState) -> Result<Self, StateError> {
        let our_team: Team = raw.team.parse()?;

        let mut objs = HashMap::with_capacity(raw.objs.len());
        for (key, mut obj) in raw.objs {
            if obj.id.as_str() != key {
                return Err(StateError::MismatchedId { key, id: obj.id.0 });
            }
            match obj.obj_type {
                ObjType::Unit => {
                    if obj.team.is_none() {
                        return Err(StateError::MissingUnitField { id: key, field: "team" });
                    }
                    if obj.health.is_none() {
                        return Err(StateError::MissingUnitField { id: key, field: "health" });
                    }
                }
                ObjType::Terrain => {
                    obj.team = None;
                    obj.health = None;
                }
            }
            objs.insert(obj.id.clone(), obj);
        }

        let mut red = Vec::new();
        let mut blue = Vec::new();
        for (name, ids) in raw.teams {
            let team: Team = name.parse()?;
            for id in &ids {
                if !objs.contains_key(id) {
                    return Err(StateError::UnknownId {
                        context: "team list",
                        id: id.0.clone(),
                    });
                }
            }
            match team {
                Team::Red => red = ids,
                Team::Blue => blue = ids,
            }
        }

        for id in raw.grid.iter().flatten().flatten() {
            if !objs.contains_key(id) {
                return Err(StateError::UnknownId {
                    context: "grid",
                    id: id.0.clone(),
                });
            }
        }

        let grid_size = raw.grid_size.unwrap_or(raw.grid.len());

        Ok(Self {
            turn: raw.turn,
            our_team,
            objs,
            red,
            blue,
            grid: raw.grid,
            grid_size,
        })
    }

    /// Build a state directly from objects; the grid is derived from their
    /// coordinates and team lists follow the order of `objs`.
    #[must_use]
    pub fn from_objects(turn: i64, our_team: Team, grid_size: usize, objs: Vec<GameObject>) -> Self {
        let mut grid = vec![vec![None; grid_size]; grid_size];
        let mut red = Vec::new();
        let mut blue = Vec::new();
        let mut map = HashMap::with_capacity(objs.len());
        for obj in objs {
            if let (Ok(x), Ok(y)) = (usize::try_from(obj.coords.x), usize::try_from(obj.coords.y))
                && let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x))
            {
                *cell = Some(obj.id.clone());
            }
            match obj.team {
                Some(Team::Red) => red.push(obj.id.clone()),
                Some(Team::Blue) => blue.push(obj.id.clone()),
                None => {}
            }
            map.insert(obj.id.clone(), obj);
        }
        Self {
            turn,
            our_team,
            objs: map,
            red,
            blue,
            grid,
            grid_size,
        }
    }

    /// Current turn number.
    #[must_use]
    pub fn turn(&self) -> i64 {
        self.turn
    }

    /// The team this program controls.
    #[must_use]
    pub fn our_team(&self) -> Team {
        self.our_team
    }

    /// The opposing team.
    #[must_use]
    pub fn other_team(&self) -> Team {
        self.our_team.opposite()
    }

    /// Side length of the square map.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Ids of the units a team controls, in the order the orchestrator gave.
    #[must_use]
    pub fn units_of(&self, team: Team) -> &[ObjId] {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }

    /// Objects of the units a team controls.
    pub fn objects_of(&self, team: Team) -> impl Iterator<Item = &GameObject> {
        self.units_of(team).iter().filter_map(|id| self.objs.get(id))
    }

    /// Look up an object; stale ids yield `None`.
    #[must_use]
    pub fn object_by_id(&self, id: &str) -> Option<&GameObject> {
        self.objs.get(id)
    }

    /// Id of the object occupying `coords`.
    #[must_use]
    pub fn id_at(&self, coords: Coords) -> Option<&ObjId> {
        let x = usize::try_from(coords.x).ok()?;
        let y = usize::try_from(coords.y).ok()?;
        self.grid.get(y)?.get(x)?.as_ref()
    }

    /// Object occupying `coords`.
    #[must_use]
    pub fn object_at(&self, coords: Coords) -> Option<&GameObject> {
        self.id_at(coords).and_then(|id| self.objs.get(id))
    }

    /// Number of objects in the snapshot.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "turn": 3,
        "team": "Red",
        "objs": {
            "1": {"id": "1", "coords": [1, 0], "obj_type": "Unit", "team": "Red", "health": 5},
            "2": {"id": "2", "coords": [0, 1], "obj_type": "Unit", "team": "Blue", "health": 4},
            "3": {"id": "3", "coords": [0, 0], "obj_type": "Terrain", "type": "Wall"}
        },
        "teams": {"Red": ["1"], "Blue": ["2"]},
        "grid": [["3", "1"], ["2", null]]
    }"#;

    #[test]
    fn test_parse_sample() {
        let state = State::from_json(SAMPLE).unwrap();
        assert_eq!(state.turn(), 3);
        assert_eq!(state.our_team(), Team::Red);
        assert_eq!(state.other_team(), Team::Blue);
        assert_eq!(state.units_of(Team::Red), &[ObjId::new("1")]);
        assert_eq!(state.units_of(Team::Blue), &[ObjId::new("2")]);
        assert_eq!(state.grid_size(), 2);
        assert_eq!(state.object_count(), 3);
    }

    #[test]
    fn test_grid_is_row_major() {
        let state = State::from_json(SAMPLE).unwrap();
        assert_eq!(state.id_at(Coords::new(1, 0)), Some(&ObjId::new("1")));
        assert_eq!(state.id_at(Coords::new(0, 1)), Some(&ObjId::new("2")));
        assert_eq!(state.id_at(Coords::new(1, 1)), None);
        let unit = state.object_at(Coords::new(1, 0)).unwrap();
        assert_eq!(unit.coords(), Coords::new(1, 0));
    }

    #[test]
    fn test_lookups_degrade_to_none() {
        let state = State::from_json(SAMPLE).unwrap();
        assert!(state.object_by_id("99").is_none());
        assert!(state.id_at(Coords::new(-1, 0)).is_none());
        assert!(state.id_at(Coords::new(0, 7)).is_none());
        assert!(state.object_at(Coords::new(i64::MAX, i64::MIN)).is_none());
    }

    #[test]
    fn test_terrain_has_no_team_or_health() {
        let state = State::from_json(SAMPLE).unwrap();
        let wall = state.object_by_id("3").unwrap();
        assert_eq!(wall.obj_type(), ObjType::Terrain);
        assert!(wall.team().is_none());
        assert!(wall.health().is_none());
    }

    #[test]
    fn test_unknown_team_rejected() {
        let json = SAMPLE.replacen(r#""team": "Red","#, r#""team": "Green","#, 1);
        assert!(matches!(
            State::from_json(&json),
            Err(StateError::UnknownTeam(name)) if name == "Green"
        ));

        let json = SAMPLE.replace(r#""Blue": ["2"]}"#, r#""Blue": ["2"], "Green": []}"#);
        assert!(matches!(
            State::from_json(&json),
            Err(StateError::UnknownTeam(name)) if name == "Green"
        ));
    }

    #[test]
    fn test_dangling_ids_rejected() {
        let json = SAMPLE.replace(r#"["2", null]"#, r#"["2", "42"]"#);
        assert!(matches!(
            State::from_json(&json),
            Err(StateError::UnknownId { context: "grid", .. })
        ));

        let json = SAMPLE.replace(r#""Blue": ["2"]"#, r#""Blue": ["2", "8"]"#);
        assert!(matches!(
            State::from_json(&json),
            Err(StateError::UnknownId { context: "team list", .. })
        ));
    }

    #[test]
    fn test_unit_without_team_rejected() {
        let json = SAMPLE.replace(r#""team": "Blue", "health": 4"#, r#""health": 4"#);
        assert!(matches!(
            State::from_json(&json),
            Err(StateError::MissingUnitField { field: "team", .. })
        ));
    }

    #[test]
    fn test_missing_team_list_is_empty() {
        let json = SAMPLE.replace(r#""teams": {"Red": ["1"], "Blue": ["2"]}"#, r#""teams": {"Red": ["1"]}"#);
        let state = State::from_json(&json).unwrap();
        assert!(state.units_of(Team::Blue).is_empty());
    }

    #[test]
    fn test_from_objects_builds_grid() {
        let state = State::from_objects(
            0,
            Team::Blue,
            4,
            vec![
                GameObject::unit("a", Coords::new(2, 3), Team::Blue, 5),
                GameObject::terrain("w", Coords::new(0, 0)),
            ],
        );
        assert_eq!(state.id_at(Coords::new(2, 3)), Some(&ObjId::new("a")));
        assert_eq!(state.units_of(Team::Blue), &[ObjId::new("a")]);
        assert_eq!(state.objects_of(Team::Blue).count(), 1);
    }

    #[test]
    fn test_object_display() {
        let unit = GameObject::unit("7", Coords::new(1, 2), Team::Red, 3);
        assert_eq!(
            unit.to_string(),
            "<ObjType.Unit id=7 coords=(1, 2) Team.Red health=3>"
        );
        let wall = GameObject::terrain("8", Coords::new(0, 0));
        assert_eq!(wall.to_string(), "<ObjType.Terrain id=8 coords=(0, 0)>");
    }
}
