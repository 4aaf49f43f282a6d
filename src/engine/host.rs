//! Types and functions exposed to robot scripts.
//!
//! Arguments other than the receiver are taken as `Dynamic` and checked by
//! hand so that a wrong argument surfaces as a `TypeError` naming the
//! function, not as a missing overload.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Module, Position};

use crate::debug::DebugChannel;
use crate::model::{Action, ActionType, Coords, Direction, GameObject, ObjType, State, Team};
use crate::script::FailureKind;

/// Where the running unit's debug channel lives while its `robot` call is in
/// progress. Empty at all other times.
pub(super) type DebugSlot = Rc<RefCell<Option<DebugChannel>>>;

type HostResult<T> = Result<T, Box<EvalAltResult>>;

/// Error raised by a host function, carried through Rhai as a thrown value.
#[derive(Debug, Clone)]
pub(super) struct HostError {
    pub(super) kind: FailureKind,
    pub(super) function: &'static str,
    pub(super) message: String,
}

/// Shared, read-only view of the turn's state as seen by scripts.
#[derive(Debug, Clone)]
pub struct StateHandle(Rc<State>);

impl StateHandle {
    /// Wrap a state.
    #[must_use]
    pub fn new(state: Rc<State>) -> Self {
        Self(state)
    }

    /// The wrapped state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.0
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<State turn={} {}>", self.0.turn(), self.0.our_team())
    }
}

fn raise(kind: FailureKind, function: &'static str, message: impl Into<String>) -> Box<EvalAltResult> {
    let error = HostError {
        kind,
        function,
        message: message.into(),
    };
    EvalAltResult::ErrorRuntime(Dynamic::from(error), Position::NONE).into()
}

fn expect<T: Any + Clone>(value: Dynamic, function: &'static str, expected: &str) -> HostResult<T> {
    value.try_cast::<T>().ok_or_else(|| {
        raise(
            FailureKind::Type,
            function,
            format!("{function} argument must be an instance of {expected}"),
        )
    })
}

fn offset(base: Coords, other: Dynamic, function: &'static str, negate: bool) -> HostResult<Coords> {
    let delta = if let Some(coords) = other.clone().try_cast::<Coords>() {
        coords
    } else if let Some(direction) = other.try_cast::<Direction>() {
        direction.to_coords()
    } else {
        return Err(raise(
            FailureKind::Type,
            function,
            format!("{function} argument must be an instance of Coords or Direction"),
        ));
    };
    Ok(if negate { base - delta } else { base + delta })
}

macro_rules! register_display {
    ($engine:expr, $($ty:ty),+ $(,)?) => {
        $(
            $engine
                .register_fn("to_string", |value: &mut $ty| value.to_string())
                .register_fn("to_debug", |value: &mut $ty| value.to_string());
        )+
    };
}

macro_rules! register_eq {
    ($engine:expr, $($ty:ty),+ $(,)?) => {
        $(
            $engine
                .register_fn("==", |a: $ty, b: $ty| a == b)
                .register_fn("!=", |a: $ty, b: $ty| a != b);
        )+
    };
}

macro_rules! display_as {
    ($value:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(inner) = $value.clone().try_cast::<$ty>() {
                return inner.to_string();
            }
        )+
    };
}

/// Text recorded for a debug value.
pub(super) fn stringify(value: &Dynamic) -> String {
    if value.is_unit() {
        return "()".to_string();
    }
    display_as!(
        value,
        Coords,
        Direction,
        Team,
        ObjType,
        ActionType,
        Action,
        GameObject,
        StateHandle,
    );
    value.to_string()
}

/// Install the whole script API on `engine`.
pub(super) fn register(engine: &mut Engine, debug: &DebugSlot) {
    register_coords(engine);
    register_enums(engine);
    register_action(engine);
    register_object(engine);
    register_state(engine);
    register_debug(engine, debug);

    register_display!(engine, Coords, Direction, Team, ObjType, ActionType, Action, GameObject, StateHandle);
    register_eq!(engine, Coords, Direction, Team, ObjType, ActionType, Action);
}

fn register_coords(engine: &mut Engine) {
    engine
        .register_type_with_name::<Coords>("Coords")
        .register_fn("Coords", |x: Dynamic, y: Dynamic| -> HostResult<Coords> {
            Ok(Coords::new(
                expect(x, "Coords", "int")?,
                expect(y, "Coords", "int")?,
            ))
        })
        .register_get("x", |c: &mut Coords| c.x)
        .register_get("y", |c: &mut Coords| c.y)
        .register_fn("distance_to", |c: &mut Coords, other: Dynamic| -> HostResult<f64> {
            Ok(c.distance_to(expect(other, "Coords.distance_to", "Coords")?))
        })
        .register_fn(
            "walking_distance_to",
            |c: &mut Coords, other: Dynamic| -> HostResult<i64> {
                Ok(c.walking_distance_to(expect(other, "Coords.walking_distance_to", "Coords")?))
            },
        )
        .register_fn("coords_around", |c: &mut Coords| -> Array {
            c.coords_around().into_iter().map(Dynamic::from).collect()
        })
        .register_fn("direction_to", |c: &mut Coords, other: Dynamic| -> HostResult<Direction> {
            Ok(c.direction_to(expect(other, "Coords.direction_to", "Coords")?))
        })
        .register_fn("+", |a: Coords, b: Dynamic| offset(a, b, "Coords.__add__", false))
        .register_fn("-", |a: Coords, b: Dynamic| offset(a, b, "Coords.__sub__", true))
        .register_fn("*", |a: Coords, n: Dynamic| -> HostResult<Coords> {
            Ok(a * expect::<i64>(n, "Coords.__mul__", "int")?)
        });
}

fn register_enums(engine: &mut Engine) {
    engine
        .register_type_with_name::<Direction>("Direction")
        .register_get("opposite", |d: &mut Direction| d.opposite())
        .register_get("to_coords", |d: &mut Direction| d.to_coords())
        .register_get("rotate_cw", |d: &mut Direction| d.rotate_cw())
        .register_get("rotate_ccw", |d: &mut Direction| d.rotate_ccw())
        .register_type_with_name::<Team>("Team")
        .register_get("opposite", |t: &mut Team| t.opposite())
        .register_type_with_name::<ObjType>("ObjType")
        .register_type_with_name::<ActionType>("ActionType");

    let mut directions = Module::new();
    for direction in Direction::ALL {
        directions.set_var(direction.name(), direction);
    }
    engine.register_static_module("Direction", directions.into());

    let mut teams = Module::new();
    for team in Team::ALL {
        teams.set_var(team.name(), team);
    }
    engine.register_static_module("Team", teams.into());

    let mut obj_types = Module::new();
    for obj_type in [ObjType::Unit, ObjType::Terrain] {
        obj_types.set_var(obj_type.name(), obj_type);
    }
    engine.register_static_module("ObjType", obj_types.into());

    let mut action_types = Module::new();
    for kind in [ActionType::Attack, ActionType::Move] {
        action_types.set_var(kind.name(), kind);
    }
    engine.register_static_module("ActionType", action_types.into());
}

fn register_action(engine: &mut Engine) {
    engine
        .register_type_with_name::<Action>("Action")
        .register_get("type", |a: &mut Action| a.kind())
        .register_get("direction", |a: &mut Action| a.direction());

    let mut actions = Module::new();
    actions.set_native_fn("move", |direction: Dynamic| -> HostResult<Action> {
        Ok(Action::movement(expect(direction, "Action.move", "Direction")?))
    });
    actions.set_native_fn("attack", |direction: Dynamic| -> HostResult<Action> {
        Ok(Action::attack(expect(direction, "Action.attack", "Direction")?))
    });
    engine.register_static_module("Action", actions.into());
}

fn register_object(engine: &mut Engine) {
    engine
        .register_type_with_name::<GameObject>("Obj")
        .register_get("id", |o: &mut GameObject| o.id().to_string())
        .register_get("coords", |o: &mut GameObject| o.coords())
        .register_get("obj_type", |o: &mut GameObject| o.obj_type())
        .register_get("team", |o: &mut GameObject| {
            o.team().map_or(Dynamic::UNIT, Dynamic::from)
        })
        .register_get("health", |o: &mut GameObject| {
            o.health().map_or(Dynamic::UNIT, Dynamic::from)
        });
}

fn object_or_unit(object: Option<&GameObject>) -> Dynamic {
    object.map_or(Dynamic::UNIT, |o| Dynamic::from(o.clone()))
}

fn register_state(engine: &mut Engine) {
    engine
        .register_type_with_name::<StateHandle>("State")
        .register_get("turn", |s: &mut StateHandle| s.state().turn())
        .register_get("our_team", |s: &mut StateHandle| s.state().our_team())
        .register_get("other_team", |s: &mut StateHandle| s.state().other_team())
        .register_get("grid_size", |s: &mut StateHandle| {
            i64::try_from(s.state().grid_size()).unwrap_or(i64::MAX)
        })
        .register_fn("obj_by_id", |s: &mut StateHandle, id: Dynamic| -> HostResult<Dynamic> {
            let id: ImmutableString = expect(id, "State.obj_by_id", "string")?;
            Ok(object_or_unit(s.state().object_by_id(&id)))
        })
        .register_fn("ids_by_team", |s: &mut StateHandle, team: Dynamic| -> HostResult<Array> {
            let team: Team = expect(team, "State.ids_by_team", "Team")?;
            Ok(s
                .state()
                .units_of(team)
                .iter()
                .map(|id| Dynamic::from(id.to_string()))
                .collect())
        })
        .register_fn("objs_by_team", |s: &mut StateHandle, team: Dynamic| -> HostResult<Array> {
            let team: Team = expect(team, "State.objs_by_team", "Team")?;
            Ok(s
                .state()
                .objects_of(team)
                .map(|o| Dynamic::from(o.clone()))
                .collect())
        })
        .register_fn("id_by_coords", |s: &mut StateHandle, coords: Dynamic| -> HostResult<Dynamic> {
            let coords: Coords = expect(coords, "State.id_by_coords", "Coords")?;
            Ok(s
                .state()
                .id_at(coords)
                .map_or(Dynamic::UNIT, |id| Dynamic::from(id.to_string())))
        })
        .register_fn("obj_by_coords", |s: &mut StateHandle, coords: Dynamic| -> HostResult<Dynamic> {
            let coords: Coords = expect(coords, "State.obj_by_coords", "Coords")?;
            Ok(object_or_unit(s.state().object_at(coords)))
        });
}

fn register_debug(engine: &mut Engine, debug: &DebugSlot) {
    let slot = Rc::clone(debug);
    engine.register_fn("debug_inspect", move |key: Dynamic, value: Dynamic| -> HostResult<()> {
        let key: ImmutableString = expect(key, "debug_inspect", "string")?;
        let mut slot = slot.borrow_mut();
        let channel = slot.as_mut().ok_or_else(|| outside_unit("debug_inspect"))?;
        channel.annotate(key.as_str(), stringify(&value));
        Ok(())
    });

    let slot = Rc::clone(debug);
    engine.register_fn("debug_locate", move |unit: Dynamic| -> HostResult<()> {
        let unit: GameObject = expect(unit, "debug_locate", "Obj")?;
        let mut slot = slot.borrow_mut();
        let channel = slot.as_mut().ok_or_else(|| outside_unit("debug_locate"))?;
        channel.flag(&unit);
        Ok(())
    });
}

fn outside_unit(function: &'static str) -> Box<EvalAltResult> {
    raise(
        FailureKind::Runtime,
        function,
        format!("{function} can only be used while a unit's robot function runs"),
    )
}
