#![no_main]

//! Structured turn fuzzer.
//!
//! Builds well-formed states from fuzzer input and checks the turn loop's
//! invariants: every unit of the controlled team gets exactly one result,
//! nothing else does, and per-unit failures never escape the turn.

use arbitrary::Arbitrary;
use gridbot::model::{Coords, Direction, GameObject, State, Team};
use gridbot::script::{FailureKind, Returned, ScriptFailure};
use gridbot::{Action, HarnessConfig, NativeProgram, TurnRunner};
use libfuzzer_sys::fuzz_target;

/// What a fuzzed robot does for one unit.
#[derive(Arbitrary, Debug, Clone, Copy)]
enum Behaviour {
    Idle,
    Move(u8),
    Attack(u8),
    Fail,
    ReturnJunk,
    Annotate,
}

/// One fuzzed unit.
#[derive(Arbitrary, Debug)]
struct FuzzUnit {
    x: i8,
    y: i8,
    red: bool,
    health: i16,
    behaviour: Behaviour,
}

#[derive(Arbitrary, Debug)]
struct TurnInput {
    red_to_move: bool,
    units: Vec<FuzzUnit>,
}

fuzz_target!(|input: TurnInput| {
    let units: Vec<FuzzUnit> = input.units.into_iter().take(32).collect();
    let behaviours: Vec<Behaviour> = units.iter().map(|u| u.behaviour).collect();
    let objs = units
        .iter()
        .enumerate()
        .map(|(i, u)| {
            let team = if u.red { Team::Red } else { Team::Blue };
            let coords = Coords::new(i64::from(u.x), i64::from(u.y));
            GameObject::unit(i.to_string(), coords, team, i64::from(u.health))
        })
        .collect();
    let our_team = if input.red_to_move { Team::Red } else { Team::Blue };
    let state = State::from_objects(1, our_team, 16, objs);
    let expected = state.units_of(our_team).len();

    let program = NativeProgram::new(move |_, unit, debug| {
        let index: usize = unit.id().as_str().parse().unwrap_or(0);
        match behaviours.get(index).copied().unwrap_or(Behaviour::Idle) {
            Behaviour::Idle => Ok(Returned::Nothing),
            Behaviour::Move(d) => Ok(Returned::Action(Action::movement(Direction::ALL[usize::from(d % 4)]))),
            Behaviour::Attack(d) => Ok(Returned::Action(Action::attack(Direction::ALL[usize::from(d % 4)]))),
            Behaviour::Fail => Err(ScriptFailure::new(FailureKind::Exception, "fuzzed failure")),
            Behaviour::ReturnJunk => Ok(Returned::Other("int".to_string())),
            Behaviour::Annotate => {
                debug.annotate("coords", unit.coords().to_string());
                debug.flag(unit);
                Ok(Returned::Nothing)
            }
        }
    });

    let mut runner = TurnRunner::new(program, HarnessConfig::default());
    let report = runner.run_turn(state).expect("valid program never fails a turn");
    assert_eq!(report.robot_actions.len(), expected);
    assert!(report.debug_inspect_tables.values().all(|t| !t.is_empty()));
    assert!(report.debug_locate_queries.len() <= expected);
});
