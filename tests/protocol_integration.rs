//! End-to-end tests: real Rhai robots driven through the line protocol.
//!
//! Run with: cargo test protocol_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::io::{Cursor, Write};

use gridbot::capture::OutputStream;
use gridbot::protocol::{self, Message};
use gridbot::{
    Action, Direction, HarnessConfig, ProgramError, RhaiProgram, TurnReport, TurnRunner, WireFormat,
};
use serde_json::json;

/// Two red units, one blue unit and a wall on a 5x5 grid.
fn state_line(turn: i64) -> String {
    let mut grid = vec![vec![serde_json::Value::Null; 5]; 5];
    grid[1][1] = json!("1");
    grid[1][2] = json!("2");
    grid[3][3] = json!("3");
    grid[0][4] = json!("w");
    json!({
        "turn": turn,
        "team": "Red",
        "objs": {
            "1": {"id": "1", "coords": [1, 1], "obj_type": "Unit", "team": "Red", "health": 5},
            "2": {"id": "2", "coords": [2, 1], "obj_type": "Unit", "team": "Red", "health": 4},
            "3": {"id": "3", "coords": [3, 3], "obj_type": "Unit", "team": "Blue", "health": 5},
            "w": {"id": "w", "coords": [4, 0], "obj_type": "Terrain"}
        },
        "teams": {"Red": ["1", "2"], "Blue": ["3"]},
        "grid": grid
    })
    .to_string()
}

fn serve_script(source: &str, config: HarnessConfig, turns: i64) -> Vec<String> {
    let program = RhaiProgram::load(source, &config, OutputStream::default()).unwrap();
    let mut runner = TurnRunner::new(program, config);
    let input: String = (1..=turns).map(|t| state_line(t) + "\n").collect();
    let mut out = Vec::new();
    let served = protocol::serve(&mut runner, Cursor::new(input), &mut out).unwrap();
    assert_eq!(served, usize::try_from(turns).unwrap());
    String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
}

fn reports(source: &str, turns: i64) -> Vec<Result<TurnReport, ProgramError>> {
    serve_script(source, HarnessConfig::default(), turns)
        .iter()
        .map(|line| match protocol::parse_line(line).unwrap() {
            Message::Output(outcome) => outcome,
            other => panic!("unexpected line: {other:?}"),
        })
        .collect()
}

fn single_report(source: &str) -> TurnReport {
    reports(source, 1).remove(0).unwrap()
}

#[test]
fn test_noop_robot() {
    let report = single_report("fn robot(state, unit) { }");
    assert_eq!(report.robot_actions.len(), 2);
    assert!(report.robot_actions.values().all(|r| *r == Ok(None)));
    assert!(report.logs.is_empty());
    assert!(report.debug_inspect_tables.is_empty());
    assert!(report.debug_locate_queries.is_empty());
}

#[test]
fn test_always_move_east() {
    let report = single_report("fn robot(state, unit) { Action::move(Direction::East) }");
    for result in report.robot_actions.values() {
        assert_eq!(*result, Ok(Some(Action::movement(Direction::East))));
    }
}

#[test]
fn test_failure_in_one_unit_only() {
    let source = r#"fn robot(state, unit) {
    if unit.id == "2" {
        throw "bad unit";
    }
    Action::attack(Direction::North)
}"#;
    let report = single_report(source);
    assert_eq!(report.robot_actions["1"], Ok(Some(Action::attack(Direction::North))));
    let err = report.robot_actions["2"].as_ref().unwrap_err();
    assert_eq!(err.summary, "Exception: bad unit");
    assert_eq!(err.loc.as_ref().map(|l| l.start.0), Some(3));
    assert!(err.details.contains("<robot>"));
}

#[test]
fn test_identical_input_identical_output() {
    let source = r#"fn robot(state, unit) {
    debug_inspect("hp", unit.health);
    let enemy = state.objs_by_team(state.other_team)[0];
    debug_locate(enemy);
    Action::move(unit.coords.direction_to(enemy.coords))
}"#;
    let lines = serve_script(source, HarnessConfig::default(), 1);
    let again = serve_script(source, HarnessConfig::default(), 1);
    assert_eq!(lines, again);
}

#[test]
fn test_missing_robot_every_turn() {
    let outcomes = reports("fn helper(x) { x }", 2);
    for outcome in outcomes {
        let Err(ProgramError::InitError(record)) = outcome else {
            panic!("expected init error");
        };
        assert_eq!(record.summary, "TypeError: You must define a 'robot' function");
    }
}

#[test]
fn test_wrong_arity() {
    let Err(ProgramError::InitError(record)) = reports("fn robot(unit) { }", 1).remove(0) else {
        panic!("expected init error");
    };
    assert_eq!(record.summary, "TypeError: Your robot function must accept 2 arguments");
}

#[test]
fn test_non_string_debug_key() {
    let source = r#"fn robot(state, unit) {
    if unit.id == "1" {
        debug_inspect(1, "x");
    } else {
        debug_inspect("ok", 7);
    }
}"#;
    let report = single_report(source);
    let err = report.robot_actions["1"].as_ref().unwrap_err();
    assert!(err.summary.starts_with("TypeError: "));
    assert_eq!(report.robot_actions["2"], Ok(None));
    assert!(!report.debug_inspect_tables.contains_key("1"));
    assert_eq!(report.debug_inspect_tables["2"]["ok"], "7");
}

#[test]
fn test_init_turn_failure() {
    let source = r#"fn init_turn(state) {
    throw "no setup";
}
fn robot(state, unit) { Action::move(Direction::West) }"#;
    let Err(ProgramError::InitError(record)) = reports(source, 1).remove(0) else {
        panic!("expected init error");
    };
    assert_eq!(record.summary, "Exception: no setup");
    assert_eq!(record.loc.map(|l| l.start.0), Some(2));
}

#[test]
fn test_memory_across_turns() {
    let source = r#"fn init_turn(state) {
    this.turns = (this.turns ?? 0) + 1;
}
fn robot(state, unit) {
    print(`unit ${unit.id} sees turn ${this.turns}`);
}"#;
    let outcomes = reports(source, 3);
    let last = outcomes.last().unwrap().as_ref().unwrap();
    assert_eq!(last.logs, vec!["unit 1 sees turn 3\n", "unit 2 sees turn 3\n"]);
}

#[test]
fn test_invalid_return_value() {
    let report = single_report("fn robot(state, unit) { \"north\" }");
    for result in report.robot_actions.values() {
        let err = result.as_ref().unwrap_err();
        assert!(err.summary.starts_with("TypeError: Robot must return an Action or nothing"));
        assert_eq!(err.loc, None);
    }
}

#[test]
fn test_state_queries() {
    let source = r#"fn robot(state, unit) {
    let wall = state.obj_by_coords(Coords(4, 0));
    if wall.obj_type != ObjType::Terrain || wall.team != () {
        throw "wall is not terrain";
    }
    if state.id_by_coords(Coords(-1, 0)) != () || state.obj_by_id("nope") != () {
        throw "out of range lookup";
    }
    let ids = state.ids_by_team(Team::Blue);
    debug_inspect("enemies", ids.len());
    debug_inspect("turn", state.turn);
    Action::attack(unit.coords.direction_to(state.obj_by_id(ids[0]).coords))
}"#;
    let report = single_report(source);
    assert_eq!(report.robot_actions["1"], Ok(Some(Action::attack(Direction::South))));
    assert_eq!(report.debug_inspect_tables["1"]["enemies"], "1");
    assert_eq!(report.debug_inspect_tables["2"]["turn"], "1");
}

#[test]
fn test_state_queries_check_argument_types() {
    let source = r#"fn robot(state, unit) {
    if unit.id == "1" { return state.ids_by_team("Green"); }
    if unit.id == "2" { return state.obj_by_coords([4, 0]); }
}"#;
    let report = single_report(source);
    let err = report.robot_actions["1"].as_ref().unwrap_err();
    assert_eq!(
        err.summary,
        "TypeError: State.ids_by_team argument must be an instance of Team"
    );
    assert_eq!(err.loc.as_ref().map(|l| l.start.0), Some(2));
    let err = report.robot_actions["2"].as_ref().unwrap_err();
    assert!(err.summary.starts_with("TypeError: State.obj_by_coords argument"));
    assert_eq!(err.loc.as_ref().map(|l| l.start.0), Some(3));

    let report = single_report(
        r#"fn robot(state, unit) {
    if unit.id == "1" { state.objs_by_team(0); }
    Action::move(Direction::North)
}"#,
    );
    assert!(report.robot_actions["1"].as_ref().unwrap_err().summary.starts_with("TypeError: "));
    assert_eq!(report.robot_actions["2"], Ok(Some(Action::movement(Direction::North))));
}

#[test]
fn test_top_level_constants_visible_to_robot() {
    let source = r#"const HEADING = Direction::West;
fn robot(state, unit) { Action::attack(global::HEADING) }"#;
    let report = single_report(source);
    assert!(report.robot_actions.values().all(|r| *r == Ok(Some(Action::attack(Direction::West)))));
}

#[test]
fn test_legacy_wire_format() {
    let config = HarnessConfig {
        wire: WireFormat::Legacy,
        ..HarnessConfig::default()
    };
    let source = r#"fn robot(state, unit) {
    if unit.id == "1" { Action::move(Direction::South) }
}"#;
    let lines = serve_script(source, config, 1);
    let value: serde_json::Value =
        serde_json::from_str(lines[0].strip_prefix(protocol::OUTPUT_PREFIX).unwrap()).unwrap();
    assert_eq!(
        value,
        json!({"Ok": {
            "robot_actions": {"1": {"Ok": {"type": "Move", "direction": "South"}}},
            "logs": [],
            "debug_tables": {"1": {}, "2": {}},
            "debug_inspections": []
        }})
    );
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fn robot(state, unit) {{ Action::attack(Direction::East) }}").unwrap();
    let config = HarnessConfig::default();
    let program = RhaiProgram::from_path(file.path(), &config, OutputStream::default()).unwrap();
    let mut runner = TurnRunner::new(program, config);
    let state = gridbot::State::from_json(&state_line(1)).unwrap();
    let report = runner.run_turn(state).unwrap();
    assert_eq!(report.robot_actions["2"], Ok(Some(Action::attack(Direction::East))));
}

#[test]
fn test_syntax_error_in_handshake() {
    let err = RhaiProgram::load(
        "fn robot(state, unit) {\n  let x = ;\n}",
        &HarnessConfig::default(),
        OutputStream::default(),
    )
    .unwrap_err();
    let mut out = Vec::new();
    protocol::write_handshake(&mut out, &Err(ProgramError::InitError(err.to_record()))).unwrap();
    let line = String::from_utf8(out).unwrap();
    let Message::Init(Err(ProgramError::InitError(record))) = protocol::parse_line(line.trim_end()).unwrap() else {
        panic!("expected failed handshake");
    };
    assert!(record.summary.starts_with("SyntaxError: "));
    assert_eq!(record.loc.map(|l| l.start.0), Some(2));
}
