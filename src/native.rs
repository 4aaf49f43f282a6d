//! Robots written directly in Rust.

use std::fmt;
use std::rc::Rc;

use crate::capture::OutputStream;
use crate::debug::DebugChannel;
use crate::entry::{INIT_TURN, ROBOT};
use crate::model::{GameObject, State};
use crate::script::{Binding, Program, Returned, ScriptFailure};

type RobotFn = Box<dyn FnMut(&State, &GameObject, &mut DebugChannel) -> Result<Returned, ScriptFailure>>;
type InitTurnFn = Box<dyn FnMut(&State) -> Result<(), ScriptFailure>>;

/// A program made of Rust closures.
///
/// Closures that want to print should clone [`Program::output`] before the
/// program is handed to a runner.
pub struct NativeProgram {
    robot: Option<RobotFn>,
    init_turn: Option<InitTurnFn>,
    output: OutputStream,
}

impl fmt::Debug for NativeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeProgram")
            .field("robot", &self.robot.is_some())
            .field("init_turn", &self.init_turn.is_some())
            .finish_non_exhaustive()
    }
}

impl NativeProgram {
    /// A program whose `robot` is `robot`.
    #[must_use]
    pub fn new<F>(robot: F) -> Self
    where
        F: FnMut(&State, &GameObject, &mut DebugChannel) -> Result<Returned, ScriptFailure> + 'static,
    {
        Self {
            robot: Some(Box::new(robot)),
            init_turn: None,
            output: OutputStream::default(),
        }
    }

    /// A program that defines no `robot` at all.
    #[must_use]
    pub fn without_robot() -> Self {
        Self {
            robot: None,
            init_turn: None,
            output: OutputStream::default(),
        }
    }

    /// Replace `robot`.
    #[must_use]
    pub fn with_robot<F>(mut self, robot: F) -> Self
    where
        F: FnMut(&State, &GameObject, &mut DebugChannel) -> Result<Returned, ScriptFailure> + 'static,
    {
        self.robot = Some(Box::new(robot));
        self
    }

    /// Define `init_turn`.
    #[must_use]
    pub fn with_init_turn<F>(mut self, init_turn: F) -> Self
    where
        F: FnMut(&State) -> Result<(), ScriptFailure> + 'static,
    {
        self.init_turn = Some(Box::new(init_turn));
        self
    }

    /// Use `output` as the print stream.
    #[must_use]
    pub fn with_output(mut self, output: OutputStream) -> Self {
        self.output = output;
        self
    }
}

impl Program for NativeProgram {
    fn bindings(&self) -> Vec<Binding> {
        let robot = self.robot.as_ref().map(|_| Binding::Function {
            name: ROBOT.to_string(),
            arity: 2,
        });
        let init_turn = self.init_turn.as_ref().map(|_| Binding::Function {
            name: INIT_TURN.to_string(),
            arity: 1,
        });
        robot.into_iter().chain(init_turn).collect()
    }

    fn call_init_turn(&mut self, state: &Rc<State>) -> Result<(), ScriptFailure> {
        match &mut self.init_turn {
            Some(init_turn) => init_turn(&**state),
            None => Ok(()),
        }
    }

    fn call_robot(
        &mut self,
        state: &Rc<State>,
        unit: &GameObject,
        debug: &mut DebugChannel,
    ) -> Result<Returned, ScriptFailure> {
        match &mut self.robot {
            Some(robot) => robot(&**state, unit, debug),
            None => Ok(Returned::Nothing),
        }
    }

    fn output(&self) -> &OutputStream {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry;

    #[test]
    fn test_bindings_follow_closures() {
        let program = NativeProgram::new(|_, _, _| Ok(Returned::Nothing));
        let points = entry::validate(&program.bindings()).unwrap();
        assert!(points.init_turn.is_none());

        let program = program.with_init_turn(|_| Ok(()));
        let points = entry::validate(&program.bindings()).unwrap();
        assert!(points.init_turn.is_some());

        assert!(NativeProgram::without_robot().bindings().is_empty());
    }

    #[test]
    fn test_closure_keeps_state_between_calls() {
        let mut calls = 0;
        let mut program = NativeProgram::new(move |_, _, debug| {
            calls += 1;
            debug.annotate("calls", calls.to_string());
            Ok(Returned::Nothing)
        });
        let state = Rc::new(State::from_objects(0, crate::model::Team::Red, 4, Vec::new()));
        let unit = GameObject::terrain("t", crate::model::Coords::new(0, 0));
        let mut channel = DebugChannel::new(unit.id().clone());
        program.call_robot(&state, &unit, &mut channel).unwrap();
        program.call_robot(&state, &unit, &mut channel).unwrap();
        assert_eq!(channel.table()["calls"], "2");
    }
}
