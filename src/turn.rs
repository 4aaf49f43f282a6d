//! The per-turn execution loop.
//!
//! For every unit of the controlled team, in the order the orchestrator
//! listed them, the runner invokes `robot` and records the outcome. A failure
//! in one unit is recorded for that unit only; the loop always runs to the
//! end and always produces a complete report.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::classify;
use crate::config::HarnessConfig;
use crate::debug::{DebugChannel, DebugTable};
use crate::entry::{self, EntryPoints};
use crate::error::{ErrorRecord, ProgramError};
use crate::model::{Action, ObjId, State};
use crate::script::{FailureKind, Program, Returned, ScriptFailure};

/// Outcome for one unit: an action, nothing, or a classified error.
pub type UnitResult = Result<Option<Action>, ErrorRecord>;

/// Outcome of a whole turn.
pub type TurnOutcome = Result<TurnReport, ProgramError>;

/// Everything one turn produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Result per controlled unit.
    pub robot_actions: BTreeMap<ObjId, UnitResult>,
    /// Captured user output, one entry per line.
    pub logs: Vec<String>,
    /// Non-empty debug tables per unit.
    #[serde(alias = "debug_tables")]
    pub debug_inspect_tables: BTreeMap<ObjId, DebugTable>,
    /// Units flagged for inspection, in flagging order.
    #[serde(alias = "debug_inspections")]
    pub debug_locate_queries: Vec<ObjId>,
}

/// Runs turns against one loaded program.
///
/// Entry points are validated once, when the runner is created; an invalid
/// program makes every turn fail with the same `InitError`.
#[derive(Debug)]
pub struct TurnRunner<P> {
    program: P,
    entry_points: Result<EntryPoints, ErrorRecord>,
    config: HarnessConfig,
}

impl<P: Program> TurnRunner<P> {
    /// Validate `program`'s entry points and wrap it.
    #[must_use]
    pub fn new(program: P, config: HarnessConfig) -> Self {
        let entry_points = entry::validate(&program.bindings()).map_err(|e| {
            warn!(error = %e, "entry point validation failed");
            e.to_record()
        });
        Self {
            program,
            entry_points,
            config,
        }
    }

    /// The validated entry points, or the error every turn will report.
    ///
    /// # Errors
    ///
    /// Returns the validation record if the program is unusable.
    pub fn entry_points(&self) -> Result<&EntryPoints, &ErrorRecord> {
        self.entry_points.as_ref()
    }

    /// The wrapped program.
    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }

    /// The configuration the runner was created with.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one turn.
    pub fn run_turn(&mut self, state: State) -> TurnOutcome {
        let state = Rc::new(state);
        let capture = self.program.output().capture();
        let outcome = self.execute(&state);
        let logs = capture.finish();

        if self.config.echo_logs {
            for line in &logs {
                debug!(target: "gridbot::user", "{}", line.trim_end_matches('\n'));
            }
        }

        outcome.map(|mut report| {
            report.logs = logs;
            report
        })
    }

    fn execute(&mut self, state: &Rc<State>) -> TurnOutcome {
        let entry = match &self.entry_points {
            Ok(entry) => entry,
            Err(record) => return Err(ProgramError::InitError(record.clone())),
        };

        if entry.init_turn.is_some() {
            let program = &mut self.program;
            let result = guarded(|| program.call_init_turn(state));
            if let Err(failure) = result {
                let record = classify(&failure);
                debug!(turn = state.turn(), error = %record, "init_turn failed");
                return Err(ProgramError::InitError(record));
            }
        }

        let units = state.units_of(state.our_team());
        debug!(turn = state.turn(), team = state.our_team().name(), units = units.len(), "running turn");

        let mut report = TurnReport::default();
        for id in units {
            let mut channel = DebugChannel::new(id.clone());
            let result = self.run_unit(state, id, &mut channel);
            if let Err(record) = &result {
                debug!(unit = %id, error = %record, "unit failed");
            }
            report.robot_actions.insert(id.clone(), result);

            let (table, located) = channel.into_parts();
            if !table.is_empty() {
                report.debug_inspect_tables.insert(id.clone(), table);
            }
            report.debug_locate_queries.extend(located);
        }
        Ok(report)
    }

    fn run_unit(&mut self, state: &Rc<State>, id: &ObjId, channel: &mut DebugChannel) -> UnitResult {
        let Some(unit) = state.object_by_id(id.as_str()) else {
            return Err(classify(&ScriptFailure::new(
                FailureKind::Internal,
                format!("unit {id} is not in the state"),
            )));
        };

        let program = &mut self.program;
        match guarded(|| program.call_robot(state, unit, channel)) {
            Ok(Returned::Action(action)) => Ok(Some(action)),
            Ok(Returned::Nothing) => Ok(None),
            Ok(Returned::Other(type_name)) => Err(classify(&ScriptFailure::new(
                FailureKind::Type,
                format!("Robot must return an Action or nothing, not {type_name}"),
            ))),
            Err(failure) => Err(classify(&failure)),
        }
    }
}

/// Run `f`, turning a panic into an internal failure.
fn guarded<T>(f: impl FnOnce() -> Result<T, ScriptFailure>) -> Result<T, ScriptFailure> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ScriptFailure::new(
            FailureKind::Internal,
            panic_message(payload.as_ref()),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "harness panicked".to_string()
    }
}
