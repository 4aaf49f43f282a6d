//! Robot programs written in Rhai.
//!
//! [`RhaiProgram`] compiles a script, runs its top level once, and then
//! serves the harness through the [`Program`] trait. Each call into the
//! script binds `this` to an object map that survives across units and turns,
//! which is where robots keep their memory.

mod host;

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::{AST, CallFnOptions, Dynamic, Engine, EvalAltResult, Map, Position, Scope};
use tracing::debug;

use crate::capture::OutputStream;
use crate::classify::classify;
use crate::config::HarnessConfig;
use crate::debug::DebugChannel;
use crate::entry::{INIT_TURN, ROBOT};
use crate::error::ErrorRecord;
use crate::model::{Action, GameObject, State};
use crate::script::{Binding, FailureKind, Frame, Program, Returned, ScriptFailure, USER_SOURCE};

pub use host::StateHandle;
use host::{DebugSlot, HostError};

/// Why a script could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The script file could not be read.
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The source did not parse.
    Syntax {
        /// Parser message.
        message: String,
        /// Line of the offending token.
        line: Option<usize>,
        /// Column of the offending token.
        column: Option<usize>,
    },
    /// Running the script's top level raised.
    TopLevel(ScriptFailure),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::Syntax { message, line, .. } => match line {
                Some(line) => write!(f, "syntax error on line {line}: {message}"),
                None => write!(f, "syntax error: {message}"),
            },
            Self::TopLevel(failure) => write!(f, "script failed while loading: {failure}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::TopLevel(failure) => Some(failure),
            Self::Syntax { .. } => None,
        }
    }
}

impl LoadError {
    /// Render as the record sent in the failed handshake.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        match self {
            Self::Io { .. } => ErrorRecord::summary_only(format!("InternalError: {self}")),
            Self::Syntax {
                message,
                line,
                column,
            } => classify(
                &ScriptFailure::new(FailureKind::Syntax, message.clone()).with_frame(Frame {
                    function: None,
                    source: Some(USER_SOURCE.to_string()),
                    line: *line,
                    column: *column,
                }),
            ),
            Self::TopLevel(failure) => classify(failure),
        }
    }
}

/// A compiled Rhai robot.
pub struct RhaiProgram {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    memory: Dynamic,
    debug: DebugSlot,
    output: OutputStream,
}

impl fmt::Debug for RhaiProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiProgram")
            .field("functions", &self.ast.iter_functions().count())
            .field("globals", &self.scope.len())
            .finish_non_exhaustive()
    }
}

impl RhaiProgram {
    /// Compile `source` and run its top level.
    ///
    /// Anything the top level prints goes to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not parse or its top level raises.
    pub fn load(source: &str, config: &HarnessConfig, output: OutputStream) -> Result<Self, LoadError> {
        let debug: DebugSlot = Rc::new(RefCell::new(None));
        let mut engine = Engine::new();
        engine.set_max_call_levels(config.max_call_levels);

        let print_sink = output.clone();
        engine.on_print(move |text| print_sink.write_line(text));
        let debug_sink = output.clone();
        engine.on_debug(move |text, _source, _pos| debug_sink.write_line(text));

        host::register(&mut engine, &debug);

        let mut ast = engine.compile(source).map_err(|err| LoadError::Syntax {
            message: err.0.to_string(),
            line: err.1.line(),
            column: err.1.position(),
        })?;
        ast.set_source(USER_SOURCE);

        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| LoadError::TopLevel(failure_from(&err, None)))?;
        let ast = with_constants(&engine, &scope, &ast)?;

        debug!(
            functions = ast.iter_functions().count(),
            globals = scope.len(),
            "script loaded"
        );

        Ok(Self {
            engine,
            ast,
            scope,
            memory: Dynamic::from_map(Map::new()),
            debug,
            output,
        })
    }

    /// Read and load the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to load.
    pub fn from_path(path: &Path, config: &HarnessConfig, output: OutputStream) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&source, config, output)
    }

    /// The cross-turn memory bound to `this`.
    #[must_use]
    pub fn memory(&self) -> &Dynamic {
        &self.memory
    }

    fn call(&mut self, name: &str, args: impl rhai::FuncArgs) -> Result<Dynamic, ScriptFailure> {
        let options = CallFnOptions::new()
            .eval_ast(true)
            .rewind_scope(true)
            .bind_this_ptr(&mut self.memory);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, name, args)
            .map_err(|err| failure_from(&err, Some(name)))
    }
}

impl Program for RhaiProgram {
    fn bindings(&self) -> Vec<Binding> {
        let functions = self.ast.iter_functions().map(|f| Binding::Function {
            name: f.name.to_string(),
            arity: f.params.len(),
        });
        let values = self.scope.iter().map(|(name, _, value)| Binding::Value {
            name: name.to_string(),
            type_name: self.engine.map_type_name(value.type_name()).to_string(),
        });
        functions.chain(values).collect()
    }

    fn call_init_turn(&mut self, state: &Rc<State>) -> Result<(), ScriptFailure> {
        self.call(INIT_TURN, (StateHandle::new(Rc::clone(state)),))
            .map(|_| ())
    }

    fn call_robot(
        &mut self,
        state: &Rc<State>,
        unit: &GameObject,
        channel: &mut DebugChannel,
    ) -> Result<Returned, ScriptFailure> {
        let value = {
            let _lent = LentChannel::lend(Rc::clone(&self.debug), channel);
            self.call(ROBOT, (StateHandle::new(Rc::clone(state)), unit.clone()))?
        };
        if value.is_unit() {
            Ok(Returned::Nothing)
        } else if let Some(action) = value.clone().try_cast::<Action>() {
            Ok(Returned::Action(action))
        } else {
            Ok(Returned::Other(self.engine.map_type_name(value.type_name()).to_string()))
        }
    }

    fn output(&self) -> &OutputStream {
        &self.output
    }
}

/// Lends a unit's channel to the host functions for one call.
///
/// The channel goes back to its owner on drop, also when the call unwinds.
struct LentChannel<'a> {
    slot: DebugSlot,
    owner: &'a mut DebugChannel,
}

impl<'a> LentChannel<'a> {
    fn lend(slot: DebugSlot, owner: &'a mut DebugChannel) -> Self {
        let placeholder = DebugChannel::new(owner.unit().clone());
        *slot.borrow_mut() = Some(mem::replace(owner, placeholder));
        Self { slot, owner }
    }
}

impl Drop for LentChannel<'_> {
    fn drop(&mut self) {
        if let Some(lent) = self.slot.borrow_mut().take() {
            *self.owner = lent;
        }
    }
}

/// Functions of `ast` preceded by a redeclaration of every top-level
/// constant, so `global::NAME` resolves inside entry points.
///
/// The declarations read their values from the loaded scope and run before
/// each call; the rest of the top level never runs again.
fn with_constants(engine: &Engine, scope: &Scope<'static>, ast: &AST) -> Result<AST, LoadError> {
    let prelude: String = scope
        .iter()
        .filter(|(_, constant, _)| *constant)
        .map(|(name, _, _)| format!("const {name} = {name};\n"))
        .collect();
    let prelude = engine.compile(&prelude).map_err(|err| LoadError::Syntax {
        message: err.0.to_string(),
        line: None,
        column: None,
    })?;
    let mut merged = prelude.merge(&ast.clone_functions_only());
    merged.set_source(USER_SOURCE);
    Ok(merged)
}

/// Unwind a Rhai error into a failure with its call chain.
fn failure_from(err: &EvalAltResult, entry: Option<&str>) -> ScriptFailure {
    let mut frames = Vec::new();
    let mut current = Frame {
        function: entry.map(str::to_string),
        source: Some(USER_SOURCE.to_string()),
        line: None,
        column: None,
    };
    let mut err = err;

    loop {
        match err {
            EvalAltResult::ErrorInFunctionCall(name, source, inner, pos) => {
                // the wrapper rhai adds around the entry call itself
                let is_entry = frames.is_empty()
                    && pos.is_none()
                    && current.line.is_none()
                    && current.function.as_deref() == Some(name.as_str());
                if !is_entry {
                    let source = if source.is_empty() {
                        current.source.clone()
                    } else {
                        Some(source.to_string())
                    };
                    place(&mut current, *pos);
                    frames.push(mem::replace(
                        &mut current,
                        Frame {
                            function: Some(name.clone()),
                            source,
                            line: None,
                            column: None,
                        },
                    ));
                }
                err = inner.as_ref();
            }
            EvalAltResult::ErrorInModule(name, inner, pos) => {
                place(&mut current, *pos);
                frames.push(mem::replace(
                    &mut current,
                    Frame {
                        function: None,
                        source: Some(name.clone()),
                        line: None,
                        column: None,
                    },
                ));
                err = inner.as_ref();
            }
            leaf => {
                place(&mut current, leaf.position());
                frames.push(current);
                return leaf_failure(leaf, frames);
            }
        }
    }
}

fn leaf_failure(leaf: &EvalAltResult, mut frames: Vec<Frame>) -> ScriptFailure {
    if let EvalAltResult::ErrorRuntime(value, _) = leaf {
        if let Some(host) = value.clone().try_cast::<HostError>() {
            frames.push(Frame {
                function: Some(host.function.to_string()),
                source: None,
                line: None,
                column: None,
            });
            return ScriptFailure {
                kind: host.kind,
                message: host.message,
                frames,
            };
        }
        return ScriptFailure {
            kind: FailureKind::Exception,
            message: value.to_string(),
            frames,
        };
    }

    let text = leaf.to_string();
    let pos = leaf.position();
    let message = if pos.is_none() {
        text
    } else {
        let suffix = format!(" ({pos})");
        text.strip_suffix(&suffix).map_or_else(|| text.clone(), str::to_string)
    };
    ScriptFailure {
        kind: kind_of(leaf),
        message,
        frames,
    }
}

fn kind_of(err: &EvalAltResult) -> FailureKind {
    match err {
        EvalAltResult::ErrorMismatchDataType(..)
        | EvalAltResult::ErrorMismatchOutputType(..)
        | EvalAltResult::ErrorIndexingType(..) => FailureKind::Type,
        EvalAltResult::ErrorFunctionNotFound(..)
        | EvalAltResult::ErrorVariableNotFound(..)
        | EvalAltResult::ErrorPropertyNotFound(..) => FailureKind::Name,
        EvalAltResult::ErrorArrayBounds(..)
        | EvalAltResult::ErrorStringBounds(..)
        | EvalAltResult::ErrorIndexNotFound(..) => FailureKind::Index,
        EvalAltResult::ErrorArithmetic(..) => FailureKind::Arithmetic,
        EvalAltResult::ErrorStackOverflow(..) => FailureKind::Recursion,
        EvalAltResult::ErrorRuntime(..) => FailureKind::Exception,
        _ => FailureKind::Runtime,
    }
}

fn place(frame: &mut Frame, pos: Position) {
    if !pos.is_none() {
        frame.line = pos.line();
        frame.column = pos.position();
    }
}
