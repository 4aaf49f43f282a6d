//! The capability a loaded robot program hands to the harness.
//!
//! The harness never inspects user code directly. A script environment
//! (see [`crate::engine`] and [`crate::native`]) loads the program and then
//! exposes it through the [`Program`] trait: the names it binds, the two
//! entry points, and the print stream it writes to.

use std::fmt;
use std::rc::Rc;

use crate::capture::OutputStream;
use crate::debug::DebugChannel;
use crate::model::{Action, GameObject, State};

/// Virtual file name user code is compiled under.
///
/// Frames carrying this source belong to the user's script; anything else is
/// harness or library code.
pub const USER_SOURCE: &str = "<robot>";

/// A named top-level binding of a loaded program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A function taking `arity` arguments.
    Function {
        /// Function name.
        name: String,
        /// Number of parameters.
        arity: usize,
    },
    /// Any other value.
    Value {
        /// Variable name.
        name: String,
        /// Type of the bound value.
        type_name: String,
    },
}

impl Binding {
    /// The bound name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Function { name, .. } | Self::Value { name, .. } => name,
        }
    }
}

/// What `robot` handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returned {
    /// A valid action.
    Action(Action),
    /// The explicit "do nothing" value.
    Nothing,
    /// Anything else; carries the type name for the error message.
    Other(String),
}

/// Broad category of a failure, rendered as the summary prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The source did not parse.
    Syntax,
    /// A value had the wrong type.
    Type,
    /// An unknown variable, property or function.
    Name,
    /// An index or key out of range.
    Index,
    /// Integer overflow, division by zero and friends.
    Arithmetic,
    /// Call depth exceeded.
    Recursion,
    /// A value thrown by user code.
    Exception,
    /// Any other runtime failure.
    Runtime,
    /// A fault in the harness itself.
    Internal,
}

impl FailureKind {
    /// Label used in summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Syntax => "SyntaxError",
            Self::Type => "TypeError",
            Self::Name => "NameError",
            Self::Index => "IndexError",
            Self::Arithmetic => "ArithmeticError",
            Self::Recursion => "RecursionError",
            Self::Exception => "Exception",
            Self::Runtime => "RuntimeError",
            Self::Internal => "InternalError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One activation in a failure's call chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Function being executed, when known.
    pub function: Option<String>,
    /// Virtual file name of the code the frame runs.
    pub source: Option<String>,
    /// Line currently executing.
    pub line: Option<usize>,
    /// Column currently executing.
    pub column: Option<usize>,
}

impl Frame {
    /// Whether this frame runs user code.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.source.as_deref() == Some(USER_SOURCE)
    }
}

/// A failure raised while running user logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    /// Category.
    pub kind: FailureKind,
    /// Message without position information.
    pub message: String,
    /// Call chain, outermost first.
    pub frames: Vec<Frame>,
}

impl ScriptFailure {
    /// A failure with no call chain.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Append a frame (innermost last).
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ScriptFailure {}

/// A loaded robot program.
///
/// Calls are strictly sequential; implementations may keep state across
/// calls and turns (the script's own memory), which the harness never resets.
pub trait Program {
    /// Every named top-level binding the program exposes.
    fn bindings(&self) -> Vec<Binding>;

    /// Run `init_turn(state)`.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by user code.
    fn call_init_turn(&mut self, state: &Rc<State>) -> Result<(), ScriptFailure>;

    /// Run `robot(state, unit)` with `debug` available to the user code.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by user code.
    fn call_robot(
        &mut self,
        state: &Rc<State>,
        unit: &GameObject,
        debug: &mut DebugChannel,
    ) -> Result<Returned, ScriptFailure>;

    /// The stream user output is written to.
    fn output(&self) -> &OutputStream;
}
