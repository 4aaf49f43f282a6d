//! Entry-point validation.
//!
//! Run once per loaded program, before any turn executes.

use std::fmt;

use crate::error::ErrorRecord;
use crate::script::Binding;

/// Name of the mandatory per-unit entry point.
pub const ROBOT: &str = "robot";
/// Name of the optional per-turn entry point.
pub const INIT_TURN: &str = "init_turn";

const ROBOT_ARITY: usize = 2;
const INIT_TURN_ARITY: usize = 1;

/// A resolved entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callable {
    /// Function name.
    pub name: &'static str,
    /// Number of parameters.
    pub arity: usize,
}

/// The entry points a valid program exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoints {
    /// `robot(state, unit)`.
    pub robot: Callable,
    /// `init_turn(state)`, when defined.
    pub init_turn: Option<Callable>,
}

/// Why a program's entry points are unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A mandatory function is not defined at all.
    Missing(&'static str),
    /// The name is bound, but not to a function.
    NotCallable {
        /// Entry point name.
        name: &'static str,
        /// Type of the value bound instead.
        type_name: String,
    },
    /// The function takes the wrong number of parameters.
    Arity {
        /// Entry point name.
        name: &'static str,
        /// Required arity.
        expected: usize,
        /// Arities that are defined.
        found: Vec<usize>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "You must define a '{name}' function"),
            Self::NotCallable { name, type_name } => {
                write!(f, "'{name}' must be a function, but it is bound to a {type_name}")
            }
            Self::Arity { name, expected, .. } => {
                write!(f, "Your {name} function must accept {expected} arguments")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Render as a wire record.
    #[must_use]
    pub fn to_record(&self) -> ErrorRecord {
        let details = match self {
            Self::Arity { found, .. } => {
                let found: Vec<String> = found.iter().map(ToString::to_string).collect();
                format!("defined with {} parameter(s)", found.join(", "))
            }
            _ => String::new(),
        };
        ErrorRecord {
            summary: format!("TypeError: {self}"),
            details,
            loc: None,
        }
    }
}

/// Look up `robot` and `init_turn` among `bindings` and check their arity.
///
/// Functions may be overloaded by arity; an entry point is valid when one of
/// its overloads has the required arity.
///
/// # Errors
///
/// Returns an error if `robot` is missing, or if either entry point is bound
/// to a non-function or has no overload with the required arity.
pub fn validate(bindings: &[Binding]) -> Result<EntryPoints, ValidationError> {
    let robot = resolve(bindings, ROBOT, ROBOT_ARITY)?.ok_or(ValidationError::Missing(ROBOT))?;
    let init_turn = resolve(bindings, INIT_TURN, INIT_TURN_ARITY)?;
    Ok(EntryPoints { robot, init_turn })
}

fn resolve(
    bindings: &[Binding],
    name: &'static str,
    arity: usize,
) -> Result<Option<Callable>, ValidationError> {
    let mut found = Vec::new();
    let mut value_type = None;
    for binding in bindings.iter().filter(|b| b.name() == name) {
        match binding {
            Binding::Function { arity: a, .. } => found.push(*a),
            Binding::Value { type_name, .. } => value_type = Some(type_name.clone()),
        }
    }

    if found.contains(&arity) {
        return Ok(Some(Callable { name, arity }));
    }
    if !found.is_empty() {
        found.sort_unstable();
        return Err(ValidationError::Arity {
            name,
            expected: arity,
            found,
        });
    }
    match value_type {
        Some(type_name) => Err(ValidationError::NotCallable { name, type_name }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, arity: usize) -> Binding {
        Binding::Function {
            name: name.to_string(),
            arity,
        }
    }

    #[test]
    fn test_robot_only() {
        let entry = validate(&[function("robot", 2)]).unwrap();
        assert_eq!(entry.robot.name, "robot");
        assert!(entry.init_turn.is_none());
    }

    #[test]
    fn test_robot_and_init_turn() {
        let entry = validate(&[function("helper", 3), function("init_turn", 1), function("robot", 2)])
            .unwrap();
        assert_eq!(entry.init_turn.map(|c| c.arity), Some(1));
    }

    #[test]
    fn test_missing_robot() {
        let err = validate(&[function("init_turn", 1)]).unwrap_err();
        assert_eq!(err, ValidationError::Missing("robot"));
        assert_eq!(
            err.to_record().summary,
            "TypeError: You must define a 'robot' function"
        );
    }

    #[test]
    fn test_robot_wrong_arity() {
        let err = validate(&[function("robot", 1)]).unwrap_err();
        assert!(matches!(err, ValidationError::Arity { expected: 2, .. }));
        assert_eq!(
            err.to_record().summary,
            "TypeError: Your robot function must accept 2 arguments"
        );
    }

    #[test]
    fn test_init_turn_wrong_arity() {
        let err = validate(&[function("robot", 2), function("init_turn", 2)]).unwrap_err();
        assert!(matches!(err, ValidationError::Arity { name: "init_turn", .. }));
    }

    #[test]
    fn test_overload_with_matching_arity() {
        let entry = validate(&[function("robot", 1), function("robot", 2)]).unwrap();
        assert_eq!(entry.robot.arity, 2);
    }

    #[test]
    fn test_robot_bound_to_value() {
        let err = validate(&[Binding::Value {
            name: "robot".to_string(),
            type_name: "i64".to_string(),
        }])
        .unwrap_err();
        assert!(matches!(err, ValidationError::NotCallable { name: "robot", .. }));
    }
}
