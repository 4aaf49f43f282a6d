//! Script validation command implementation.

use super::CliError;
use gridbot::capture::OutputStream;
use gridbot::script::Binding;
use gridbot::{entry, HarnessConfig, Program, RhaiProgram};
use std::path::Path;

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if the script cannot be loaded or lacks valid entry
/// points.
pub(crate) fn execute(script: &Path, config: &HarnessConfig) -> Result<(), CliError> {
    println!("Validating: {}", script.display());
    println!();

    let program = match RhaiProgram::from_path(script, config, OutputStream::default()) {
        Ok(program) => {
            print_check("Script loads", true);
            program
        }
        Err(e) => {
            print_check("Script loads", false);
            println!("    {}", e.to_record());
            return Err(e.into());
        }
    };

    let bindings = program.bindings();
    let points = match entry::validate(&bindings) {
        Ok(points) => points,
        Err(e) => {
            print_check("Entry points", false);
            println!("    {e}");
            return Err(CliError::new(e.to_string()));
        }
    };
    print_check("robot(state, unit)", true);

    let functions = bindings
        .iter()
        .filter(|b| matches!(b, Binding::Function { .. }))
        .count();

    println!();
    println!("Summary:");
    println!("  Functions:    {functions}");
    println!("  Globals:      {}", bindings.len() - functions);
    println!("  robot:        defined (required)");
    if points.init_turn.is_some() {
        println!("  init_turn:    defined");
    } else {
        println!("  init_turn:    not defined (optional)");
    }

    println!();
    println!("Validation successful!");

    Ok(())
}

fn print_check(name: &str, ok: bool) {
    let status = if ok { "OK" } else { "FAILED" };
    let symbol = if ok { "✓" } else { "✗" };
    println!("  {symbol} {name}: {status}");
}
