//! Serve command implementation.

use super::CliError;
use gridbot::capture::{Fallback, OutputStream};
use gridbot::{protocol, HarnessConfig, ProgramError, RhaiProgram, TurnRunner};
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info};

/// Load `script` and answer turns from stdin until it closes.
///
/// Output printed outside a turn (while the script's top level runs) goes to
/// stderr, so stdout only ever carries protocol lines.
///
/// # Errors
///
/// Returns an error if the script fails to load (after reporting it in the
/// handshake), or on a protocol fault.
pub(crate) fn execute(script: &Path, config: HarnessConfig) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    info!(script = %script.display(), "loading robot");
    let fallback = OutputStream::new(Fallback::Writer(Box::new(io::stderr())));
    let program = match RhaiProgram::from_path(script, &config, fallback) {
        Ok(program) => program,
        Err(e) => {
            error!(error = %e, "robot failed to load");
            let failed = Err(ProgramError::InitError(e.to_record()));
            protocol::write_handshake(&mut out, &failed)?;
            return Err(e.into());
        }
    };
    protocol::write_handshake(&mut out, &Ok(()))?;

    let mut runner = TurnRunner::new(program, config);
    let stdin = io::stdin();
    let turns = protocol::serve(&mut runner, stdin.lock(), &mut out)?;
    out.flush()?;

    info!(turns, "done");
    Ok(())
}
