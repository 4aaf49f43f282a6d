//! Gridbot CLI - serve a robot script over the line protocol.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use gridbot::config::DEFAULT_MAX_CALL_LEVELS;
use gridbot::HarnessConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Gridbot - run robot scripts for a grid battle orchestrator
#[derive(Parser, Debug)]
#[command(name = "gridbot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Robot script to serve on stdin/stdout
    script: Option<PathBuf>,

    #[command(flatten)]
    harness: HarnessArgs,

    /// Diagnostic log filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Settings shared by every command that loads a script.
#[derive(clap::Args, Debug, Clone)]
struct HarnessArgs {
    /// Report shape: current or legacy
    #[arg(long, default_value = "current", global = true)]
    wire: cli::Wire,

    /// Maximum nesting of script function calls
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_LEVELS, global = true)]
    max_call_levels: usize,

    /// Mirror captured user output to the diagnostic log
    #[arg(long, global = true)]
    echo_logs: bool,
}

impl From<HarnessArgs> for HarnessConfig {
    fn from(args: HarnessArgs) -> Self {
        Self {
            wire: args.wire.into(),
            max_call_levels: args.max_call_levels,
            echo_logs: args.echo_logs,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a script loads and defines valid entry points
    Validate {
        /// Robot script to validate
        #[arg(required = true)]
        script: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_tracing(args.log_level.as_deref());

    let config = HarnessConfig::from(args.harness);
    let result = match (args.command, args.script) {
        (Some(Commands::Validate { script }), _) => cli::validate::execute(&script, &config),
        (None, Some(script)) => cli::run::execute(&script, config),
        (None, None) => Err(cli::CliError::new(
            "no robot script given (see --help)",
        )),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
