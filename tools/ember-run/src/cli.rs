use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Run, inspect and debug Ember scripts from the command line.
#[derive(Parser, Debug)]
#[command(name = "ember-run", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format for all subcommands.
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Engine configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a script file.
    Run(FileArg),

    /// Evaluate a script given on the command line.
    Eval(EvalArgs),

    /// Print the tokens of a script file.
    Tokens(FileArg),

    /// Print the syntax tree of a script file.
    Ast(FileArg),

    /// Run a script under the debugger, speaking the debug protocol on
    /// stdin/stdout.
    Debug(DebugArgs),
}

/// Argument struct for subcommands that only need a script path.
#[derive(clap::Args, Debug)]
pub struct FileArg {
    /// Script file.
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct EvalArgs {
    /// Script source text.
    pub source: String,
}

#[derive(clap::Args, Debug)]
pub struct DebugArgs {
    /// Script file.
    pub file: PathBuf,

    /// Set a breakpoint on a line before the script starts (repeatable).
    #[arg(long = "break", value_name = "LINE")]
    pub breakpoints: Vec<usize>,

    /// Pause before the first statement.
    #[arg(long, default_value_t = false)]
    pub stop_on_entry: bool,
}

impl Cli {
    /// Log level filter for the `-v` count. `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
