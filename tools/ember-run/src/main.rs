use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ember_run::cli::{Cli, Command};
use ember_run::error::RunError;
use ember_run::output::{self, OutputFormat, Report};
use ember_run::runner::{self, DebugOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let format = cli.output;
    let result = dispatch(cli, format);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::emit_error(format, &e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr so stdout stays reserved for reports and the debug
/// protocol.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn dispatch(cli: Cli, format: OutputFormat) -> Result<(), RunError> {
    let config = runner::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Run(args) => show(format, &runner::run_file(&args.file, config)?),
        Command::Eval(args) => show(format, &runner::eval_source(&args.source, config)?),
        Command::Tokens(args) => show(format, &runner::tokens(&args.file)?),
        Command::Ast(args) => show(format, &runner::ast(&args.file)?),
        Command::Debug(args) => {
            let options = DebugOptions {
                breakpoints: args.breakpoints,
                stop_on_entry: args.stop_on_entry,
            };
            runner::debug(&args.file, config, &options)
        }
    }
}

fn show<T: Report>(format: OutputFormat, report: &T) -> Result<(), RunError> {
    output::emit(format, report)?;
    Ok(())
}
