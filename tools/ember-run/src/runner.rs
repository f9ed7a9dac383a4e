//! Subcommand handlers.

use std::fs;
use std::io::{self, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use ember_devtools::{DebugSession, LineTransport, PauseReason, Transport};
use ember_js::lexer::Lexer;
use ember_js::token::TokenKind;
use ember_js::{coerce, parser, ConsoleMessage, EngineConfig, Interpreter, Source, Value};
use serde::Serialize;

use crate::error::RunError;
use crate::output::Report;

/// Filename reported for `eval` sources.
pub const EVAL_NAME: &str = "<eval>";

/// Load the engine configuration, or the defaults without a file.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, RunError> {
    match path {
        Some(path) => Ok(EngineConfig::from_path(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_script(path: &Path) -> Result<String, RunError> {
    fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => RunError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => RunError::Io(err),
    })
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

// ── run / eval ───────────────────────────────────────────────────────

/// Outcome of running a script to completion.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub script: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub console: Vec<ConsoleMessage>,
    /// Completion value, formatted the way the console formats values.
    pub result: String,
    pub result_type: String,
    /// Print the completion value in human output (`eval` does, `run`
    /// only when it is not `undefined`).
    #[serde(skip)]
    pub echo_result: bool,
}

impl Report for RunReport {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        for message in &self.console {
            writeln!(out, "{}", message.text)?;
        }
        if self.echo_result || self.result_type != "undefined" {
            writeln!(out, "{}", self.result)?;
        }
        Ok(())
    }
}

/// Run a script file.
pub fn run_file(path: &Path, config: EngineConfig) -> Result<RunReport, RunError> {
    let text = read_script(path)?;
    let mut report = execute(&text, &display_name(path), config)?;
    report.echo_result = false;
    Ok(report)
}

/// Evaluate source text given on the command line.
pub fn eval_source(source: &str, config: EngineConfig) -> Result<RunReport, RunError> {
    execute(source, EVAL_NAME, config)
}

fn execute(text: &str, name: &str, mut config: EngineConfig) -> Result<RunReport, RunError> {
    config.capture_console = true;
    let mut interp = Interpreter::with_config(config);
    let started_at = Utc::now();
    log::debug!("[ember-run] running {}", name);

    let outcome = interp.run_named(text, name);
    let console = interp.take_console_output();
    let value = match outcome {
        Ok(value) => value,
        Err(error) => return Err(RunError::Script { error, console }),
    };

    let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
    log::debug!("[ember-run] {} finished in {} ms", name, elapsed_ms);
    Ok(RunReport {
        script: name.to_string(),
        started_at,
        elapsed_ms,
        console,
        result: inspect_result(&value),
        result_type: coerce::type_of(&value).to_string(),
        echo_result: true,
    })
}

fn inspect_result(value: &Value) -> String {
    ember_js::builtin::global::inspect(value)
}

// ── tokens ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TokenEntry {
    pub kind: &'static str,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Serialize)]
pub struct TokensReport {
    pub script: String,
    pub tokens: Vec<TokenEntry>,
}

impl Report for TokensReport {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        for token in &self.tokens {
            writeln!(
                out,
                "{}:{}\t{}\t{}",
                token.line, token.column, token.kind, token.text
            )?;
        }
        Ok(())
    }
}

/// Token category shown by `ember-run tokens`.
pub fn token_category(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Number(_) => "number",
        TokenKind::String(_) => "string",
        TokenKind::Identifier(_) => "identifier",
        TokenKind::True | TokenKind::False | TokenKind::Null => "literal",
        TokenKind::Eof => "eof",
        kind if kind.is_keyword() => "keyword",
        _ => "punctuator",
    }
}

/// Tokenize a script file. The end-of-input token is not listed.
pub fn tokens(path: &Path) -> Result<TokensReport, RunError> {
    let text = read_script(path)?;
    let name = display_name(path);
    let tokens = Lexer::new(Source::new(name.clone(), text)).tokenize()?;
    Ok(TokensReport {
        script: name,
        tokens: tokens
            .into_iter()
            .filter(|token| !token.is_eof())
            .map(|token| TokenEntry {
                kind: token_category(&token.kind),
                text: token.lexeme,
                line: token.span.line,
                column: token.span.column,
            })
            .collect(),
    })
}

// ── ast ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AstReport {
    pub script: String,
    pub statements: usize,
    /// Pretty-printed syntax tree.
    pub tree: String,
}

impl Report for AstReport {
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.tree)
    }
}

/// Parse a script file.
pub fn ast(path: &Path) -> Result<AstReport, RunError> {
    let text = read_script(path)?;
    let name = display_name(path);
    let program = parser::parse(&text, &name)?;
    Ok(AstReport {
        script: name,
        statements: program.body.len(),
        tree: format!("{:#?}", program.body),
    })
}

// ── debug ────────────────────────────────────────────────────────────

/// Options of `ember-run debug`.
#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    pub breakpoints: Vec<usize>,
    pub stop_on_entry: bool,
}

/// Run a script file under a debug session on stdin/stdout.
///
/// Stdout belongs to the protocol; the script's outcome reaches the client
/// as an `executionFinished` event.
pub fn debug(path: &Path, config: EngineConfig, options: &DebugOptions) -> Result<(), RunError> {
    let text = read_script(path)?;
    let transport = LineTransport::new(BufReader::new(io::stdin()), io::stdout());
    debug_with(&text, &display_name(path), config, options, transport)
}

/// Run `text` under a debug session over `transport`.
pub fn debug_with<T: Transport + 'static>(
    text: &str,
    name: &str,
    config: EngineConfig,
    options: &DebugOptions,
    transport: T,
) -> Result<(), RunError> {
    let mut session = DebugSession::new(transport);
    for &line in &options.breakpoints {
        let breakpoint = session.debugger_mut().set_breakpoint(line, None);
        log::info!("[ember-run] breakpoint {} at line {}", breakpoint.id, line);
    }
    if options.stop_on_entry {
        session.debugger_mut().request_pause(PauseReason::Entry);
    }

    let mut interp = Interpreter::with_config(config);
    interp.set_debug_hook(Box::new(session));
    let outcome = interp.run_named(text, name);
    let console = interp.take_console_output();
    drop(interp.take_debug_hook());
    outcome
        .map(|_| ())
        .map_err(|error| RunError::Script { error, console })
}
