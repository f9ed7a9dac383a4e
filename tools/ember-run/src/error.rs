use std::path::PathBuf;
use std::process::ExitCode;

use ember_devtools::TransportError;
use ember_js::{ConfigError, ConsoleMessage, LexError, ParseError, ScriptError, SourceInfo};

/// All errors produced by ember-run.
///
/// Variants are split into two categories:
/// - **Infrastructure errors** (exit code 2): unreadable files, bad config,
///   broken debug transport
/// - **Script errors** (exit code 1): the script failed to lex, parse or run
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    // ── Infrastructure errors (exit code 2) ──────────────────────────

    #[error("Script not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Debug transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Script errors (exit code 1) ──────────────────────────────────

    /// The script threw or failed to parse. `console` holds the output it
    /// produced before failing.
    #[error("{error}")]
    Script {
        error: ScriptError,
        console: Vec<ConsoleMessage>,
    },

    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),
}

impl RunError {
    /// Numeric process exit code.
    ///
    /// - `2`: infrastructure error
    /// - `1`: script failure
    pub fn code(&self) -> u8 {
        match self {
            Self::FileNotFound { .. }
            | Self::Config(_)
            | Self::Transport(_)
            | Self::Io(_)
            | Self::Json(_) => 2,

            Self::Script { .. } | Self::Lex(_) | Self::Parse(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Where in the script the failure happened, if it came from the script.
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            Self::Script { error, .. } => error.source_info(),
            Self::Lex(err) => Some(&err.at),
            Self::Parse(err) => Some(err.source_info()),
            _ => None,
        }
    }

    /// Console output produced before the failure.
    pub fn console(&self) -> &[ConsoleMessage] {
        match self {
            Self::Script { console, .. } => console,
            _ => &[],
        }
    }
}
