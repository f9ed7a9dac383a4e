use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::error::RunError;

/// Output format selection for all subcommands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object on stdout.
    Json,
    /// Human-readable text on stdout.
    #[default]
    Human,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// A command result that can be shown in either format.
pub trait Report: Serialize {
    /// Human-readable rendering.
    fn write_human(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Write a successful result to stdout.
pub fn emit<T: Report>(format: OutputFormat, report: &T) -> io::Result<()> {
    let stdout = io::stdout();
    write_report(format, report, &mut stdout.lock())
}

/// Write a successful result.
///
/// - **Json**: a single JSON object on one line, no extraneous text.
/// - **Human**: the report's own rendering.
pub fn write_report<T: Report>(format: OutputFormat, report: &T, out: &mut dyn Write) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(report).map_err(io::Error::other)?;
            writeln!(out, "{json}")
        }
        OutputFormat::Human => report.write_human(out),
    }
}

/// Write an error to stdout (JSON mode) or stderr (human mode).
pub fn emit_error(format: OutputFormat, error: &RunError) {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let _ = write_error(format, error, &mut stdout.lock(), &mut stderr.lock());
}

/// Write an error report.
///
/// In human mode the console output the script produced before failing
/// still goes to `out`; the error itself and its source excerpt go to
/// `err_out`. In JSON mode everything is one object on `out`, so the
/// caller always gets valid JSON on stdout.
pub fn write_error(
    format: OutputFormat,
    error: &RunError,
    out: &mut dyn Write,
    err_out: &mut dyn Write,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": error.to_string(),
                "exit_code": error.code(),
                "location": error.location(),
                "console": error.console(),
            });
            writeln!(out, "{obj}")
        }
        OutputFormat::Human => {
            for message in error.console() {
                writeln!(out, "{}", message.text)?;
            }
            writeln!(err_out, "error: {error}")?;
            if let Some(location) = error.location() {
                writeln!(err_out, "  at {location}")?;
                if !location.source_text.is_empty() {
                    for line in location.excerpt().lines() {
                        writeln!(err_out, "  | {line}")?;
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Serialize)]
    struct Greeting {
        text: &'static str,
    }

    impl Report for Greeting {
        fn write_human(&self, out: &mut dyn Write) -> io::Result<()> {
            writeln!(out, "{}", self.text)
        }
    }

    fn render_error(format: OutputFormat, error: &RunError) -> (String, String) {
        let mut out = Vec::new();
        let mut err_out = Vec::new();
        write_error(format, error, &mut out, &mut err_out).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err_out).unwrap(),
        )
    }

    #[test]
    fn json_report_is_one_line() {
        let mut out = Vec::new();
        write_report(OutputFormat::Json, &Greeting { text: "hi" }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"text\":\"hi\"}\n");
    }

    #[test]
    fn human_report_uses_rendering() {
        let mut out = Vec::new();
        write_report(OutputFormat::Human, &Greeting { text: "hi" }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi\n");
    }

    #[test]
    fn human_error_shows_excerpt_on_stderr() {
        let mut interp = ember_js::Interpreter::new();
        let error = interp
            .run_named("console.log('before');\nundefinedName;", "page.js")
            .unwrap_err();
        let error = RunError::Script {
            error,
            console: interp.take_console_output(),
        };
        let (out, err_out) = render_error(OutputFormat::Human, &error);
        assert_eq!(out, "before\n");
        assert!(err_out.starts_with("error: Uncaught ReferenceError"));
        assert!(err_out.contains("  at page.js:2:1\n"));
        assert!(err_out.contains("  | undefinedName;\n  | ^\n"));
    }

    #[test]
    fn json_error_carries_exit_code() {
        let error = RunError::FileNotFound {
            path: PathBuf::from("missing.js"),
        };
        let (out, err_out) = render_error(OutputFormat::Json, &error);
        assert!(err_out.is_empty());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["exit_code"], 2);
        assert_eq!(parsed["error"], "Script not found: missing.js");
        assert!(parsed["location"].is_null());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Human.to_string(), "human");
    }

    #[test]
    fn output_format_default_is_human() {
        assert_eq!(OutputFormat::default(), OutputFormat::Human);
    }
}
