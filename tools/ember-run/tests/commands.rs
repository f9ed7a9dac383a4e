//! Subcommand handlers driven against scripts on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use ember_devtools::{ChannelTransport, Message, PauseReason, Transport};
use ember_js::{ConsoleLevel, EngineConfig};
use ember_run::error::RunError;
use ember_run::output::{write_report, OutputFormat};
use ember_run::runner::{self, DebugOptions};
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn human<T: ember_run::output::Report>(report: &T) -> String {
    let mut out = Vec::new();
    write_report(OutputFormat::Human, report, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn run_reports_console_and_completion_value() {
    let dir = TempDir::new().unwrap();
    let path = script(
        &dir,
        "hello.js",
        "console.log('hello', 1 + 1);\nconsole.warn('careful');\n[1, 2].length;\n",
    );

    let report = runner::run_file(&path, EngineConfig::default()).unwrap();
    assert_eq!(report.console.len(), 2);
    assert_eq!(report.console[0].text, "hello 2");
    assert_eq!(report.console[1].level, ConsoleLevel::Warn);
    assert_eq!(report.result, "2");
    assert_eq!(report.result_type, "number");
    assert_eq!(human(&report), "hello 2\ncareful\n2\n");
}

#[test]
fn run_hides_undefined_completion_but_eval_shows_it() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "quiet.js", "var x = 1;");
    let report = runner::run_file(&path, EngineConfig::default()).unwrap();
    assert_eq!(human(&report), "");

    let report = runner::eval_source("var x = 1;", EngineConfig::default()).unwrap();
    assert_eq!(report.script, runner::EVAL_NAME);
    assert_eq!(human(&report), "undefined\n");
}

#[test]
fn json_report_has_console_and_result() {
    let report = runner::eval_source("console.error('bad'); 'done'", EngineConfig::default()).unwrap();
    let mut out = Vec::new();
    write_report(OutputFormat::Json, &report, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["console"][0]["level"], "error");
    assert_eq!(json["console"][0]["text"], "bad");
    assert_eq!(json["result"], "'done'");
    assert_eq!(json["result_type"], "string");
    assert!(json.get("echo_result").is_none());
}

#[test]
fn missing_script_is_infrastructure_error() {
    let err = runner::run_file(Path::new("/nonexistent/dir/page.js"), EngineConfig::default())
        .unwrap_err();
    assert!(matches!(err, RunError::FileNotFound { .. }));
    assert_eq!(err.code(), 2);
}

#[test]
fn uncaught_exception_keeps_earlier_console_output() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "boom.js", "console.log('first');\nthrow new TypeError('boom');\n");
    let err = runner::run_file(&path, EngineConfig::default()).unwrap_err();
    assert_eq!(err.code(), 1);
    assert_eq!(err.console().len(), 1);
    assert_eq!(err.to_string(), "Uncaught TypeError: boom");
    assert_eq!(err.location().map(|l| l.line), Some(2));
}

#[test]
fn config_file_limits_call_depth() {
    let dir = TempDir::new().unwrap();
    let config_path = script(&dir, "engine.toml", "max_call_depth = 10\n");
    let config = runner::load_config(Some(config_path.as_path())).unwrap();
    assert_eq!(config.max_call_depth, 10);

    let err = runner::eval_source("function f(n) { return f(n + 1); } f(0)", config).unwrap_err();
    assert!(err.to_string().contains("RangeError"));

    let bad = script(&dir, "bad.toml", "max_call_depth = \"deep\"\n");
    let err = runner::load_config(Some(bad.as_path())).unwrap_err();
    assert_eq!(err.code(), 2);
}

#[test]
fn tokens_lists_categories_and_positions() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "tokens.js", "var x = 'hi';\nif (true) x += 1.5;");
    let report = runner::tokens(&path).unwrap();
    let kinds: Vec<&str> = report.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            "keyword",
            "identifier",
            "punctuator",
            "string",
            "punctuator",
            "keyword",
            "punctuator",
            "literal",
            "punctuator",
            "identifier",
            "punctuator",
            "number",
            "punctuator",
        ]
    );
    let plus_assign = &report.tokens[10];
    assert_eq!(plus_assign.text, "+=");
    assert_eq!((plus_assign.line, plus_assign.column), (2, 13));
    assert!(human(&report).starts_with("1:1\tkeyword\tvar\n"));
}

#[test]
fn tokens_reports_lex_errors() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "broken.js", "var s = 'open;\n");
    let err = runner::tokens(&path).unwrap_err();
    assert!(matches!(err, RunError::Lex(_)));
    assert_eq!(err.location().map(|l| (l.line, l.column)), Some((1, 9)));
}

#[test]
fn ast_counts_top_level_statements() {
    let dir = TempDir::new().unwrap();
    let path = script(&dir, "tree.js", "function f() { return 1; }\nvar y = f();\ny;\n");
    let report = runner::ast(&path).unwrap();
    assert_eq!(report.statements, 3);
    assert!(report.tree.contains("Function"));

    let path = script(&dir, "bad.js", "(1 + 2");
    let err = runner::ast(&path).unwrap_err();
    assert!(matches!(err, RunError::Parse(_)));
    assert_eq!(err.code(), 1);
}

#[test]
fn debug_stops_on_entry_and_at_breakpoints() {
    let (mut client, server) = ChannelTransport::pair();
    let options = DebugOptions {
        breakpoints: vec![3],
        stop_on_entry: true,
    };
    let engine = thread::spawn(move || {
        runner::debug_with(
            "var a = 1;\nvar b = 2;\nvar c = a + b;\nconsole.log(c);\n",
            "dbg.js",
            EngineConfig::default(),
            &options,
            server,
        )
        .map_err(|err| err.to_string())
    });

    let mut paused = Vec::new();
    loop {
        match client.receive().unwrap() {
            Message::Paused(p) => {
                paused.push((p.reason, p.location.line));
                client.send(&Message::Resume).unwrap();
            }
            Message::ExecutionFinished(finished) => {
                assert!(finished.error.is_none());
                break;
            }
            _ => {}
        }
    }
    assert!(engine.join().unwrap().is_ok());
    assert_eq!(
        paused,
        vec![(PauseReason::Entry, 1), (PauseReason::Breakpoint, 3)]
    );
}

#[test]
fn debug_reports_script_failure_as_exit_code_one() {
    let (mut client, server) = ChannelTransport::pair();
    let engine = thread::spawn(move || {
        runner::debug_with(
            "null.x;",
            "dbg.js",
            EngineConfig::default(),
            &DebugOptions::default(),
            server,
        )
        .map_err(|err| err.code())
    });
    loop {
        if let Message::ExecutionFinished(finished) = client.receive().unwrap() {
            assert!(finished.error.unwrap().contains("TypeError"));
            break;
        }
    }
    // Script errors hold `Rc` values, so only the exit code leaves the thread.
    assert_eq!(engine.join().unwrap(), Err(1));
}
