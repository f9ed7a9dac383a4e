//! Runs every `tests/scripts/*.test.js` file in a fresh interpreter.
//!
//! Scripts get two host functions: `assert(condition, message)` and
//! `assertEquals(actual, expected, message)`. A failed assertion throws,
//! so a script passes when it runs to completion.

use std::path::{Path, PathBuf};

use ember_js::builtin::global::inspect;
use ember_js::{ExecutionContext, Interpreter, JsError, JsResult, Value};

fn assert_native(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    if ember_js::coerce::to_boolean(&ctx.arg(0)) {
        return Ok(Value::Undefined);
    }
    let message = interp.to_string(&ctx.arg(1))?;
    Err(JsError::native("AssertionError", message))
}

fn assert_equals_native(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let actual = ctx.arg(0);
    let expected = ctx.arg(1);
    if actual == expected {
        return Ok(Value::Undefined);
    }
    let label = match ctx.arg(2) {
        Value::Undefined => String::from("values differ"),
        other => interp.to_string(&other)?,
    };
    Err(JsError::native(
        "AssertionError",
        format!("{}: expected {}, got {}", label, inspect(&expected), inspect(&actual)),
    ))
}

fn script_files() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts");
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|err| panic!("cannot read {}: {}", dir.display(), err))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.to_string_lossy().ends_with(".test.js"))
        .collect();
    files.sort();
    files
}

#[test]
fn script_suite() {
    let files = script_files();
    assert!(!files.is_empty(), "no script tests found");

    let mut failures = Vec::new();
    for path in &files {
        let text = std::fs::read_to_string(path).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();

        let mut interp = Interpreter::new();
        interp.define_native_function("assert", 2, assert_native);
        interp.define_native_function("assertEquals", 3, assert_equals_native);
        if let Err(err) = interp.run_named(&text, &name) {
            let location = err
                .source_info()
                .map(|info| format!("\n  at {}\n{}", info, info.excerpt()))
                .unwrap_or_default();
            failures.push(format!("{}: {}{}", name, err, location));
        }
    }

    assert!(
        failures.is_empty(),
        "{} of {} scripts failed:\n{}",
        failures.len(),
        files.len(),
        failures.join("\n")
    );
}
