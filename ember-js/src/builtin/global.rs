//! Global value properties, global functions and `console`.

use crate::coerce::{self, number_to_string};
use crate::debug::ConsoleLevel;
use crate::error::JsResult;
use crate::function::{Callable, ExecutionContext};
use crate::interpreter::Interpreter;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;

use super::{date, define_constant, define_method};

/// Nesting level below which `inspect` abbreviates objects.
const INSPECT_DEPTH: usize = 2;

pub fn init(interp: &mut Interpreter) {
    let global = interp.global_object().clone();

    // Global values
    define_constant(&global, "undefined", Value::Undefined);
    define_constant(&global, "NaN", Value::Number(f64::NAN));
    define_constant(&global, "Infinity", Value::Number(f64::INFINITY));
    global.define("globalThis", Value::Object(global.clone()), false);

    // Global functions
    define_method(interp, &global, "isNaN", 1, global_is_nan);
    define_method(interp, &global, "isFinite", 1, global_is_finite);

    // Console object
    let console = interp.create_object();
    define_method(interp, &console, "log", 0, console_log);
    define_method(interp, &console, "info", 0, console_info);
    define_method(interp, &console, "warn", 0, console_warn);
    define_method(interp, &console, "error", 0, console_error);
    define_method(interp, &console, "debug", 0, console_debug);
    global.define("console", Value::Object(console), false);
}

fn global_is_nan(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(interp.to_number(&ctx.arg(0))?.is_nan()))
}

fn global_is_finite(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(interp.to_number(&ctx.arg(0))?.is_finite()))
}

// ── console ──────────────────────────────────────────────────────────

fn write_console(interp: &mut Interpreter, ctx: &ExecutionContext, level: ConsoleLevel) -> JsResult<Value> {
    let text = ctx
        .arguments
        .iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => inspect(other),
        })
        .collect::<Vec<_>>()
        .join(" ");
    interp.console_message(level, text);
    Ok(Value::Undefined)
}

fn console_log(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    write_console(interp, ctx, ConsoleLevel::Log)
}

fn console_info(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    write_console(interp, ctx, ConsoleLevel::Info)
}

fn console_warn(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    write_console(interp, ctx, ConsoleLevel::Warn)
}

fn console_error(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    write_console(interp, ctx, ConsoleLevel::Error)
}

fn console_debug(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    write_console(interp, ctx, ConsoleLevel::Debug)
}

// ── inspect ──────────────────────────────────────────────────────────

/// Developer-facing rendering of a value, as `console.log` prints
/// non-string arguments. Runs no script code.
pub fn inspect(value: &Value) -> String {
    let mut seen = Vec::new();
    inspect_value(value, 0, &mut seen)
}

fn inspect_value(value: &Value, depth: usize, seen: &mut Vec<ObjectRef>) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Object(obj) => inspect_object(obj, depth, seen),
        other => coerce::to_string(other),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n"))
}

fn inspect_object(obj: &ObjectRef, depth: usize, seen: &mut Vec<ObjectRef>) -> String {
    let elements = match &obj.borrow().kind {
        ObjectKind::Function(callable) => return function_label(callable),
        ObjectKind::Error => return coerce::error_to_string(obj),
        ObjectKind::Date(t) => {
            return date::to_iso_string(*t).unwrap_or_else(|| "Invalid Date".to_string())
        }
        ObjectKind::Number(n) => return format!("[Number: {}]", number_to_string(*n)),
        ObjectKind::Boolean(b) => return format!("[Boolean: {}]", b),
        ObjectKind::String(s) => return format!("[String: {}]", quote(s)),
        ObjectKind::Array(elements) => Some(elements.clone()),
        ObjectKind::Ordinary => None,
    };

    if seen.iter().any(|s| s.ptr_eq(obj)) {
        return "[Circular]".to_string();
    }
    if depth > INSPECT_DEPTH {
        return if elements.is_some() { "[Array]" } else { "[Object]" }.to_string();
    }

    seen.push(obj.clone());
    let (open, close, parts) = match elements {
        Some(elements) => {
            let parts: Vec<String> = elements
                .iter()
                .map(|element| inspect_value(element, depth + 1, seen))
                .collect();
            ("[", "]", parts)
        }
        None => {
            let parts = obj
                .own_enumerable_keys()
                .into_iter()
                .map(|key| {
                    let member = obj.get(&key);
                    format!("{}: {}", property_label(&key), inspect_value(&member, depth + 1, seen))
                })
                .collect();
            ("{", "}", parts)
        }
    };
    seen.pop();

    if parts.is_empty() {
        format!("{}{}", open, close)
    } else {
        format!("{} {} {}", open, parts.join(", "), close)
    }
}

fn function_label(callable: &Callable) -> String {
    match callable.name() {
        name if name.is_empty() => "[Function (anonymous)]".to_string(),
        name => format!("[Function: {}]", name),
    }
}

/// Keys print bare when they are identifiers, quoted otherwise.
fn property_label(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        key.to_string()
    } else {
        quote(key)
    }
}
