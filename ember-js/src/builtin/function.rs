//! `Function` constructor and `Function.prototype`.

use crate::error::{JsError, JsResult};
use crate::function::{BoundFunction, Callable, ExecutionContext};
use crate::interpreter::Interpreter;
use crate::object::ObjectRef;
use crate::value::Value;

use super::{define_constructor, define_method};

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().function_prototype.clone();
    define_constructor(interp, "Function", 1, function_constructor, &prototype);

    define_method(interp, &prototype, "call", 1, function_call);
    define_method(interp, &prototype, "apply", 2, function_apply);
    define_method(interp, &prototype, "bind", 1, function_bind);
    define_method(interp, &prototype, "toString", 0, function_to_string);
}

/// `Function(p1, ..., body)`: every argument but the last is a parameter.
fn function_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let mut parts = Vec::with_capacity(ctx.arg_count());
    for arg in &ctx.arguments {
        parts.push(interp.to_string(arg)?);
    }
    let body = parts.pop().unwrap_or_default();
    interp.compile_function(&parts.join(","), &body)
}

fn this_function(ctx: &ExecutionContext, method: &str) -> JsResult<ObjectRef> {
    match &ctx.this_value {
        Value::Object(obj) if obj.is_callable() => Ok(obj.clone()),
        _ => Err(JsError::type_error(format!(
            "Function.prototype.{} called on a non-function",
            method
        ))),
    }
}

fn function_call(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let function = this_function(ctx, "call")?;
    let args = ctx.arguments.get(1..).unwrap_or(&[]);
    interp.call_function(&Value::Object(function), &ctx.arg(0), args)
}

fn function_apply(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let function = this_function(ctx, "apply")?;
    let args = list_from_array_like(interp, &ctx.arg(1))?;
    interp.call_function(&Value::Object(function), &ctx.arg(0), &args)
}

/// Arguments of `apply`: an array, an object with `length`, or nothing.
fn list_from_array_like(interp: &mut Interpreter, value: &Value) -> JsResult<Vec<Value>> {
    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Object(obj) => {
            if let Some(elements) = obj.array_elements() {
                return Ok(elements);
            }
            let length = crate::coerce::to_integer(interp.to_number(&obj.get("length"))?);
            let length = if length > 0.0 { length as usize } else { 0 };
            Ok((0..length).map(|i| obj.get(&i.to_string())).collect())
        }
        _ => Err(JsError::type_error(
            "CreateListFromArrayLike called on non-object",
        )),
    }
}

fn function_bind(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let target = this_function(ctx, "bind")?;
    let arguments: Vec<Value> = ctx.arguments.iter().skip(1).cloned().collect();
    let (name, target_length) = match target.callable() {
        Some(callable) => (callable.name(), callable.length()),
        None => (String::new(), 0),
    };
    let bound = BoundFunction {
        length: target_length.saturating_sub(arguments.len()),
        target,
        this_value: ctx.arg(0),
        arguments,
        name,
    };
    Ok(Value::Object(interp.create_function(Callable::Bound(bound))))
}

fn function_to_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let function = this_function(ctx, "toString")?;
    let text = match function.callable() {
        Some(Callable::Script(script)) => script.source_text().to_string(),
        Some(other) => format!("function {}() {{ [native code] }}", other.name()),
        None => String::new(),
    };
    Ok(Value::from(text))
}
