//! `Error` and its native subtypes.

use crate::coerce;
use crate::error::{JsError, JsResult};
use crate::function::{ExecutionContext, NativeFn};
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::{define_constructor, define_method, NATIVE_ERRORS};

pub fn init(interp: &mut Interpreter) {
    let error_prototype = interp.intrinsics().error_prototype.clone();
    error_prototype.define("name", Value::from("Error"), false);
    error_prototype.define("message", Value::from(""), false);
    define_method(interp, &error_prototype, "toString", 0, error_to_string);
    let error_constructor = define_constructor(interp, "Error", 1, error_ctor, &error_prototype);

    for name in NATIVE_ERRORS {
        let prototype = interp.intrinsics().error_prototype_for(name).clone();
        prototype.define("name", Value::from(name), false);
        prototype.define("message", Value::from(""), false);
        let constructor = define_constructor(interp, name, 1, native_error_ctor(name), &prototype);
        // `Object.getPrototypeOf(TypeError) === Error`.
        let _ = constructor.set_prototype(Some(error_constructor.clone()));
    }
}

fn native_error_ctor(name: &str) -> NativeFn {
    match name {
        "TypeError" => type_error_ctor,
        "RangeError" => range_error_ctor,
        "ReferenceError" => reference_error_ctor,
        _ => syntax_error_ctor,
    }
}

/// Shared body of every error constructor. `new` is optional.
fn construct_error(interp: &mut Interpreter, ctx: &ExecutionContext, name: &str) -> JsResult<Value> {
    let error = interp.create_error(name, "");
    let message = ctx.arg(0);
    if !message.is_undefined() {
        let message = interp.to_string(&message)?;
        error.define("message", Value::from(message), false);
    }
    Ok(Value::Object(error))
}

fn error_ctor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    construct_error(interp, ctx, "Error")
}

fn type_error_ctor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    construct_error(interp, ctx, "TypeError")
}

fn range_error_ctor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    construct_error(interp, ctx, "RangeError")
}

fn reference_error_ctor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    construct_error(interp, ctx, "ReferenceError")
}

fn syntax_error_ctor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    construct_error(interp, ctx, "SyntaxError")
}

fn error_to_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    match &ctx.this_value {
        Value::Object(obj) => Ok(Value::from(coerce::error_to_string(obj))),
        _ => Err(JsError::type_error(
            "Error.prototype.toString called on non-object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    fn eval(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_callable_with_or_without_new() {
        assert_eq!(eval("String(new TypeError('bad'))"), Value::from("TypeError: bad"));
        assert_eq!(eval("String(RangeError('far'))"), Value::from("RangeError: far"));
        assert_eq!(eval("String(Error())"), Value::from("Error"));
    }

    #[test]
    fn test_prototype_chain() {
        let result = eval(
            "var e = new SyntaxError('x'); \
             [e instanceof SyntaxError, e instanceof Error, e.name, \
              Object.getPrototypeOf(SyntaxError) === Error].join()",
        );
        assert_eq!(result, Value::from("true,true,SyntaxError,true"));
    }

    #[test]
    fn test_engine_errors_are_catchable_instances() {
        let result = eval(
            "try { null.x; } catch (e) { (e instanceof TypeError) + ':' + e.message }",
        );
        assert_eq!(
            result,
            Value::from("true:Cannot read properties of null (reading 'x')")
        );
    }

    #[test]
    fn test_name_and_message_are_overridable() {
        let result = eval(
            "var e = new Error('m'); e.name = 'Custom'; e.toString()",
        );
        assert_eq!(result, Value::from("Custom: m"));
    }
}
