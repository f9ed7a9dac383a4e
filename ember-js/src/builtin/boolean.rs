//! `Boolean` constructor and `Boolean.prototype`.

use crate::coerce;
use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::ObjectKind;
use crate::value::Value;

use super::{construct_target, define_constructor, define_method, into_wrapper};

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().boolean_prototype.clone();
    prototype.borrow_mut().kind = ObjectKind::Boolean(false);
    define_constructor(interp, "Boolean", 1, boolean_constructor, &prototype);

    define_method(interp, &prototype, "toString", 0, boolean_to_string);
    define_method(interp, &prototype, "valueOf", 0, boolean_value_of);
}

fn boolean_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let b = coerce::to_boolean(&ctx.arg(0));
    let prototype = interp.intrinsics().boolean_prototype.clone();
    match construct_target(ctx, &prototype) {
        Some(target) => Ok(into_wrapper(target, ObjectKind::Boolean(b))),
        None => Ok(Value::Boolean(b)),
    }
}

fn this_boolean(ctx: &ExecutionContext, method: &str) -> JsResult<bool> {
    let value = match &ctx.this_value {
        Value::Boolean(b) => Some(*b),
        Value::Object(obj) => match obj.borrow().kind {
            ObjectKind::Boolean(b) => Some(b),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| {
        JsError::type_error(format!(
            "Boolean.prototype.{} requires that 'this' be a Boolean",
            method
        ))
    })
}

fn boolean_to_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::from(this_boolean(ctx, "toString")?.to_string()))
}

fn boolean_value_of(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(this_boolean(ctx, "valueOf")?))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    #[test]
    fn test_wrapper_objects_are_truthy() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.run("Boolean('')").unwrap(), Value::Boolean(false));
        assert_eq!(interp.run("new Boolean(false) ? 1 : 2").unwrap(), Value::from(1));
        assert_eq!(interp.run("new Boolean(false).valueOf()").unwrap(), Value::Boolean(false));
        assert_eq!(interp.run("true.toString()").unwrap(), Value::from("true"));
    }

    #[test]
    fn test_methods_reject_foreign_receivers() {
        let err = Interpreter::new()
            .run("Boolean.prototype.valueOf.call(1)")
            .unwrap_err();
        assert!(err.to_string().contains("requires that 'this' be a Boolean"));
    }
}
