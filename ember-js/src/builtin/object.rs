//! `Object` constructor and `Object.prototype`.

use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::{JsObject, ObjectKind, ObjectRef, PropertyDescriptor};
use crate::value::Value;

use super::{define_constructor, define_method};

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().object_prototype.clone();
    let constructor = define_constructor(interp, "Object", 1, object_constructor, &prototype);

    define_method(interp, &constructor, "keys", 1, object_keys);
    define_method(interp, &constructor, "values", 1, object_values);
    define_method(interp, &constructor, "entries", 1, object_entries);
    define_method(interp, &constructor, "assign", 2, object_assign);
    define_method(interp, &constructor, "create", 2, object_create);
    define_method(interp, &constructor, "getPrototypeOf", 1, object_get_prototype_of);
    define_method(interp, &constructor, "setPrototypeOf", 2, object_set_prototype_of);
    define_method(interp, &constructor, "defineProperty", 3, object_define_property);

    define_method(interp, &prototype, "hasOwnProperty", 1, proto_has_own_property);
    define_method(interp, &prototype, "isPrototypeOf", 1, proto_is_prototype_of);
    define_method(interp, &prototype, "propertyIsEnumerable", 1, proto_property_is_enumerable);
    define_method(interp, &prototype, "toString", 0, proto_to_string);
    define_method(interp, &prototype, "valueOf", 0, proto_value_of);
}

fn object_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    match ctx.arg(0) {
        Value::Undefined | Value::Null => Ok(Value::Object(interp.create_object())),
        value => Ok(Value::Object(interp.to_object(&value)?)),
    }
}

// Static methods

fn object_keys(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let obj = interp.to_object(&ctx.arg(0))?;
    let keys = obj.own_enumerable_keys().into_iter().map(Value::from).collect();
    Ok(Value::Object(interp.create_array(keys)))
}

fn object_values(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let obj = interp.to_object(&ctx.arg(0))?;
    let values = obj
        .own_enumerable_keys()
        .iter()
        .map(|key| obj.get(key))
        .collect();
    Ok(Value::Object(interp.create_array(values)))
}

fn object_entries(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let obj = interp.to_object(&ctx.arg(0))?;
    let entries = obj
        .own_enumerable_keys()
        .into_iter()
        .map(|key| {
            let value = obj.get(&key);
            Value::Object(interp.create_array(vec![Value::from(key), value]))
        })
        .collect();
    Ok(Value::Object(interp.create_array(entries)))
}

fn object_assign(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let target = interp.to_object(&ctx.arg(0))?;
    for source in ctx.arguments.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let source = interp.to_object(source)?;
        for key in source.own_enumerable_keys() {
            target.set(&key, source.get(&key))?;
        }
    }
    Ok(Value::Object(target))
}

fn object_create(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let prototype = match ctx.arg(0) {
        Value::Object(proto) => Some(proto),
        Value::Null => None,
        other => {
            return Err(JsError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                interp.to_string(&other)?
            )))
        }
    };
    let obj = ObjectRef::new(JsObject::new(prototype));
    if let Value::Object(props) = ctx.arg(1) {
        for key in props.own_enumerable_keys() {
            define_from_descriptor(interp, &obj, &key, &props.get(&key))?;
        }
    }
    Ok(Value::Object(obj))
}

fn object_get_prototype_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let obj = interp.to_object(&ctx.arg(0))?;
    Ok(obj.prototype().map_or(Value::Null, Value::Object))
}

fn object_set_prototype_of(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let target = ctx.arg(0);
    let prototype = match ctx.arg(1) {
        Value::Object(proto) => Some(proto),
        Value::Null => None,
        _ => return Err(JsError::type_error("Object prototype may only be an Object or null")),
    };
    match &target {
        Value::Undefined | Value::Null => Err(JsError::type_error(
            "Object.setPrototypeOf called on null or undefined",
        )),
        Value::Object(obj) => {
            obj.set_prototype(prototype)?;
            Ok(target)
        }
        _ => Ok(target),
    }
}

fn object_define_property(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let target = ctx.arg(0);
    let Value::Object(obj) = &target else {
        return Err(JsError::type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&ctx.arg(1))?;
    define_from_descriptor(interp, obj, &key, &ctx.arg(2))?;
    Ok(target)
}

/// Apply a script descriptor object (`{value, writable, enumerable}`).
/// Fields it leaves out keep their current setting, or `false` for a new
/// property.
fn define_from_descriptor(
    interp: &mut Interpreter,
    obj: &ObjectRef,
    key: &str,
    descriptor: &Value,
) -> JsResult<()> {
    let Value::Object(desc) = descriptor else {
        return Err(JsError::type_error(format!(
            "Property description must be an object: {}",
            interp.to_string(descriptor)?
        )));
    };
    if desc.has_property("get") || desc.has_property("set") {
        return Err(JsError::type_error("Accessor properties are not supported"));
    }

    let current = {
        let borrowed = obj.borrow();
        match borrowed.descriptor(key) {
            Some(existing) => existing.clone(),
            None => PropertyDescriptor::data(
                borrowed.get_own(key).unwrap_or_default(),
                false,
                false,
            ),
        }
    };
    let flag = |name: &str, default: bool| match desc.lookup(name) {
        Some(value) => crate::coerce::to_boolean(&value),
        None => default,
    };
    let updated = PropertyDescriptor {
        value: desc.lookup("value").unwrap_or(current.value),
        writable: flag("writable", current.writable),
        enumerable: flag("enumerable", current.enumerable),
    };
    obj.borrow_mut().define_property(key, updated);
    Ok(())
}

// Prototype methods

fn proto_has_own_property(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let key = interp.to_property_key(&ctx.arg(0))?;
    let obj = interp.to_object(&ctx.this_value)?;
    Ok(Value::Boolean(obj.has_own_property(&key)))
}

fn proto_is_prototype_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let Value::Object(candidate) = ctx.arg(0) else {
        return Ok(Value::Boolean(false));
    };
    let this = interp.to_object(&ctx.this_value)?;
    Ok(Value::Boolean(candidate.inherits_from(&this)))
}

fn proto_property_is_enumerable(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let key = interp.to_property_key(&ctx.arg(0))?;
    let obj = interp.to_object(&ctx.this_value)?;
    let enumerable = obj.own_enumerable_keys().contains(&key);
    Ok(Value::Boolean(enumerable))
}

fn proto_to_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let tag = match &ctx.this_value {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Boolean(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Object(obj) => class_of(obj),
    };
    Ok(Value::from(format!("[object {}]", tag)))
}

/// Builtin tag of an object, as reported by `Object.prototype.toString`.
pub fn class_of(obj: &ObjectRef) -> &'static str {
    match obj.borrow().kind {
        ObjectKind::Ordinary => "Object",
        ObjectKind::Array(_) => "Array",
        ObjectKind::Function(_) => "Function",
        ObjectKind::Number(_) => "Number",
        ObjectKind::Boolean(_) => "Boolean",
        ObjectKind::String(_) => "String",
        ObjectKind::Date(_) => "Date",
        ObjectKind::Error => "Error",
    }
}

fn proto_value_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Object(interp.to_object(&ctx.this_value)?))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    fn eval(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_keys_skip_non_enumerable() {
        let result = eval(
            "var o = {a: 1}; Object.defineProperty(o, 'hidden', {value: 2}); \
             Object.keys(o).join() + '|' + o.hidden",
        );
        assert_eq!(result, Value::from("a|2"));
    }

    #[test]
    fn test_define_property_keeps_unspecified_attributes() {
        let result = eval(
            "var o = {x: 1}; Object.defineProperty(o, 'x', {value: 5}); \
             o.x = 9; o.x + ':' + o.propertyIsEnumerable('x')",
        );
        assert_eq!(result, Value::from("9:true"));
    }

    #[test]
    fn test_create_with_null_prototype() {
        let result = eval("var o = Object.create(null); Object.getPrototypeOf(o) === null");
        assert_eq!(result, Value::Boolean(true));
    }

    #[test]
    fn test_to_string_tags() {
        let result = eval(
            "var ts = Object.prototype.toString; \
             [ts.call([]), ts.call(null), ts.call(undefined), ts.call(1)].join()",
        );
        assert_eq!(
            result,
            Value::from("[object Array],[object Null],[object Undefined],[object Number]")
        );
    }

    #[test]
    fn test_assign_and_entries() {
        let result = eval(
            "var t = Object.assign({a: 1}, {b: 2}, null); \
             Object.entries(t).map(function (e) { return e.join('='); }).join('&')",
        );
        assert_eq!(result, Value::from("a=1&b=2"));
    }
}
