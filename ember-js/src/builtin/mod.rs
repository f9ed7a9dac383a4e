//! Native builtin library.
//!
//! Each submodule installs one constructor/prototype pair (or namespace
//! object) into the global object. Prototypes are created up front in
//! [`Intrinsics`] so that values made before a module's `init` runs, such
//! as function objects, already inherit from the right place.

pub mod array;
pub mod boolean;
pub mod date;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use crate::error::{JsError, JsResult};
use crate::function::{Callable, ExecutionContext, NativeFn, NativeFunction};
use crate::interpreter::Interpreter;
use crate::object::{JsObject, ObjectKind, ObjectRef, PropertyDescriptor};
use crate::value::Value;

/// Names of the error constructors besides `Error` itself.
pub const NATIVE_ERRORS: [&str; 4] = ["TypeError", "RangeError", "ReferenceError", "SyntaxError"];

/// Prototype objects the engine needs direct access to.
pub struct Intrinsics {
    pub object_prototype: ObjectRef,
    pub function_prototype: ObjectRef,
    pub array_prototype: ObjectRef,
    pub string_prototype: ObjectRef,
    pub number_prototype: ObjectRef,
    pub boolean_prototype: ObjectRef,
    pub date_prototype: ObjectRef,
    pub error_prototype: ObjectRef,
    native_error_prototypes: Vec<(&'static str, ObjectRef)>,
}

impl Intrinsics {
    pub fn new() -> Self {
        let object_prototype = ObjectRef::new(JsObject::new(None));
        let derived = || ObjectRef::new(JsObject::new(Some(object_prototype.clone())));

        // Function.prototype is itself callable and returns undefined.
        let function_prototype = ObjectRef::new(JsObject::with_kind(
            ObjectKind::Function(Callable::Native(NativeFunction {
                name: "",
                length: 0,
                func: empty_function,
            })),
            Some(object_prototype.clone()),
        ));

        let error_prototype = derived();
        let native_error_prototypes = NATIVE_ERRORS
            .iter()
            .map(|&name| {
                let proto = ObjectRef::new(JsObject::new(Some(error_prototype.clone())));
                (name, proto)
            })
            .collect();

        Intrinsics {
            function_prototype,
            array_prototype: derived(),
            string_prototype: derived(),
            number_prototype: derived(),
            boolean_prototype: derived(),
            date_prototype: derived(),
            error_prototype,
            native_error_prototypes,
            object_prototype,
        }
    }

    /// Prototype used for errors of the named constructor. Unknown names
    /// fall back to `Error.prototype`.
    pub fn error_prototype_for(&self, name: &str) -> &ObjectRef {
        self.native_error_prototypes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, proto)| proto)
            .unwrap_or(&self.error_prototype)
    }
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_function(_interp: &mut Interpreter, _ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Undefined)
}

/// Install every builtin into the interpreter's global object.
pub fn init(interp: &mut Interpreter) {
    object::init(interp);
    function::init(interp);
    error::init(interp);
    number::init(interp);
    boolean::init(interp);
    string::init(interp);
    array::init(interp);
    date::init(interp);
    math::init(interp);
    json::init(interp);
    global::init(interp);
}

// ── Installation helpers ─────────────────────────────────────────────

/// Create a native function object.
pub fn native_function(
    interp: &Interpreter,
    name: &'static str,
    length: usize,
    func: NativeFn,
) -> ObjectRef {
    interp.create_function(Callable::Native(NativeFunction { name, length, func }))
}

/// Install a non-enumerable method on `target`.
pub fn define_method(
    interp: &Interpreter,
    target: &ObjectRef,
    name: &'static str,
    length: usize,
    func: NativeFn,
) {
    let function = native_function(interp, name, length, func);
    target.define(name, Value::Object(function), false);
}

/// Install a read-only, non-enumerable constant.
pub fn define_constant(target: &ObjectRef, name: &str, value: Value) {
    target
        .borrow_mut()
        .define_property(name, PropertyDescriptor::data(value, false, false));
}

/// Create a constructor wired to `prototype` and expose it as a global.
pub fn define_constructor(
    interp: &Interpreter,
    name: &'static str,
    length: usize,
    func: NativeFn,
    prototype: &ObjectRef,
) -> ObjectRef {
    let constructor = native_function(interp, name, length, func);
    define_constant(&constructor, "prototype", Value::Object(prototype.clone()));
    prototype.define("constructor", Value::Object(constructor.clone()), false);
    interp
        .global_object()
        .define(name, Value::Object(constructor.clone()), false);
    constructor
}

/// The instance under construction when a dual-mode constructor runs
/// through `new`: `this` is a fresh ordinary object inheriting directly
/// from the constructor's prototype. `None` for a plain call.
pub fn construct_target<'a>(ctx: &'a ExecutionContext, prototype: &ObjectRef) -> Option<&'a ObjectRef> {
    let this = ctx.this_value.as_object()?;
    let fresh = {
        let obj = this.borrow();
        matches!(obj.kind, ObjectKind::Ordinary)
            && obj.prototype().map_or(false, |p| p.ptr_eq(prototype))
    };
    fresh.then_some(this)
}

/// Turn the fresh instance of a dual-mode constructor into a wrapper.
pub fn into_wrapper(target: &ObjectRef, kind: ObjectKind) -> Value {
    target.borrow_mut().kind = kind;
    Value::Object(target.clone())
}

/// The callback argument of an iteration method.
pub fn callback_arg(ctx: &ExecutionContext, index: usize) -> JsResult<Value> {
    let callback = ctx.arg(index);
    if callback.is_function() {
        Ok(callback)
    } else {
        Err(JsError::type_error(format!("{} is not a function", describe(&callback))))
    }
}

/// Short description of a value for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(obj) if obj.is_callable() => "function".to_string(),
        Value::Object(obj) if obj.is_array() => "array".to_string(),
        Value::Object(_) => "#<Object>".to_string(),
        other => other.to_string(),
    }
}

/// Integer argument with a default, truncated toward zero.
pub fn integer_arg(interp: &mut Interpreter, ctx: &ExecutionContext, index: usize, default: f64) -> JsResult<f64> {
    match ctx.arg(index) {
        Value::Undefined => Ok(default),
        value => Ok(crate::coerce::to_integer(interp.to_number(&value)?)),
    }
}

/// Resolve a relative index (negative counts from the end) against `len`.
pub fn relative_index(index: f64, len: usize) -> usize {
    let len = len as f64;
    let resolved = if index < 0.0 { (len + index).max(0.0) } else { index.min(len) };
    resolved as usize
}
