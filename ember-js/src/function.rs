//! Call behavior of function objects.

use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDef;
use crate::environment::Environment;
use crate::error::JsResult;
use crate::interpreter::Interpreter;
use crate::object::ObjectRef;
use crate::source::Source;
use crate::value::Value;

/// Host function signature.
pub type NativeFn = fn(&mut Interpreter, &ExecutionContext) -> JsResult<Value>;

/// What happens when a function object is called.
#[derive(Clone)]
pub enum Callable {
    Native(NativeFunction),
    Script(ScriptFunction),
    /// Result of `Function.prototype.bind`.
    Bound(BoundFunction),
}

impl Callable {
    pub fn name(&self) -> String {
        match self {
            Callable::Native(f) => f.name.to_string(),
            Callable::Script(f) => f.definition.name.clone().unwrap_or_default(),
            Callable::Bound(f) => format!("bound {}", f.name),
        }
    }

    /// Declared parameter count, exposed as `length`.
    pub fn length(&self) -> usize {
        match self {
            Callable::Native(f) => f.length,
            Callable::Script(f) => f.definition.params.len(),
            Callable::Bound(f) => f.length,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => write!(f, "Native({})", native.name),
            Callable::Script(script) => write!(f, "Script({:?})", script.definition.name),
            Callable::Bound(bound) => write!(f, "Bound({})", bound.name),
        }
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub length: usize,
    pub func: NativeFn,
}

/// A closure: definition plus the environment it was created in.
#[derive(Clone)]
pub struct ScriptFunction {
    pub definition: Rc<FunctionDef>,
    pub environment: Environment,
    pub source: Rc<Source>,
}

impl ScriptFunction {
    /// Source text of the function definition.
    pub fn source_text(&self) -> &str {
        let span = self.definition.span;
        self.source.text.get(span.start..span.end).unwrap_or("")
    }
}

#[derive(Clone)]
pub struct BoundFunction {
    pub target: ObjectRef,
    pub this_value: Value,
    pub arguments: Vec<Value>,
    pub name: String,
    pub length: usize,
}

/// Per-call record handed to every function invocation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Receiver of the call: the object before `.f()`, the global object
    /// for a bare call, or the fresh instance under `new`.
    pub this_value: Value,
    pub arguments: Vec<Value>,
    /// The function object being invoked.
    pub callee: Option<ObjectRef>,
    /// Invoked through `new`.
    pub is_construct: bool,
}

impl ExecutionContext {
    pub fn new(this_value: Value, arguments: Vec<Value>) -> Self {
        ExecutionContext {
            this_value,
            arguments,
            callee: None,
            is_construct: false,
        }
    }

    /// Argument `index`, or `undefined` when missing.
    pub fn arg(&self, index: usize) -> Value {
        self.arguments.get(index).cloned().unwrap_or_default()
    }

    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }
}
