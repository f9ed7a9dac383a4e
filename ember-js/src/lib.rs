//! Ember script engine
//!
//! A small tree-walking interpreter for the JavaScript subset the Ember
//! browser needs: `var`/`let`/`const`, functions and closures, prototype
//! objects, exceptions, and a native builtin library.
//!
//! # Architecture
//!
//! - `lexer`: source text to tokens
//! - `parser`: tokens to an AST (`ast`)
//! - `interpreter`: evaluation, with lexical scopes from `environment`
//! - `value`, `object`, `function`: the runtime data model
//! - `coerce`: type conversion rules
//! - `builtin`: Object, Function, Number, Boolean, String, Array, Date,
//!   Math, JSON, the Error family and `console`
//! - `debug`: the hook a debugger implements to observe execution
//! - `config`: engine tunables, loadable from TOML
//!
//! # Usage
//!
//! ```
//! use ember_js::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! let result = interp.run("var sq = function (x) { return x * x; }; sq(7)").unwrap();
//! assert_eq!(result, Value::from(49));
//! ```

pub mod ast;
pub mod builtin;
pub mod coerce;
pub mod config;
pub mod debug;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod source;
mod stack;
pub mod token;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use debug::{
    CallFrame, ConsoleLevel, ConsoleMessage, DebugAction, DebugFrame, DebugHook, ScriptInfo,
};
pub use environment::{Environment, ScopeKind, ScopeSnapshot};
pub use error::{JsError, JsResult, LexError, ParseError, ScriptError, ThrownError};
pub use function::{ExecutionContext, NativeFn};
pub use interpreter::Interpreter;
pub use object::{ObjectKind, ObjectRef};
pub use source::{Source, SourceInfo, Span};
pub use value::Value;

/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Evaluate a script in a fresh interpreter.
pub fn eval(source: &str) -> Result<Value, ScriptError> {
    Interpreter::new().run(source)
}
