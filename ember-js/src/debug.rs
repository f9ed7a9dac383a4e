//! Observer interface for debuggers.
//!
//! The interpreter reports parse, statement, exception and console events
//! to an installed [`DebugHook`]. A hook that wants to pause simply does
//! not return from `before_statement` until it is told to continue.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::environment::{Environment, ScopeSnapshot};
use crate::error::ThrownError;
use crate::source::{Source, SourceInfo, Span};
use crate::value::Value;

/// What the interpreter should do after a hook callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugAction {
    #[default]
    Continue,
    /// Stop evaluation with [`JsError::Terminated`](crate::JsError::Terminated).
    Abort,
}

/// Console method a message was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
}

/// A script about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: String,
    pub line_count: usize,
    /// Length of the text in bytes.
    pub length: usize,
}

/// A function activation: the function's name and where it currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub function_name: String,
    pub location: SourceInfo,
}

/// Name shown for top-level code in stack traces.
pub const GLOBAL_FRAME: &str = "(global)";

/// Interpreter-side record of a call in progress. Locations are resolved
/// only when a debugger asks for them.
#[derive(Debug, Clone)]
pub(crate) struct ActiveCall {
    pub(crate) function_name: String,
    pub(crate) source: Rc<Source>,
    /// Span of the call expression.
    pub(crate) call_site: Span,
}

/// Execution state handed to hook callbacks.
pub struct DebugFrame<'a> {
    /// Position of the statement about to run.
    pub location: SourceInfo,
    /// Number of active function calls.
    pub call_depth: usize,
    /// Active calls, outermost first.
    pub(crate) calls: &'a [ActiveCall],
    pub(crate) environment: &'a Environment,
}

impl<'a> DebugFrame<'a> {
    /// Frames innermost first, starting at the current location.
    pub fn stack_trace(&self) -> Vec<CallFrame> {
        let mut frames = Vec::with_capacity(self.calls.len() + 1);
        let mut location = self.location.clone();
        for call in self.calls.iter().rev() {
            frames.push(CallFrame {
                function_name: call.function_name.clone(),
                location,
            });
            location = call.source.info(call.call_site);
        }
        frames.push(CallFrame {
            function_name: GLOBAL_FRAME.to_string(),
            location,
        });
        frames
    }

    /// Variables of every scope on the chain, innermost first.
    pub fn scopes(&self) -> Vec<ScopeSnapshot> {
        self.environment.snapshot()
    }

    /// Flattened variable list; inner bindings hide outer ones.
    pub fn variables(&self) -> Vec<(String, Value)> {
        let mut seen = hashbrown::HashSet::new();
        self.scopes()
            .into_iter()
            .flat_map(|scope| scope.variables)
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect()
    }
}

/// Observer of script execution. Every method defaults to a no-op.
pub trait DebugHook {
    fn script_parsed(&mut self, _script: &ScriptInfo) {}

    /// Called before every statement runs.
    fn before_statement(&mut self, _frame: &DebugFrame<'_>) -> DebugAction {
        DebugAction::Continue
    }

    /// A `debugger;` statement was reached.
    fn debugger_statement(&mut self, _frame: &DebugFrame<'_>) -> DebugAction {
        DebugAction::Continue
    }

    /// An exception started unwinding. `caught` is true when a `try` with a
    /// `catch` clause is active.
    fn exception_thrown(
        &mut self,
        _error: &ThrownError,
        _caught: bool,
        _frame: &DebugFrame<'_>,
    ) -> DebugAction {
        DebugAction::Continue
    }

    fn console_message(&mut self, _level: ConsoleLevel, _text: &str) {}

    fn script_finished(&mut self, _result: Result<&Value, &ThrownError>) {}
}
