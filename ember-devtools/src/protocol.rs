//! Debug protocol messages and their JSON codec.
//!
//! Every message travels as one JSON object whose `type` field names the
//! variant; the remaining fields are the variant's own, in camelCase:
//!
//! ```json
//! {"type": "setBreakpoint", "line": 12}
//! {"type": "paused", "reason": "breakpoint", "location": {...}, "callStack": [...], "hitBreakpoints": [1]}
//! ```
//!
//! Decoding looks the tag up in the [`MessageRegistry`]. Unknown tags are
//! an error, never skipped.

use std::collections::BTreeMap;
use std::fmt;

use ember_js::{CallFrame, ConsoleLevel, SourceInfo};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use thiserror::Error;

/// Version announced in the `hello` event.
pub const PROTOCOL_VERSION: u32 = 1;

/// Name of the discriminator field.
pub const TYPE_FIELD: &str = "type";

/// Breakpoint ID.
pub type BreakpointId = u32;

/// Script ID, assigned per parsed script.
pub type ScriptId = u32;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no \"type\" field")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownSubtype(String),

    #[error("invalid fields for '{type_name}': {source}")]
    InvalidFields {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ── Shared payload types ─────────────────────────────────────────────

/// A position in a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub url: String,
    pub line: usize,
    pub column: usize,
}

impl From<&SourceInfo> for Location {
    fn from(info: &SourceInfo) -> Self {
        Location {
            url: info.filename.clone(),
            line: info.line,
            column: info.column,
        }
    }
}

/// One frame of a paused call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub function_name: String,
    pub location: Location,
}

impl From<&CallFrame> for StackFrame {
    fn from(frame: &CallFrame) -> Self {
        StackFrame {
            function_name: frame.function_name.clone(),
            location: Location::from(&frame.location),
        }
    }
}

/// A variable visible at the paused statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    /// `typeof` of the value.
    #[serde(rename = "type")]
    pub kind: String,
    /// Developer-facing rendering, as `console.log` prints it.
    pub value: String,
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    Breakpoint,
    Step,
    DebuggerStatement,
    Exception,
    PauseRequest,
    Entry,
}

/// Which exceptions pause execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseOnExceptions {
    #[default]
    None,
    Uncaught,
    All,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpoint {
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpoint {
    pub id: BreakpointId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseOnExceptions {
    pub mode: PauseOnExceptions,
}

// ── Events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub protocol_version: u32,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsed {
    pub script_id: ScriptId,
    pub url: String,
    pub line_count: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointSet {
    pub id: BreakpointId,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointRemoved {
    pub id: BreakpointId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paused {
    pub reason: PauseReason,
    pub location: Location,
    pub call_stack: Vec<StackFrame>,
    #[serde(default)]
    pub hit_breakpoints: Vec<BreakpointId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeVariables {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrown {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub caught: bool,
}

/// End of a script run: `result` on completion, `error` when it threw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionFinished {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolError {
    pub message: String,
}

// ── Message ──────────────────────────────────────────────────────────

/// Every message of the protocol, commands and events alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Commands (client to engine)
    SetBreakpoint(SetBreakpoint),
    RemoveBreakpoint(RemoveBreakpoint),
    Resume,
    Pause,
    StepInto,
    StepOver,
    StepOut,
    SetPauseOnExceptions(SetPauseOnExceptions),
    GetScope,
    Terminate,

    // Events (engine to client)
    Hello(Hello),
    ScriptParsed(ScriptParsed),
    BreakpointSet(BreakpointSet),
    BreakpointRemoved(BreakpointRemoved),
    Paused(Paused),
    Resumed,
    Scope(ScopeVariables),
    ConsoleMessage(ConsoleEntry),
    ExceptionThrown(ExceptionThrown),
    ExecutionFinished(ExecutionFinished),
    ProtocolError(ProtocolError),
}

impl Message {
    /// Discriminator written to the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::SetBreakpoint(_) => "setBreakpoint",
            Message::RemoveBreakpoint(_) => "removeBreakpoint",
            Message::Resume => "resume",
            Message::Pause => "pause",
            Message::StepInto => "stepInto",
            Message::StepOver => "stepOver",
            Message::StepOut => "stepOut",
            Message::SetPauseOnExceptions(_) => "setPauseOnExceptions",
            Message::GetScope => "getScope",
            Message::Terminate => "terminate",
            Message::Hello(_) => "hello",
            Message::ScriptParsed(_) => "scriptParsed",
            Message::BreakpointSet(_) => "breakpointSet",
            Message::BreakpointRemoved(_) => "breakpointRemoved",
            Message::Paused(_) => "paused",
            Message::Resumed => "resumed",
            Message::Scope(_) => "scope",
            Message::ConsoleMessage(_) => "consoleMessage",
            Message::ExceptionThrown(_) => "exceptionThrown",
            Message::ExecutionFinished(_) => "executionFinished",
            Message::ProtocolError(_) => "protocolError",
        }
    }

    /// Whether a client sends this message (as opposed to the engine).
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Message::SetBreakpoint(_)
                | Message::RemoveBreakpoint(_)
                | Message::Resume
                | Message::Pause
                | Message::StepInto
                | Message::StepOver
                | Message::StepOut
                | Message::SetPauseOnExceptions(_)
                | Message::GetScope
                | Message::Terminate
        )
    }

    /// Shorthand for a `protocolError` event.
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Message::ProtocolError(ProtocolError {
            message: message.into(),
        })
    }

    /// Encode as a JSON object with the tag first.
    pub fn to_json(&self) -> Result<serde_json::Value, CodecError> {
        let fields = match self {
            Message::SetBreakpoint(m) => serde_json::to_value(m)?,
            Message::RemoveBreakpoint(m) => serde_json::to_value(m)?,
            Message::SetPauseOnExceptions(m) => serde_json::to_value(m)?,
            Message::Hello(m) => serde_json::to_value(m)?,
            Message::ScriptParsed(m) => serde_json::to_value(m)?,
            Message::BreakpointSet(m) => serde_json::to_value(m)?,
            Message::BreakpointRemoved(m) => serde_json::to_value(m)?,
            Message::Paused(m) => serde_json::to_value(m)?,
            Message::Scope(m) => serde_json::to_value(m)?,
            Message::ConsoleMessage(m) => serde_json::to_value(m)?,
            Message::ExceptionThrown(m) => serde_json::to_value(m)?,
            Message::ExecutionFinished(m) => serde_json::to_value(m)?,
            Message::ProtocolError(m) => serde_json::to_value(m)?,
            Message::Resume
            | Message::Pause
            | Message::StepInto
            | Message::StepOver
            | Message::StepOut
            | Message::GetScope
            | Message::Terminate
            | Message::Resumed => serde_json::Value::Object(Map::new()),
        };

        let mut object = Map::new();
        object.insert(
            TYPE_FIELD.to_string(),
            serde_json::Value::String(self.type_name().to_string()),
        );
        if let serde_json::Value::Object(fields) = fields {
            object.extend(fields);
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Encode as a single line of JSON text.
    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }

    /// Decode JSON text.
    pub fn decode(text: &str) -> Result<Message, CodecError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(json)
    }

    /// Decode an already parsed JSON value.
    pub fn from_json(json: serde_json::Value) -> Result<Message, CodecError> {
        let serde_json::Value::Object(mut fields) = json else {
            return Err(CodecError::NotAnObject);
        };
        let type_name = match fields.remove(TYPE_FIELD) {
            Some(serde_json::Value::String(name)) => name,
            _ => return Err(CodecError::MissingType),
        };
        MessageRegistry::global().decode(&type_name, fields)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Builds a message from the fields left after removing the tag.
pub type DecodeFn = fn(Map<String, serde_json::Value>) -> Result<Message, serde_json::Error>;

/// Discriminator to decoder table.
pub struct MessageRegistry {
    decoders: BTreeMap<&'static str, DecodeFn>,
}

/// Built on first use.
static REGISTRY: spin::Once<MessageRegistry> = spin::Once::new();

/// Deserialize a payload struct from the remaining fields.
fn fields<T: serde::de::DeserializeOwned>(
    fields: Map<String, serde_json::Value>,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(fields))
}

impl MessageRegistry {
    /// The registry of every protocol message.
    pub fn global() -> &'static MessageRegistry {
        REGISTRY.call_once(MessageRegistry::build)
    }

    fn build() -> Self {
        let mut registry = MessageRegistry {
            decoders: BTreeMap::new(),
        };

        // Commands
        registry.register("setBreakpoint", |f| fields(f).map(Message::SetBreakpoint));
        registry.register("removeBreakpoint", |f| fields(f).map(Message::RemoveBreakpoint));
        registry.register("resume", |_| Ok(Message::Resume));
        registry.register("pause", |_| Ok(Message::Pause));
        registry.register("stepInto", |_| Ok(Message::StepInto));
        registry.register("stepOver", |_| Ok(Message::StepOver));
        registry.register("stepOut", |_| Ok(Message::StepOut));
        registry.register("setPauseOnExceptions", |f| {
            fields(f).map(Message::SetPauseOnExceptions)
        });
        registry.register("getScope", |_| Ok(Message::GetScope));
        registry.register("terminate", |_| Ok(Message::Terminate));

        // Events
        registry.register("hello", |f| fields(f).map(Message::Hello));
        registry.register("scriptParsed", |f| fields(f).map(Message::ScriptParsed));
        registry.register("breakpointSet", |f| fields(f).map(Message::BreakpointSet));
        registry.register("breakpointRemoved", |f| fields(f).map(Message::BreakpointRemoved));
        registry.register("paused", |f| fields(f).map(Message::Paused));
        registry.register("resumed", |_| Ok(Message::Resumed));
        registry.register("scope", |f| fields(f).map(Message::Scope));
        registry.register("consoleMessage", |f| fields(f).map(Message::ConsoleMessage));
        registry.register("exceptionThrown", |f| fields(f).map(Message::ExceptionThrown));
        registry.register("executionFinished", |f| fields(f).map(Message::ExecutionFinished));
        registry.register("protocolError", |f| fields(f).map(Message::ProtocolError));

        registry
    }

    fn register(&mut self, type_name: &'static str, decode: DecodeFn) {
        self.decoders.insert(type_name, decode);
    }

    /// Registered discriminators, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Decode the fields of a message tagged `type_name`.
    pub fn decode(
        &self,
        type_name: &str,
        fields: Map<String, serde_json::Value>,
    ) -> Result<Message, CodecError> {
        let Some((&registered, decode)) = self.decoders.get_key_value(type_name) else {
            return Err(CodecError::UnknownSubtype(type_name.to_string()));
        };
        decode(fields).map_err(|source| CodecError::InvalidFields {
            type_name: registered,
            source,
        })
    }
}
