//! Error types for every stage of the engine.

use thiserror::Error;

use crate::source::SourceInfo;
use crate::value::Value;

/// Result type for evaluation.
pub type JsResult<T> = Result<T, JsError>;

/// What went wrong while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid numeric literal: {0}")]
    InvalidNumber(String),
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// Lexical error with the position of the offending character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SyntaxError: {kind} ({at})")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub at: SourceInfo,
}

/// Syntax error. Variants name the construct the parser expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("SyntaxError: expected {expected} but found {found} ({at})")]
    Expected {
        expected: String,
        found: String,
        at: SourceInfo,
    },
    #[error("SyntaxError: expected an expression but found {found} ({at})")]
    ExpectedExpression { found: String, at: SourceInfo },
    #[error("SyntaxError: expected an identifier but found {found} ({at})")]
    ExpectedIdentifier { found: String, at: SourceInfo },
    #[error("SyntaxError: expected a property name but found {found} ({at})")]
    ExpectedPropertyName { found: String, at: SourceInfo },
    #[error("SyntaxError: invalid assignment target ({at})")]
    InvalidAssignmentTarget { at: SourceInfo },
    #[error("SyntaxError: missing initializer in const declaration ({at})")]
    MissingInitializer { at: SourceInfo },
    #[error("SyntaxError: illegal {keyword} statement ({at})")]
    IllegalStatement { keyword: String, at: SourceInfo },
    #[error("SyntaxError: nesting exceeds {limit} levels ({at})")]
    NestingTooDeep { limit: usize, at: SourceInfo },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// Location of the offending token.
    pub fn source_info(&self) -> &SourceInfo {
        match self {
            ParseError::Expected { at, .. }
            | ParseError::ExpectedExpression { at, .. }
            | ParseError::ExpectedIdentifier { at, .. }
            | ParseError::ExpectedPropertyName { at, .. }
            | ParseError::InvalidAssignmentTarget { at }
            | ParseError::MissingInitializer { at }
            | ParseError::IllegalStatement { at, .. }
            | ParseError::NestingTooDeep { at, .. } => at,
            ParseError::Lex(err) => &err.at,
        }
    }
}

/// Runtime error raised during evaluation.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("ReferenceError: {message}")]
    Reference {
        message: String,
        at: Option<SourceInfo>,
    },
    #[error("TypeError: {message}")]
    Type {
        message: String,
        at: Option<SourceInfo>,
    },
    #[error("RangeError: {message}")]
    Range {
        message: String,
        at: Option<SourceInfo>,
    },
    #[error("SyntaxError: {message}")]
    Syntax {
        message: String,
        at: Option<SourceInfo>,
    },
    /// Error raised by a host function under an arbitrary constructor name.
    #[error("{name}: {message}")]
    Native {
        name: String,
        message: String,
        at: Option<SourceInfo>,
    },
    /// A value thrown by script code.
    #[error("Uncaught {value}")]
    Thrown {
        value: Value,
        at: Option<SourceInfo>,
    },
    /// Evaluation was stopped by a debugger.
    #[error("execution terminated by debugger")]
    Terminated,
}

impl JsError {
    pub fn reference(msg: impl Into<String>) -> Self {
        JsError::Reference {
            message: msg.into(),
            at: None,
        }
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        JsError::Type {
            message: msg.into(),
            at: None,
        }
    }

    pub fn range(msg: impl Into<String>) -> Self {
        JsError::Range {
            message: msg.into(),
            at: None,
        }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        JsError::Syntax {
            message: msg.into(),
            at: None,
        }
    }

    pub fn native(name: impl Into<String>, msg: impl Into<String>) -> Self {
        JsError::Native {
            name: name.into(),
            message: msg.into(),
            at: None,
        }
    }

    pub fn thrown(value: Value) -> Self {
        JsError::Thrown { value, at: None }
    }

    /// Constructor name the error materialises as.
    pub fn name(&self) -> &str {
        match self {
            JsError::Reference { .. } => "ReferenceError",
            JsError::Type { .. } => "TypeError",
            JsError::Range { .. } => "RangeError",
            JsError::Syntax { .. } => "SyntaxError",
            JsError::Native { name, .. } => name,
            JsError::Thrown { .. } => "Error",
            JsError::Terminated => "Terminated",
        }
    }

    /// Message text, empty for thrown values.
    pub fn message(&self) -> &str {
        match self {
            JsError::Reference { message, .. }
            | JsError::Type { message, .. }
            | JsError::Range { message, .. }
            | JsError::Syntax { message, .. }
            | JsError::Native { message, .. } => message,
            JsError::Thrown { .. } | JsError::Terminated => "",
        }
    }

    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            JsError::Reference { at, .. }
            | JsError::Type { at, .. }
            | JsError::Range { at, .. }
            | JsError::Syntax { at, .. }
            | JsError::Native { at, .. }
            | JsError::Thrown { at, .. } => at.as_ref(),
            JsError::Terminated => None,
        }
    }

    /// Attach a location unless one is already recorded.
    pub fn or_at(mut self, info: impl FnOnce() -> SourceInfo) -> Self {
        match &mut self {
            JsError::Reference { at, .. }
            | JsError::Type { at, .. }
            | JsError::Range { at, .. }
            | JsError::Syntax { at, .. }
            | JsError::Native { at, .. }
            | JsError::Thrown { at, .. } => {
                if at.is_none() {
                    *at = Some(info());
                }
            }
            JsError::Terminated => {}
        }
        self
    }
}

/// Uncaught exception reported at the top level.
#[derive(Debug, Clone, Error)]
#[error("Uncaught {}", headline(.name, .message))]
pub struct ThrownError {
    pub name: String,
    pub message: String,
    /// The thrown value itself (an Error object for engine errors).
    pub value: Value,
    pub source_info: Option<SourceInfo>,
}

fn headline(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{}: {}", name, message),
    }
}

/// Failure of a whole script run.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Thrown(#[from] ThrownError),
}

impl ScriptError {
    pub fn source_info(&self) -> Option<&SourceInfo> {
        match self {
            ScriptError::Parse(err) => Some(err.source_info()),
            ScriptError::Thrown(err) => err.source_info.as_ref(),
        }
    }
}
