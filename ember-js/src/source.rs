//! Source text and positions.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

/// Name given to scripts run without a filename.
pub const ANONYMOUS: &str = "<anonymous>";

/// Source location of a token or syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset.
    pub end: usize,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based, counted in characters).
    pub column: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through `other`. Keeps the start position of `self`.
    pub fn to(self, other: Span) -> Self {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// A named piece of script text.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Rc<Self> {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Number of lines in the text. An empty text still has one line.
    pub fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }

    /// Text of a 1-based line, without its terminator.
    pub fn line_text(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|idx| self.text.lines().nth(idx))
            .unwrap_or("")
    }

    /// Resolve a span into a self-contained location record.
    pub fn info(&self, span: Span) -> SourceInfo {
        SourceInfo {
            line: span.line,
            column: span.column,
            filename: self.name.clone(),
            source_text: self.line_text(span.line).to_string(),
        }
    }
}

/// Location attached to errors: position plus the offending source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub line: usize,
    pub column: usize,
    pub filename: String,
    pub source_text: String,
}

impl SourceInfo {
    /// Two-line excerpt with a caret under the column.
    pub fn excerpt(&self) -> String {
        let pad = self.column.saturating_sub(1);
        format!("{}\n{}^", self.source_text, " ".repeat(pad))
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}
