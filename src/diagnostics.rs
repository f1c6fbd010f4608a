use std::fmt;

use thiserror::Error;

use crate::host::HostException;

/// Represents a byte span within a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn to(self, other: SourceSpan) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// Classification of a front-end diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
}

/// Lexer or parser failure surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
    pub source_label: Option<String>,
    incomplete: bool,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
            source_label: None,
            incomplete: false,
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Marks the diagnostic as raised at end of input; more text may complete the unit.
    pub fn at_end_of_input(mut self) -> Self {
        self.incomplete = true;
        self
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        match (&self.source_label, self.span) {
            (Some(label), Some(span)) => write!(f, " ({label}:{}..{})", span.start, span.end)?,
            (Some(label), None) => write!(f, " ({label})")?,
            (None, Some(span)) => write!(f, " ({}..{})", span.start, span.end)?,
            (None, None) => {}
        }
        if !self.notes.is_empty() {
            writeln!(f)?;
            for note in &self.notes {
                writeln!(f, "  note: {note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

fn write_location(
    f: &mut fmt::Formatter<'_>,
    node: Option<&str>,
    span: Option<SourceSpan>,
    label: Option<&str>,
) -> fmt::Result {
    if let Some(node) = node {
        write!(f, " : at {node}")?;
    }
    match (label, span) {
        (Some(label), Some(span)) => write!(f, " ({label}:{}..{})", span.start, span.end),
        (Some(label), None) => write!(f, " ({label})"),
        (None, Some(span)) => write!(f, " ({}..{})", span.start, span.end),
        (None, None) => Ok(()),
    }
}

/// A script-level semantic fault: unresolved name, wrong arity, illegal
/// assignment target, adapter dispatch failure.
#[derive(Debug, Clone)]
pub struct EvalError {
    pub message: String,
    pub node: Option<String>,
    pub span: Option<SourceSpan>,
    pub source_label: Option<String>,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            node: None,
            span: None,
            source_label: None,
        }
    }

    pub fn at(mut self, span: SourceSpan, node: impl Into<String>) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
            self.node = Some(node.into());
        }
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        write_location(
            f,
            self.node.as_deref(),
            self.span,
            self.source_label.as_deref(),
        )
    }
}

impl std::error::Error for EvalError {}

/// A host exception raised by a method the script called.
#[derive(Debug, Clone)]
pub struct TargetError {
    pub message: String,
    pub node: Option<String>,
    pub span: Option<SourceSpan>,
    pub source_label: Option<String>,
    cause: HostException,
}

impl TargetError {
    pub fn new(message: impl Into<String>, cause: HostException) -> Self {
        Self {
            message: message.into(),
            node: None,
            span: None,
            source_label: None,
            cause,
        }
    }

    pub fn at(mut self, span: SourceSpan, node: impl Into<String>) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
            self.node = Some(node.into());
        }
        self
    }

    /// The exception exactly as the host raised it.
    pub fn cause(&self) -> &HostException {
        &self.cause
    }
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.cause)?;
        write_location(
            f,
            self.node.as_deref(),
            self.span,
            self.source_label.as_deref(),
        )
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.get())
    }
}

/// An internal invariant violation; a defect in the runtime, not the script.
#[derive(Debug, Clone, Error)]
#[error("internal interpreter error: {message}")]
pub struct InterpreterError {
    pub message: String,
}

impl InterpreterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Unified error type for the sprig runtime.
#[derive(Debug, Error)]
pub enum SprigError {
    #[error("{0}")]
    Parse(#[from] Diagnostic),
    #[error("{0}")]
    Eval(#[from] EvalError),
    #[error("{0}")]
    Target(#[from] TargetError),
    #[error("{0}")]
    Interpreter(#[from] InterpreterError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SprigError {
    /// Short label used by the interactive loop's one-line report.
    pub fn classify(&self) -> &'static str {
        match self {
            SprigError::Parse(diag) if diag.kind == DiagnosticKind::Lexer => "Token error",
            SprigError::Parse(_) => "Parser error",
            SprigError::Eval(_) => "Evaluation error",
            SprigError::Target(_) => "Target error",
            SprigError::Interpreter(_) => "Internal error",
            SprigError::Io(_) => "I/O error",
        }
    }

    /// Attaches the originating source label unless a nested source already did.
    pub fn with_source(mut self, label: Option<&str>) -> Self {
        let Some(label) = label else {
            return self;
        };
        let slot = match &mut self {
            SprigError::Parse(diag) => &mut diag.source_label,
            SprigError::Eval(err) => &mut err.source_label,
            SprigError::Target(err) => &mut err.source_label,
            SprigError::Interpreter(_) | SprigError::Io(_) => return self,
        };
        if slot.is_none() {
            *slot = Some(label.to_string());
        }
        self
    }

    /// Attaches a span and node description to evaluation-level errors lacking one.
    pub fn at(self, span: SourceSpan, node: impl Into<String>) -> Self {
        match self {
            SprigError::Eval(err) => SprigError::Eval(err.at(span, node)),
            SprigError::Target(err) => SprigError::Target(err.at(span, node)),
            other => other,
        }
    }

    pub fn source_label(&self) -> Option<&str> {
        match self {
            SprigError::Parse(diag) => diag.source_label.as_deref(),
            SprigError::Eval(err) => err.source_label.as_deref(),
            SprigError::Target(err) => err.source_label.as_deref(),
            SprigError::Interpreter(_) | SprigError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SprigError>;
