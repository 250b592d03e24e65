//! Error types for expression evaluation.

use crate::span::SourceSpan;
use crate::value::CoercionError;
use std::fmt;
use thiserror::Error;

/// Category of an evaluation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value could not be coerced to the kind an operator requires
    TypeMismatch,
    /// An identifier is not present in the runtime
    MissingAttribute,
    /// Integer division or remainder by zero
    DivisionByZero,
    /// Wrong argument count or an argument outside a function's domain
    InvalidArgument,
    /// A function name the runtime does not know
    UnknownFunction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::MissingAttribute => "MISSING_ATTRIBUTE",
            ErrorKind::DivisionByZero => "DIVISION_BY_ZERO",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::UnknownFunction => "UNKNOWN_FUNCTION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first failure of an evaluation, located at the node that raised it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {span} `{}`: {message}", .span.text())]
pub struct EvaluationError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: SourceSpan,
}

impl EvaluationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: &SourceSpan) -> Self {
        Self {
            kind,
            message: message.into(),
            span: span.clone(),
        }
    }

    pub fn type_mismatch(err: CoercionError, context: &str, span: &SourceSpan) -> Self {
        Self::new(ErrorKind::TypeMismatch, format!("{}: {}", context, err), span)
    }

    pub fn missing_attribute(name: &str, span: &SourceSpan) -> Self {
        Self::new(
            ErrorKind::MissingAttribute,
            format!("attribute '{}' is not present", name),
            span,
        )
    }
}

/// Failure reported by a function implementation.
///
/// The evaluator attaches the span of the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FunctionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FunctionError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::TypeMismatch,
            message: message.into(),
        }
    }
}

impl From<CoercionError> for FunctionError {
    fn from(err: CoercionError) -> Self {
        Self::type_mismatch(err.to_string())
    }
}

/// Result type for expression evaluation
pub type EvaluationResult<T> = Result<T, EvaluationError>;
