// ABOUTME: Error types for scanning/parsing, evaluation, and the host embedding API

use std::fmt;
use thiserror::Error;

/// A scan or parse failure.
///
/// `Display` renders the stable, test-facing string `"Parse error"`; use
/// `detail()` for the line/column-qualified long form a CLI would print.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn detail(&self) -> String {
        format!("Parse error at {}:{}: {}", self.line, self.column, self.message)
    }
}

/// A failure raised while evaluating a parsed program. Each variant's
/// `Display` is the exact stable string the host and tests match on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),

    #[error("type {type_name} does not support member operation")]
    NoMemberOperation { type_name: String },

    #[error("type {type_name} does not support index operation")]
    NoIndexOperation { type_name: String },

    #[error("type {type_name} does not support index operation for assignment")]
    NoIndexAssignOperation { type_name: String },

    #[error("type {type_name} does not support slice operation")]
    NoSliceOperation { type_name: String },

    #[error("type {type_name} does not support slice operation for assignment")]
    NoSliceAssignOperation { type_name: String },

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("invalid slice index")]
    InvalidSliceIndex,

    #[error("for cannot loop over type {0}")]
    ForLoopUnsupportedType(String),

    #[error("invalid type for make")]
    InvalidMake,

    #[error("{name} is not callable")]
    NotCallable { name: String },

    #[error("function {name} expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("Unexpected break statement")]
    BreakOutsideLoop,

    #[error("Unexpected continue statement")]
    ContinueOutsideLoop,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Execution interrupted")]
    Interrupted,

    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    pub fn undefined_symbol(name: impl Into<String>) -> Self {
        RuntimeError::UndefinedSymbol(name.into())
    }

    pub fn no_member_operation(type_name: impl Into<String>) -> Self {
        RuntimeError::NoMemberOperation {
            type_name: type_name.into(),
        }
    }

    pub fn no_index_operation(type_name: impl Into<String>) -> Self {
        RuntimeError::NoIndexOperation {
            type_name: type_name.into(),
        }
    }

    pub fn no_index_assign_operation(type_name: impl Into<String>) -> Self {
        RuntimeError::NoIndexAssignOperation {
            type_name: type_name.into(),
        }
    }

    pub fn no_slice_operation(type_name: impl Into<String>) -> Self {
        RuntimeError::NoSliceOperation {
            type_name: type_name.into(),
        }
    }

    pub fn no_slice_assign_operation(type_name: impl Into<String>) -> Self {
        RuntimeError::NoSliceAssignOperation {
            type_name: type_name.into(),
        }
    }

    pub fn not_callable(name: impl Into<String>) -> Self {
        RuntimeError::NotCallable { name: name.into() }
    }

    pub fn arity_mismatch(name: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        RuntimeError::ArityMismatch {
            name: name.into(),
            expected: expected.into(),
            actual,
        }
    }
}

/// A failure raised by the host embedding API surface (`Env::define`,
/// `Env::get`, `Env::define_type`, ...), as distinct from failures that
/// occur while a running script is being evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("symbol '{0}' is not defined")]
    NotFound(String),

    #[error("'{0}' is already defined")]
    AlreadyDefined(String),

    #[error("type '{0}' is already defined")]
    TypeAlreadyDefined(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Any of the three error families, for call sites that need to report a
/// single uniform failure (e.g. the CLI boundary).
#[derive(Debug, Clone)]
pub enum EmberError {
    Parse(ParseError),
    Runtime(RuntimeError),
    Host(HostError),
}

impl fmt::Display for EmberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmberError::Parse(e) => write!(f, "{}", e.detail()),
            EmberError::Runtime(e) => write!(f, "{}", e),
            EmberError::Host(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EmberError {}

impl From<ParseError> for EmberError {
    fn from(e: ParseError) -> Self {
        EmberError::Parse(e)
    }
}

impl From<RuntimeError> for EmberError {
    fn from(e: RuntimeError) -> Self {
        EmberError::Runtime(e)
    }
}

impl From<HostError> for EmberError {
    fn from(e: HostError) -> Self {
        EmberError::Host(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_is_the_stable_string() {
        let err = ParseError::new(2, 5, "unexpected character ','");
        assert_eq!(format!("{}", err), "Parse error");
        assert_eq!(err.detail(), "Parse error at 2:5: unexpected character ','");
    }

    #[test]
    fn test_runtime_error_messages_are_stable() {
        assert_eq!(
            format!("{}", RuntimeError::no_member_operation("int32")),
            "type int32 does not support member operation"
        );
        assert_eq!(format!("{}", RuntimeError::IndexOutOfRange), "index out of range");
        assert_eq!(format!("{}", RuntimeError::InvalidSliceIndex), "invalid slice index");
        assert_eq!(format!("{}", RuntimeError::Interrupted), "Execution interrupted");
        assert_eq!(format!("{}", RuntimeError::InvalidMake), "invalid type for make");
        assert_eq!(format!("{}", RuntimeError::BreakOutsideLoop), "Unexpected break statement");
        assert_eq!(
            format!("{}", RuntimeError::ContinueOutsideLoop),
            "Unexpected continue statement"
        );
        assert_eq!(
            format!("{}", RuntimeError::ForLoopUnsupportedType("bool".to_string())),
            "for cannot loop over type bool"
        );
    }

    #[test]
    fn test_host_error_wraps_runtime_error() {
        let host: HostError = RuntimeError::undefined_symbol("x").into();
        assert_eq!(format!("{}", host), "undefined symbol 'x'");
    }
}
