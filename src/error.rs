//! Error types shared by the instrumentation pipeline and the interpreter.
//!
//! The `Display` text of [`ScriptError`] is exactly what the driver prints
//! after the `Error: ` marker.

use std::io;

/// A failure raised while parsing or executing an instrumented script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Lexing, indentation or grammar error. `line` is the original source line.
    #[error("{message} (<string>, line {line})")]
    Syntax { message: String, line: usize },

    #[error("name '{0}' is not defined")]
    Name(String),

    #[error("{0}")]
    Index(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Value(String),

    #[error("{0}")]
    ZeroDivision(String),

    #[error("{0}")]
    Attribute(String),

    #[error("maximum recursion depth exceeded")]
    Recursion,

    #[error("integer overflow")]
    Overflow,

    /// A sequence of this many items would be built.
    #[error("cannot build a sequence of {0} items")]
    Memory(usize),

    #[error("execution timed out after {0} seconds")]
    Timeout(u64),

    /// Writing program output or a state line failed.
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

impl ScriptError {
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        ScriptError::Syntax {
            message: message.into(),
            line,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ScriptError::Type(message.into())
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        ScriptError::Value(message.into())
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        ScriptError::Index(message.into())
    }

    /// Short kind name, used in trace logs and the report.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptError::Syntax { .. } => "SyntaxError",
            ScriptError::Name(_) => "NameError",
            ScriptError::Index(_) => "IndexError",
            ScriptError::Type(_) => "TypeError",
            ScriptError::Value(_) => "ValueError",
            ScriptError::ZeroDivision(_) => "ZeroDivisionError",
            ScriptError::Attribute(_) => "AttributeError",
            ScriptError::Recursion => "RecursionError",
            ScriptError::Overflow => "OverflowError",
            ScriptError::Memory(_) => "MemoryError",
            ScriptError::Timeout(_) => "TimeoutError",
            ScriptError::Io(_) => "OSError",
        }
    }
}

/// Rejected [`crate::RunConfig`] values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'{0}' is not a valid variable name")]
    InvalidVariable(String),

    #[error("recursion limit must be at least 1")]
    ZeroRecursionLimit,
}

pub type ScriptResult<T> = Result<T, ScriptError>;
