//! Error types and Result aliases for toysql
//!
//! Lexical problems never show up here: the tokenizer reports them in-band
//! as `TokenKind::Error` tokens. Validation findings are `Diagnostic`s.
//! What remains are the failures that abort a statement.

use std::fmt;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Generic error
    Error,
    /// An expected keyword, punctuation or value was absent
    Syntax,
    /// The statement does not start with a supported command
    Unsupported,
    /// Parentheses or subqueries nested past the configured limit
    TooDeep,
    /// The schema already holds an object with this name
    Exists,
    /// A syntax tree cannot be turned into schema metadata
    Schema,
    /// Bad input to the shell or the configuration
    Misuse,
}

impl ErrorCode {
    /// Short human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Error => "error",
            ErrorCode::Syntax => "syntax error",
            ErrorCode::Unsupported => "unsupported command",
            ErrorCode::TooDeep => "nesting too deep",
            ErrorCode::Exists => "already exists",
            ErrorCode::Schema => "schema error",
            ErrorCode::Misuse => "misuse",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement-level error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    /// Create an error whose message is the code's description
    pub fn new(code: ErrorCode) -> Self {
        Error {
            code,
            message: code.as_str().to_string(),
        }
    }

    /// Create an error with a specific message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_message(ErrorCode::Error, err.to_string())
    }
}

/// Result type alias for toysql operations
pub type Result<T> = std::result::Result<T, Error>;
