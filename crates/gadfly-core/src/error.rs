//! Error types and the observable error taxonomy for gadfly.
//!
//! This module provides a unified error type (`GadflyError`) covering the
//! failure categories that cross the library boundary:
//!
//! - `SymbolNotFound` - a requested symbol, file, or package does not exist
//! - `InvalidOperation` - an operation was requested on an unsuitable subject
//! - `VisibilityViolation` - an unexported symbol was reached from outside its package
//! - `ParseError` - a source file could not be parsed
//! - `FileSystemError` - a workspace path could not be read
//!
//! Every variant carries a message plus file/line/column context so callers
//! can render a precise location, and `GadflyError::kind` exposes a stable
//! discriminant for programmatic branching. Diagnostic enrichment (suggestion
//! lists, scope context) wraps these errors without changing their kind.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Error Kinds
// ============================================================================

/// Stable discriminant for [`GadflyError`] variants.
///
/// Callers that need to branch on the failure category should match on this
/// rather than on the variant, so added payload fields never break them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A requested symbol, file, or package does not exist.
    SymbolNotFound,
    /// The operation is invalid for its subject (e.g. a method set of a non-type).
    InvalidOperation,
    /// An unexported symbol was referenced from outside its package.
    VisibilityViolation,
    /// A source file failed to parse.
    ParseError,
    /// A filesystem path could not be read or walked.
    FileSystemError,
}

impl ErrorKind {
    /// String form used in rendered output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SymbolNotFound => "symbol_not_found",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::VisibilityViolation => "visibility_violation",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::FileSystemError => "file_system_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Boxed error cause, for variants that wrap an underlying failure.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for gadfly operations.
#[derive(Debug, Error)]
pub enum GadflyError {
    /// Symbol not found.
    #[error("symbol '{name}' not found at {file}:{line}:{col}")]
    SymbolNotFound {
        name: String,
        file: String,
        line: u32,
        col: u32,
    },

    /// Operation invalid for its subject.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        message: String,
        file: String,
        line: u32,
        col: u32,
    },

    /// Unexported symbol referenced from outside its package.
    #[error("'{name}' is not exported ({file}:{line}:{col})")]
    VisibilityViolation {
        name: String,
        file: String,
        line: u32,
        col: u32,
    },

    /// Source file failed to parse.
    #[error("parse error in {file}:{line}:{col}: {message}")]
    ParseError {
        message: String,
        file: String,
        line: u32,
        col: u32,
        #[source]
        cause: Option<Cause>,
    },

    /// Filesystem failure while loading or reading the workspace.
    #[error("file system error at {path}: {message}")]
    FileSystemError {
        message: String,
        path: String,
        #[source]
        cause: Option<Cause>,
    },
}

impl GadflyError {
    /// Stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GadflyError::SymbolNotFound { .. } => ErrorKind::SymbolNotFound,
            GadflyError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            GadflyError::VisibilityViolation { .. } => ErrorKind::VisibilityViolation,
            GadflyError::ParseError { .. } => ErrorKind::ParseError,
            GadflyError::FileSystemError { .. } => ErrorKind::FileSystemError,
        }
    }

    /// Create a symbol-not-found error.
    pub fn symbol_not_found(name: impl Into<String>, file: impl Into<String>, line: u32, col: u32) -> Self {
        GadflyError::SymbolNotFound {
            name: name.into(),
            file: file.into(),
            line,
            col,
        }
    }

    /// Create an invalid-operation error with no source position.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        GadflyError::InvalidOperation {
            message: message.into(),
            file: String::new(),
            line: 0,
            col: 0,
        }
    }

    /// Create a visibility-violation error.
    pub fn visibility(name: impl Into<String>, file: impl Into<String>, line: u32, col: u32) -> Self {
        GadflyError::VisibilityViolation {
            name: name.into(),
            file: file.into(),
            line,
            col,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>, file: impl Into<String>, line: u32, col: u32) -> Self {
        GadflyError::ParseError {
            message: message.into(),
            file: file.into(),
            line,
            col,
            cause: None,
        }
    }

    /// Create a filesystem error wrapping an I/O failure.
    pub fn fs(message: impl Into<String>, path: impl Into<String>, cause: std::io::Error) -> Self {
        GadflyError::FileSystemError {
            message: message.into(),
            path: path.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Result type for gadfly operations.
pub type GadflyResult<T> = Result<T, GadflyError>;

// ============================================================================
// Tests
// ============================================================================
