//! Error types shared across the crate.
//!
//! Two families exist:
//!
//! - [`ParseError`] is raised while reading a document and always carries a
//!   position. Undeclared prefixes and unknown vocabulary terms are reported
//!   through the same type so they surface as ordinary diagnostics.
//! - [`ResolveError`] covers everything that can go wrong while fetching or
//!   loading a vocabulary or prefix. It never becomes a diagnostic.

use thiserror::Error;

/// What went wrong at a [`ParseError`] position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("Undeclared prefix for {0}")]
    UndeclaredPrefix(String),

    #[error("Term {term} is not defined in <{namespace}>")]
    UndefinedTerm { term: String, namespace: String },

    #[error("{0}")]
    Malformed(String),
}

/// A positioned parse failure. `line` and `column` are 1-based, as reported by
/// the parsers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (at line {line}, column {column})")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

impl ParseError {
    pub fn new(line: usize, column: usize, kind: SyntaxErrorKind) -> Self {
        ParseError { line, column, kind }
    }

    pub fn malformed(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError::new(line, column, SyntaxErrorKind::Malformed(message.into()))
    }

    /// `(line, column)`, ordered the way the text reads.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}

/// Failure to obtain or read a vocabulary or prefix document.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("HTTP error fetching <{url}>: {message}")]
    Http { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse <{source_url}>: {error}")]
    Parse {
        source_url: String,
        error: ParseError,
    },

    #[error("Unsupported document format for <{0}>")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
