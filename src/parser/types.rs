//! Parser Types and Constants
//!
//! Shared error type and limits used across parser modules.

use std::fmt;
use thiserror::Error;

// Parser limits to prevent hangs and resource exhaustion
pub const MAX_INPUT_SIZE: usize = 1_000_000; // 1MB max input
pub const MAX_PARSER_DEPTH: usize = 200; // Max recursion depth for nested constructs

/// A fail-fast parse error. `line` is 1-based; 0 means the position is not
/// known (errors raised while parsing a detached expression string).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    ConstReassignment,
    TypeMismatch,
    Arity,
    Limit,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self { message: message.into(), line, kind: ParseErrorKind::Syntax }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(message, 0)
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn const_reassignment(name: &str) -> Self {
        Self::syntax(format!("Cannot reassign const variable '{}'", name))
            .with_kind(ParseErrorKind::ConstReassignment)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::syntax(message).with_kind(ParseErrorKind::TypeMismatch)
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::syntax(message).with_kind(ParseErrorKind::Arity)
    }

    /// Attach a line number unless one is already known.
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "Parse error at line {}: {}", self.line, self.message)
        } else {
            write!(f, "Parse error: {}", self.message)
        }
    }
}

/// True for identifiers of the source language (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
