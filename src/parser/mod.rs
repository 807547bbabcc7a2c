//! Parser module for typeshell sources
//!
//! This module contains the comment stripper, line preparation, the
//! expression lexer and parser, the builtin registry and the statement
//! parser.

pub mod types;
pub mod comments;
pub mod lines;
pub mod lexer;
pub mod interpolation;
pub mod builtins;
pub mod raw_shell;
pub mod expression_parser;
pub mod statement_parser;

// Re-exports
pub use types::{ParseError, ParseErrorKind};
pub use lexer::{Lexer, Token, TokenType};
pub use statement_parser::{parse, Parser};
