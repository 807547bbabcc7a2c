//! Abstract Syntax Tree (AST) Types for typeshell
//!
//! The shared data model between the parser and the compiler.
//!
//! Architecture:
//!   Source → Comment Stripper → Lines → Parser → AST → Compiler → Shell script

pub mod types;
