//! typeshell - a typed scripting language that compiles to bash
//!
//! This library provides the parser for typeshell sources, producing an AST,
//! and the code generator that turns that AST into a bash script. The
//! formatter and the configuration loader used by the `typeshell` binary
//! live here as well.
//!
//! ```text
//! source → parser::parse → ProgramNode → compiler::compile → bash script
//! ```

pub mod ast;
pub mod parser;
pub mod compiler;
pub mod formatter;
pub mod config;

pub use ast::types::*;
pub use compiler::{compile, compile_with_options, CompileError, CompileOptions, Compiler};
pub use config::Config;
pub use formatter::format;
pub use parser::{parse, ParseError, Parser};

/// Errors from any stage of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Cannot serialize AST: {0}")]
    Serialize(String),
}

/// Output formats for a dumped AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstFormat {
    Json,
    Yaml,
}

/// Parse and compile a source text in one step.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<String, Error> {
    let program = parse(source)?;
    tracing::debug!(statements = program.statements.len(), "parsed");
    let script = compile_with_options(&program, options)?;
    tracing::debug!(bytes = script.len(), "compiled");
    Ok(script)
}

/// Serialize a parsed program for inspection.
pub fn dump_ast(program: &ProgramNode, format: AstFormat) -> Result<String, Error> {
    match format {
        AstFormat::Json => serde_json::to_string_pretty(program).map_err(|e| Error::Serialize(e.to_string())),
        AstFormat::Yaml => serde_yaml::to_string(program).map_err(|e| Error::Serialize(e.to_string())),
    }
}
