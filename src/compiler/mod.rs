//! Bash code generator
//!
//! Walks a `ProgramNode` once and emits a bash script. Statements are
//! written through a `ShellWriter`; expressions render to shell text in one
//! of four contexts (value, condition, arithmetic, interpolation). Builtin
//! calls reduce to a `Lowered` form and may push prelude lines, which are
//! flushed right before the statement that needs them.

pub mod types;
pub mod names;
pub mod writer;
pub mod helpers;
mod expressions;
mod statements;
mod builtins;

pub use helpers::{ArgDefinition, HelperUsage};
pub use names::NameGenerator;
pub use types::{CompileError, CompileOptions, Lowered};
pub use writer::ShellWriter;

use indexmap::IndexMap;

use crate::ast::types::{ProgramNode, Statement};

/// Code generator state for one compilation.
pub struct Compiler<'o> {
    options: &'o CompileOptions,
    names: NameGenerator,
    out: ShellWriter,
    /// Lines that must run before the statement being generated
    pending: Vec<String>,
    /// Number of enclosing function bodies
    function_depth: usize,
    /// One entry per enclosing loop: the lines `continue` must run first
    loops: Vec<Vec<String>>,
    usage: HelperUsage,
    args: IndexMap<String, ArgDefinition>,
    description: Option<String>,
}

impl<'o> Compiler<'o> {
    pub fn new(options: &'o CompileOptions) -> Self {
        Compiler {
            options,
            names: NameGenerator::new(),
            out: ShellWriter::new(),
            pending: Vec::new(),
            function_depth: 0,
            loops: Vec::new(),
            usage: HelperUsage::default(),
            args: IndexMap::new(),
            description: None,
        }
    }

    /// Compile a complete program into a script.
    pub fn compile(mut self, program: &ProgramNode) -> Result<String, CompileError> {
        for statement in &program.statements {
            self.statement(statement)?;
        }
        let body = std::mem::take(&mut self.out);

        let mut script = ShellWriter::new();
        script.line(&self.options.shebang);
        if self.options.header_comment {
            script.line("# Generated by typeshell. Do not edit by hand.");
        }
        if self.options.exit_on_error {
            script.line("set -e");
        }
        script.line("");
        helpers::write_helpers(&mut script, &self.usage, &self.args, self.description.as_deref());
        for line in body.into_lines() {
            script.raw(&line);
        }
        Ok(script.finish())
    }

    // =========================================================================
    // SHARED PLUMBING
    // =========================================================================

    fn in_function(&self) -> bool {
        self.function_depth > 0
    }

    fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    /// Write pending prelude lines at the current indent.
    fn flush(&mut self) {
        for line in std::mem::take(&mut self.pending) {
            self.out.line(&line);
        }
    }

    /// Run `f` and return the prelude lines it pushed, leaving earlier
    /// pending lines in place.
    fn with_prelude<T, F>(&mut self, f: F) -> Result<(T, Vec<String>), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<T, CompileError>,
    {
        let saved = std::mem::take(&mut self.pending);
        let result = f(self);
        let prelude = std::mem::replace(&mut self.pending, saved);
        result.map(|value| (value, prelude))
    }

    /// Generate statements into a separate buffer and return its lines,
    /// indented relative to the caller's position.
    fn capture<F>(&mut self, f: F) -> Result<Vec<String>, CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        let saved_out = std::mem::take(&mut self.out);
        let saved_pending = std::mem::take(&mut self.pending);
        let result = f(self);
        let inner = std::mem::replace(&mut self.out, saved_out);
        self.pending = saved_pending;
        result?;
        Ok(inner.into_lines())
    }

    /// Statements of a block, one level deeper. Empty blocks get `:`.
    fn block(&mut self, body: &[Statement]) -> Result<(), CompileError> {
        self.out.indent();
        let before = self.out.len();
        for statement in body {
            self.statement(statement)?;
        }
        if self.out.len() == before {
            self.out.line(":");
        }
        self.out.dedent();
        Ok(())
    }
}

/// Compile a program with default options.
pub fn compile(program: &ProgramNode) -> Result<String, CompileError> {
    compile_with_options(program, &CompileOptions::default())
}

pub fn compile_with_options(program: &ProgramNode, options: &CompileOptions) -> Result<String, CompileError> {
    Compiler::new(options).compile(program)
}
