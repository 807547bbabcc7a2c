//! Statement code generation
//!
//! Each statement is generated in three steps: render its expressions
//! (which may push prelude lines), flush the prelude, write the statement.

use super::expressions::is_array_valued;
use super::{CompileError, Compiler, Lowered};
use crate::ast::types::{
    AssignmentStatement, CaseEnd, Expression, ExpressionStatement, ForInLoop, ForLoop, FunctionDeclaration,
    IfStatement, ReturnStatement, Statement, SwitchStatement, TryCatchStatement, UpdateOperator,
    VariableDeclaration, ValueType, WhileStatement,
};

impl Compiler<'_> {
    pub(super) fn statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::FunctionDeclaration(func) => self.function(func),
            Statement::If(stmt) => self.if_statement(stmt),
            Statement::For(stmt) => self.for_loop(stmt),
            Statement::ForIn(stmt) => self.for_in(stmt),
            Statement::While(stmt) => self.while_loop(stmt),
            Statement::Switch(stmt) => self.switch(stmt),
            Statement::TryCatch(stmt) => self.try_catch(stmt),
            Statement::Break => {
                self.out.line("break");
                Ok(())
            }
            Statement::Continue => {
                let update = self.loops.last().cloned().unwrap_or_default();
                for line in update {
                    self.out.line(&line);
                }
                self.out.line("continue");
                Ok(())
            }
            Statement::Return(stmt) => self.return_statement(stmt),
            Statement::Exit(stmt) => {
                let code = match stmt.exit_code.unparenthesized() {
                    Expression::Literal(lit) if lit.value_type == ValueType::Number => lit.value.clone(),
                    other => self.value(other)?,
                };
                self.flush();
                self.out.line(&format!("exit {}", code));
                Ok(())
            }
            Statement::Assignment(stmt) => self.assignment(stmt),
            Statement::Expression(stmt) => self.expression_statement(stmt),
            Statement::Raw(raw) => {
                self.out.raw(&raw.content);
                Ok(())
            }
        }
    }

    // =========================================================================
    // BINDINGS
    // =========================================================================

    fn declaration(&mut self, decl: &VariableDeclaration) -> Result<(), CompileError> {
        let binding = self.binding(&decl.name, decl.value_type, &decl.value)?;
        // readonly cannot be re-run, so consts inside loops stay plain
        let keyword = match (self.in_function(), decl.is_const && !self.in_loop()) {
            (true, true) => "local -r ",
            (true, false) => "local ",
            (false, true) => "readonly ",
            (false, false) => "",
        };
        self.flush();
        self.out.line(&format!("{}{}", keyword, binding));
        Ok(())
    }

    fn assignment(&mut self, stmt: &AssignmentStatement) -> Result<(), CompileError> {
        let line = match &stmt.index {
            Some(index) => {
                let index = self.arithmetic(index)?;
                let value = self.value(&stmt.value)?;
                format!("{}[{}]={}", stmt.variable_name, index, value)
            }
            None => self.binding(&stmt.variable_name, ValueType::Unknown, &stmt.value)?,
        };
        self.flush();
        self.out.line(&line);
        Ok(())
    }

    fn expression_statement(&mut self, stmt: &ExpressionStatement) -> Result<(), CompileError> {
        match stmt.expression.unparenthesized() {
            Expression::Update(update) => {
                let op = if update.increment { "+" } else { "-" };
                self.out.line(&format!("{n}=$(({n} {op} 1))", n = update.name, op = op));
            }
            Expression::Assignment(assign) => {
                let line = self.binding(&assign.name, ValueType::Unknown, &assign.value)?;
                self.flush();
                self.out.line(&line);
            }
            Expression::Call(call) => {
                let command = self.call_command(call)?;
                self.flush();
                self.out.line(&command);
            }
            Expression::Builtin(call) => {
                let lowered = self.lower_builtin(call)?;
                self.flush();
                match lowered {
                    Lowered::Effect(lines) => {
                        for line in lines {
                            self.out.line(&line);
                        }
                    }
                    Lowered::Output(command) => self.out.line(&format!("{} >/dev/null", command)),
                    Lowered::Status(command) => self.out.line(&command),
                    Lowered::Word(_) | Lowered::Flag(_) | Lowered::Array(_) => {}
                }
            }
            other => {
                let value = self.value(other)?;
                self.flush();
                self.out.line(&format!(": {}", value));
            }
        }
        Ok(())
    }

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    fn function(&mut self, func: &FunctionDeclaration) -> Result<(), CompileError> {
        self.out.line(&format!("{}() {{", func.name));
        self.out.indent();
        let before = self.out.len();
        for (i, param) in func.parameters.iter().enumerate() {
            self.out.line(&format!("local {}=\"${}\"", param.name, i + 1));
        }

        let loops = std::mem::take(&mut self.loops);
        self.function_depth += 1;
        let result = func.body.iter().try_for_each(|s| self.statement(s));
        self.function_depth -= 1;
        self.loops = loops;
        result?;

        if self.out.len() == before {
            self.out.line(":");
        }
        self.out.dedent();
        self.out.line("}");
        Ok(())
    }

    fn return_statement(&mut self, stmt: &ReturnStatement) -> Result<(), CompileError> {
        let output = match &stmt.value {
            Some(value) if is_array_valued(ValueType::Unknown, value) => {
                Some(format!("printf '%s\\n' {}", self.items(value)?))
            }
            Some(value) => Some(format!("echo {}", self.value(value)?)),
            None => None,
        };
        self.flush();
        if let Some(output) = output {
            self.out.line(&output);
        }
        self.out.line(if self.in_function() { "return 0" } else { "exit 0" });
        Ok(())
    }

    // =========================================================================
    // CONDITIONALS
    // =========================================================================

    fn if_statement(&mut self, stmt: &IfStatement) -> Result<(), CompileError> {
        let condition = self.condition(&stmt.condition)?;
        self.flush();
        self.if_chain(&condition, stmt)
    }

    /// `if` with a rendered condition, its `elif`/`else` chain and `fi`.
    fn if_chain(&mut self, condition: &str, stmt: &IfStatement) -> Result<(), CompileError> {
        self.out.line(&format!("if {}; then", condition));
        self.block(&stmt.then_body)?;
        self.else_chain(stmt)?;
        self.out.line("fi");
        Ok(())
    }

    fn else_chain(&mut self, stmt: &IfStatement) -> Result<(), CompileError> {
        if stmt.else_body.is_empty() {
            return Ok(());
        }
        if let (true, [Statement::If(nested)]) = (stmt.else_if, stmt.else_body.as_slice()) {
            let (condition, prelude) = self.with_prelude(|c| c.condition(&nested.condition))?;
            if prelude.is_empty() {
                self.out.line(&format!("elif {}; then", condition));
                self.block(&nested.then_body)?;
                return self.else_chain(nested);
            }
            // the condition needs setup lines, which cannot precede an elif
            self.out.line("else");
            self.out.indent();
            for line in prelude {
                self.out.line(&line);
            }
            self.if_chain(&condition, nested)?;
            self.out.dedent();
            return Ok(());
        }
        self.out.line("else");
        self.block(&stmt.else_body)
    }

    fn switch(&mut self, stmt: &SwitchStatement) -> Result<(), CompileError> {
        let subject = self.value(&stmt.expression)?;
        let mut clauses = Vec::with_capacity(stmt.cases.len());
        for clause in &stmt.cases {
            let mut patterns = Vec::with_capacity(clause.values.len());
            for value in &clause.values {
                patterns.push(self.case_pattern(value)?);
            }
            clauses.push(patterns.join("|"));
        }
        self.flush();

        self.out.line(&format!("case {} in", subject));
        self.out.indent();
        for (clause, pattern) in stmt.cases.iter().zip(clauses) {
            self.out.line(&format!("{})", pattern));
            self.case_body(&clause.body, clause.end)?;
        }
        if let Some(default) = &stmt.default_case {
            self.out.line("*)");
            self.case_body(default, CaseEnd::Break)?;
        }
        self.out.dedent();
        self.out.line("esac");
        Ok(())
    }

    fn case_pattern(&mut self, value: &Expression) -> Result<String, CompileError> {
        match value.unparenthesized() {
            Expression::Literal(lit) if lit.value_type == ValueType::Number => Ok(lit.value.clone()),
            other => self.value(other),
        }
    }

    fn case_body(&mut self, body: &[Statement], end: CaseEnd) -> Result<(), CompileError> {
        self.out.indent();
        for statement in body {
            self.statement(statement)?;
        }
        self.out.line(match end {
            CaseEnd::FallThrough => ";&",
            CaseEnd::Break | CaseEnd::ImplicitEnd => ";;",
        });
        self.out.dedent();
        Ok(())
    }

    fn try_catch(&mut self, stmt: &TryCatchStatement) -> Result<(), CompileError> {
        let status = self.names.fresh("try_status");
        let errexit = self.options.exit_on_error;

        if errexit {
            self.out.line("set +e");
        }
        self.out.line("(");
        self.out.indent();
        self.out.line("set -e");
        for statement in &stmt.try_body {
            self.statement(statement)?;
        }
        self.out.dedent();
        self.out.line(")");
        self.out.line(&format!("{}=$?", status));
        if errexit {
            self.out.line("set -e");
        }

        self.out.line(&format!("if [ \"${{{}}}\" -ne 0 ]; then", status));
        self.out.indent();
        let before = self.out.len();
        if let Some(variable) = &stmt.catch_variable {
            let local = if self.in_function() { "local " } else { "" };
            self.out.line(&format!(
                "{}{}=\"Command failed with exit code ${{{}}}\"",
                local, variable, status
            ));
        }
        for statement in &stmt.catch_body {
            self.statement(statement)?;
        }
        if self.out.len() == before {
            self.out.line(":");
        }
        self.out.dedent();
        self.out.line("fi");
        Ok(())
    }

    // =========================================================================
    // LOOPS
    // =========================================================================

    /// `while cond; do`, or the `while true` form when the condition needs
    /// prelude lines that must re-run every iteration. Leaves the writer
    /// indented inside the loop.
    fn loop_header(&mut self, condition: &Expression) -> Result<(), CompileError> {
        let (rendered, prelude) = self.with_prelude(|c| c.condition(condition))?;
        self.flush();
        if prelude.is_empty() {
            self.out.line(&format!("while {}; do", rendered));
            self.out.indent();
            return Ok(());
        }

        let negated = negate(&rendered, condition);
        self.out.line("while true; do");
        self.out.indent();
        for line in prelude {
            self.out.line(&line);
        }
        self.out.line(&format!("if {}; then", negated));
        self.out.line("  break");
        self.out.line("fi");
        Ok(())
    }

    /// Body lines, then `done`. `update` also runs before any `continue`.
    fn loop_body(&mut self, body: &[Statement], update: Vec<String>) -> Result<(), CompileError> {
        let before = self.out.len();
        self.loops.push(update.clone());
        let result = body.iter().try_for_each(|s| self.statement(s));
        self.loops.pop();
        result?;
        for line in &update {
            self.out.line(line);
        }
        if self.out.len() == before {
            self.out.line(":");
        }
        self.out.dedent();
        self.out.line("done");
        Ok(())
    }

    fn while_loop(&mut self, stmt: &WhileStatement) -> Result<(), CompileError> {
        self.loop_header(&stmt.condition)?;
        self.loop_body(&stmt.body, Vec::new())
    }

    fn for_loop(&mut self, stmt: &ForLoop) -> Result<(), CompileError> {
        let init = self.binding(&stmt.init_variable, stmt.init_type, &stmt.init_value)?;
        self.flush();
        let local = if self.in_function() { "local " } else { "" };
        self.out.line(&format!("{}{}", local, init));

        let (step, mut update) = self.with_prelude(|c| c.update_line(stmt))?;
        update.push(step);

        self.loop_header(&stmt.condition)?;
        self.loop_body(&stmt.body, update)
    }

    fn update_line(&mut self, stmt: &ForLoop) -> Result<String, CompileError> {
        let name = &stmt.update_variable;
        let amount = match &stmt.update_value {
            Some(value) => self.arithmetic_operand(value)?,
            None => "1".to_string(),
        };
        let op = match stmt.update_operator {
            UpdateOperator::Increment | UpdateOperator::AddAssign => "+",
            UpdateOperator::Decrement | UpdateOperator::SubAssign => "-",
        };
        Ok(format!("{n}=$(({n} {op} {amount}))", n = name, op = op, amount = amount))
    }

    fn for_in(&mut self, stmt: &ForInLoop) -> Result<(), CompileError> {
        let items = self.items(&stmt.iterable)?;
        self.flush();
        self.out.line(&format!("for {} in {}; do", stmt.variable, items));
        self.out.indent();
        self.loop_body(&stmt.body, Vec::new())
    }
}

/// `! cond`, grouped when the condition is a logical list.
fn negate(rendered: &str, condition: &Expression) -> String {
    match condition.unparenthesized() {
        Expression::Binary(bin) if bin.operator.is_logical() => format!("! {{ {}; }}", rendered),
        _ => format!("! {}", rendered),
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{compile, compile_with_options, CompileOptions};
    use crate::parser::parse;

    fn body(source: &str) -> String {
        let script = compile(&parse(source).unwrap()).unwrap();
        script.splitn(3, '\n').nth(2).unwrap_or("").to_string()
    }

    #[test]
    fn test_const_in_loop_is_plain() {
        let out = body("for (let i = 0; i < 2; i++) {\n  const d = i * 2;\n}");
        assert!(out.contains("  d=$((i * 2))\n"));
        assert!(!out.contains("readonly"));
    }

    #[test]
    fn test_update_statement() {
        assert_eq!(body("let n = 0;\nn++;"), "n=0\nn=$((n + 1))\n");
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(body("let n = 1;\nn += 2;"), "n=1\nn=$((n + 2))\n");
    }

    #[test]
    fn test_index_assignment() {
        assert_eq!(body("let xs: number[] = [1, 2];\nxs[0] = 5;"), "xs=(1 2)\nxs[0]=5\n");
    }

    #[test]
    fn test_while_with_prelude() {
        let out = body("let n: number = 0;\nwhile (n < utility.random(3, 3)) {\n  n++;\n}");
        assert!(out.contains("while true; do\n"));
        assert!(out.contains("  if ! [ \"${n}\" -lt $((RANDOM % (_random_max_1 - _random_min_1 + 1) + _random_min_1)) ]; then\n    break\n  fi\n"));
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(body("exit(3);"), "exit 3\n");
    }

    #[test]
    fn test_return_without_value() {
        let out = body("function f(): void {\n  return;\n}");
        assert_eq!(out, "f() {\n  return 0\n}\n");
    }

    #[test]
    fn test_for_in_inline_array() {
        assert_eq!(
            body("for (let n of [1, 2]) {\n  console.log(n);\n}"),
            "for n in 1 2; do\n  echo \"${n}\"\ndone\n"
        );
    }

    #[test]
    fn test_try_with_errexit() {
        let options = CompileOptions { exit_on_error: true, ..CompileOptions::default() };
        let script = compile_with_options(&parse("try {\n  ls;\n} catch {\n}").unwrap(), &options).unwrap();
        assert!(script.contains("set +e\n(\n"));
        assert!(script.contains("_try_status_1=$?\nset -e\n"));
    }

    #[test]
    fn test_call_statement() {
        assert_eq!(body("function hi() {\n  console.log(\"hi\");\n}\nhi();"), "hi() {\n  echo \"hi\"\n}\nhi\n");
    }
}
