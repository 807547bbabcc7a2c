//! Expression code generation
//!
//! Every expression renders in one of these contexts:
//!
//! - value: a shell word usable as an assignment right-hand side or an
//!   argument (`"text"`, `5`, `"${x}"`, `$((a + b))`, `"$(cmd)"`)
//! - condition: a command list whose exit status is the truth value
//! - arithmetic: text for the inside of `$(( ))`
//! - interpolation: text for the inside of a double-quoted string
//! - items: an array item list for `( ... )` or `for x in ...`

use super::{CompileError, Compiler, Lowered};
use crate::ast::types::{
    BinaryExpression, BinaryOperator, Expression, FunctionCall, LiteralExpression, StringInterpolation,
    InterpolationPart, TernaryExpression, UnaryOperator, ValueType,
};

impl Compiler<'_> {
    // =========================================================================
    // VALUE
    // =========================================================================

    pub(super) fn value(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Literal(lit) => Ok(literal_value(lit)),
            Expression::Variable(var) => Ok(if var.value_type.is_array() {
                format!("\"${{{}[*]}}\"", var.name)
            } else {
                format!("\"${{{}}}\"", var.name)
            }),
            Expression::Binary(bin) => {
                if bin.operator.is_comparison() || bin.operator.is_logical() {
                    self.boolean_value(expr)
                } else if is_concatenation(expr) {
                    Ok(format!("\"{}\"", self.interpolated(expr)?))
                } else {
                    Ok(format!("$(({}))", self.arithmetic(expr)?))
                }
            }
            Expression::Unary(un) => match un.operator {
                UnaryOperator::Not => self.boolean_value(expr),
                UnaryOperator::Neg => Ok(format!("$(({}))", self.arithmetic(expr)?)),
            },
            Expression::Update(_) => Ok(format!("$(({}))", self.arithmetic(expr)?)),
            Expression::Ternary(ternary) => Ok(format!("\"$({})\"", self.ternary_chain(ternary)?)),
            Expression::Parenthesized(inner) => self.value(inner),
            Expression::ArrayLiteral(_) => Err(CompileError::unsupported("array literal in scalar position")),
            Expression::ArrayAccess(access) => {
                let name = self.array_name(&access.array)?;
                let index = self.arithmetic(&access.index)?;
                Ok(format!("\"${{{}[{}]}}\"", name, index))
            }
            Expression::ArrayLength(array) => {
                let name = self.array_name(array)?;
                Ok(format!("${{#{}[@]}}", name))
            }
            Expression::ArrayIsEmpty(_) | Expression::ArrayContains(_) => self.boolean_value(expr),
            Expression::ArrayReverse(_) => {
                let name = self.array_name(expr)?;
                Ok(format!("\"${{{}[*]}}\"", name))
            }
            Expression::Assignment(assign) => {
                let line = self.binding(&assign.name, ValueType::Unknown, &assign.value)?;
                self.pending.push(line);
                Ok(format!("\"${{{}}}\"", assign.name))
            }
            Expression::Call(call) => Ok(format!("\"$({})\"", self.call_command(call)?)),
            Expression::Interpolation(interpolation) => Ok(format!("\"{}\"", self.interpolation(interpolation)?)),
            Expression::Lambda(_) => Err(CompileError::unsupported(
                "lambda outside of scheduler.cron or array.forEach",
            )),
            Expression::Builtin(call) => {
                let lowered = self.lower_builtin(call)?;
                self.lowered_value(lowered)
            }
        }
    }

    /// `"$(cond && echo "true" || echo "false")"`
    fn boolean_value(&mut self, expr: &Expression) -> Result<String, CompileError> {
        let condition = self.condition(expr)?;
        Ok(boolean_word(&condition))
    }

    /// `c1 && echo B || { c2 && echo D || echo E; }`
    fn ternary_chain(&mut self, ternary: &TernaryExpression) -> Result<String, CompileError> {
        let condition = self.condition(&ternary.condition)?;
        let when_true = self.value(&ternary.when_true)?;
        let when_false = match ternary.when_false.unparenthesized() {
            Expression::Ternary(nested) => format!("{{ {}; }}", self.ternary_chain(nested)?),
            other => format!("echo {}", self.value(other)?),
        };
        Ok(format!("{} && echo {} || {}", condition, when_true, when_false))
    }

    pub(super) fn lowered_value(&mut self, lowered: Lowered) -> Result<String, CompileError> {
        Ok(match lowered {
            Lowered::Word(word) => word,
            Lowered::Output(command) => format!("\"$({})\"", command),
            Lowered::Status(command) => boolean_word(&command),
            Lowered::Flag(name) => format!("\"${{{}}}\"", name),
            Lowered::Effect(lines) => {
                self.pending.extend(lines);
                "\"\"".to_string()
            }
            Lowered::Array(items) => {
                let name = self.names.fresh("array");
                self.pending.push(format!("{}=({})", name, items));
                format!("\"${{{}[*]}}\"", name)
            }
        })
    }

    /// `name arg...` for a user function call.
    pub(super) fn call_command(&mut self, call: &FunctionCall) -> Result<String, CompileError> {
        let mut command = call.name.clone();
        for argument in &call.arguments {
            command.push(' ');
            command.push_str(&self.value(argument)?);
        }
        Ok(command)
    }

    /// `name=value` or `name=(items)` depending on the value's shape.
    pub(super) fn binding(&mut self, name: &str, declared: ValueType, value: &Expression) -> Result<String, CompileError> {
        if is_array_valued(declared, value) {
            Ok(format!("{}=({})", name, self.items(value)?))
        } else {
            Ok(format!("{}={}", name, self.value(value)?))
        }
    }

    // =========================================================================
    // CONDITION
    // =========================================================================

    pub(super) fn condition(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Literal(lit) => Ok(match lit.value_type {
                ValueType::Boolean => lit.value.clone(),
                ValueType::Number => format!("[ {} -ne 0 ]", lit.value),
                _ => format!("[ -n {} ]", literal_value(lit)),
            }),
            Expression::Variable(var) => Ok(match var.value_type {
                ValueType::Number => format!("[ \"${{{}}}\" -ne 0 ]", var.name),
                ValueType::String => format!("[ -n \"${{{}}}\" ]", var.name),
                t if t.is_array() => format!("[ ${{#{}[@]}} -gt 0 ]", var.name),
                _ => format!("[ \"${{{}}}\" = \"true\" ]", var.name),
            }),
            Expression::Binary(bin) => {
                if bin.operator.is_logical() {
                    self.logical(bin)
                } else if bin.operator.is_comparison() {
                    self.comparison(bin)
                } else if is_concatenation(expr) {
                    Ok(format!("[ -n {} ]", self.value(expr)?))
                } else {
                    Ok(format!("[ $(({})) -ne 0 ]", self.arithmetic(expr)?))
                }
            }
            Expression::Unary(un) => match un.operator {
                UnaryOperator::Not => self.negated_condition(&un.operand),
                UnaryOperator::Neg => Ok(format!("[ $(({})) -ne 0 ]", self.arithmetic(expr)?)),
            },
            Expression::Parenthesized(inner) => self.condition(inner),
            Expression::ArrayIsEmpty(array) => {
                let name = self.array_name(array)?;
                Ok(format!("[ ${{#{}[@]}} -eq 0 ]", name))
            }
            Expression::ArrayContains(contains) => {
                let items = self.items(&contains.array)?;
                let value = self.value(&contains.value)?;
                Ok(format!("printf '%s\\n' {} | grep -Fxq -- {}", items, value))
            }
            Expression::Call(call) => Ok(format!("[ \"$({})\" = \"true\" ]", self.call_command(call)?)),
            Expression::Builtin(call) => {
                let lowered = self.lower_builtin(call)?;
                self.lowered_condition(lowered)
            }
            _ => Ok(format!("[ {} = \"true\" ]", self.value(expr)?)),
        }
    }

    /// Condition wrapped in `{ ...; }` when it is a logical list.
    pub(super) fn grouped_condition(&mut self, expr: &Expression) -> Result<String, CompileError> {
        let condition = self.condition(expr)?;
        Ok(if is_logical(expr) { format!("{{ {}; }}", condition) } else { condition })
    }

    /// `! cond`, grouping logical lists.
    pub(super) fn negated_condition(&mut self, expr: &Expression) -> Result<String, CompileError> {
        Ok(format!("! {}", self.grouped_condition(expr)?))
    }

    fn logical(&mut self, bin: &BinaryExpression) -> Result<String, CompileError> {
        let left = self.logical_operand(&bin.left, bin.operator)?;
        let right = self.logical_operand(&bin.right, bin.operator)?;
        Ok(format!("{} {} {}", left, bin.operator.as_str(), right))
    }

    fn logical_operand(&mut self, expr: &Expression, parent: BinaryOperator) -> Result<String, CompileError> {
        match expr.unparenthesized() {
            Expression::Binary(bin) if bin.operator.is_logical() && bin.operator != parent => {
                Ok(format!("{{ {}; }}", self.condition(expr)?))
            }
            _ => self.condition(expr),
        }
    }

    fn comparison(&mut self, bin: &BinaryExpression) -> Result<String, CompileError> {
        let numeric = is_numeric_comparison(&bin.left, &bin.right);
        let left = self.value(&bin.left)?;
        let right = self.value(&bin.right)?;

        if numeric {
            let op = match bin.operator {
                BinaryOperator::Eq => "-eq",
                BinaryOperator::Ne => "-ne",
                BinaryOperator::Lt => "-lt",
                BinaryOperator::Le => "-le",
                BinaryOperator::Gt => "-gt",
                _ => "-ge",
            };
            return Ok(format!("[ {} {} {} ]", left, op, right));
        }

        Ok(match bin.operator {
            BinaryOperator::Eq => format!("[ {} = {} ]", left, right),
            BinaryOperator::Ne => format!("[ {} != {} ]", left, right),
            BinaryOperator::Lt => format!("[ {} \\< {} ]", left, right),
            BinaryOperator::Gt => format!("[ {} \\> {} ]", left, right),
            BinaryOperator::Le => format!("{{ [ {l} \\< {r} ] || [ {l} = {r} ]; }}", l = left, r = right),
            _ => format!("{{ [ {l} \\> {r} ] || [ {l} = {r} ]; }}", l = left, r = right),
        })
    }

    pub(super) fn lowered_condition(&mut self, lowered: Lowered) -> Result<String, CompileError> {
        Ok(match lowered {
            Lowered::Word(word) => format!("[ {} = \"true\" ]", word),
            Lowered::Output(command) => format!("[ \"$({})\" = \"true\" ]", command),
            Lowered::Status(command) => command,
            Lowered::Flag(name) => format!("[ \"${{{}}}\" = \"true\" ]", name),
            Lowered::Effect(lines) => {
                self.pending.extend(lines);
                "true".to_string()
            }
            Lowered::Array(items) => {
                let name = self.names.fresh("array");
                self.pending.push(format!("{}=({})", name, items));
                format!("[ ${{#{}[@]}} -gt 0 ]", name)
            }
        })
    }

    // =========================================================================
    // ARITHMETIC
    // =========================================================================

    pub(super) fn arithmetic(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Literal(lit) => Ok(match lit.value_type {
                ValueType::Boolean => if lit.value == "true" { "1" } else { "0" }.to_string(),
                _ => lit.value.clone(),
            }),
            Expression::Variable(var) => Ok(var.name.clone()),
            Expression::Binary(bin) if !is_concatenation(expr) => Ok(format!(
                "{} {} {}",
                self.arithmetic(&bin.left)?,
                bin.operator.as_str(),
                self.arithmetic(&bin.right)?
            )),
            Expression::Unary(un) => {
                let operand = self.arithmetic_operand(&un.operand)?;
                Ok(match un.operator {
                    UnaryOperator::Neg => format!("-{}", operand),
                    UnaryOperator::Not => format!("!{}", operand),
                })
            }
            Expression::Update(update) => {
                let op = if update.increment { "++" } else { "--" };
                Ok(if update.prefix {
                    format!("{}{}", op, update.name)
                } else {
                    format!("{}{}", update.name, op)
                })
            }
            Expression::Parenthesized(inner) => Ok(format!("({})", self.arithmetic(inner)?)),
            Expression::ArrayLength(array) => {
                let name = self.array_name(array)?;
                Ok(format!("${{#{}[@]}}", name))
            }
            Expression::ArrayAccess(access) => {
                let name = self.array_name(&access.array)?;
                let index = self.arithmetic(&access.index)?;
                Ok(format!("${{{}[{}]}}", name, index))
            }
            _ => {
                let value = self.value(expr)?;
                Ok(strip_quotes(&value).to_string())
            }
        }
    }

    /// Arithmetic text, parenthesized unless it is a single operand.
    pub(super) fn arithmetic_operand(&mut self, expr: &Expression) -> Result<String, CompileError> {
        let text = self.arithmetic(expr)?;
        Ok(match expr {
            Expression::Binary(_) => format!("({})", text),
            _ => text,
        })
    }

    // =========================================================================
    // INTERPOLATION
    // =========================================================================

    /// Text for the inside of a double-quoted string.
    pub(super) fn interpolated(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Literal(lit) => Ok(lit.value.clone()),
            Expression::Variable(var) if var.value_type.is_array() => Ok(format!("${{{}[*]}}", var.name)),
            Expression::Variable(var) => Ok(format!("${{{}}}", var.name)),
            Expression::Interpolation(interpolation) => self.interpolation(interpolation),
            Expression::Binary(bin) if is_concatenation(expr) => {
                Ok(format!("{}{}", self.interpolated(&bin.left)?, self.interpolated(&bin.right)?))
            }
            Expression::Parenthesized(inner) if is_concatenation(inner) => self.interpolated(inner),
            _ => {
                let value = self.value(expr)?;
                Ok(strip_quotes(&value).to_string())
            }
        }
    }

    fn interpolation(&mut self, interpolation: &StringInterpolation) -> Result<String, CompileError> {
        let mut text = String::new();
        for part in &interpolation.parts {
            match part {
                InterpolationPart::Text(t) => text.push_str(t),
                InterpolationPart::Expression(e) => text.push_str(&self.interpolated(e)?),
            }
        }
        Ok(text)
    }

    /// Double-quoted word for `expr`; text already quoted stays as is.
    pub(super) fn quoted(&mut self, expr: &Expression) -> Result<String, CompileError> {
        Ok(format!("\"{}\"", self.interpolated(expr)?))
    }

    // =========================================================================
    // ARRAYS
    // =========================================================================

    /// Item list for `( ... )` and `for x in ...`.
    pub(super) fn items(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Variable(var) if var.value_type == ValueType::String => Ok(format!("${{{}}}", var.name)),
            Expression::Variable(var) => Ok(format!("\"${{{}[@]}}\"", var.name)),
            Expression::Parenthesized(inner) => self.items(inner),
            Expression::ArrayLiteral(array) => {
                let mut words = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    words.push(self.value(element)?);
                }
                Ok(words.join(" "))
            }
            Expression::ArrayReverse(_) => {
                let name = self.array_name(expr)?;
                Ok(format!("\"${{{}[@]}}\"", name))
            }
            Expression::Call(call) if call.return_type.is_array() => {
                let name = self.names.fresh("result");
                let command = self.call_command(call)?;
                self.pending.push(format!("mapfile -t {} < <({})", name, command));
                Ok(format!("\"${{{}[@]}}\"", name))
            }
            Expression::Builtin(call) => match self.lower_builtin(call)? {
                Lowered::Array(items) => Ok(items),
                other => self.lowered_value(other),
            },
            _ => self.value(expr),
        }
    }

    /// Name of a shell array holding the value of `expr`, materializing a
    /// temporary when `expr` is not a plain variable.
    pub(super) fn array_name(&mut self, expr: &Expression) -> Result<String, CompileError> {
        match expr {
            Expression::Variable(var) => Ok(var.name.clone()),
            Expression::Parenthesized(inner) => self.array_name(inner),
            Expression::ArrayReverse(inner) => {
                let source = self.array_name(inner)?;
                let name = self.names.fresh("reversed");
                self.pending.push(format!("{}=()", name));
                self.pending.push(format!(
                    "for (({n}_i = ${{#{s}[@]}} - 1; {n}_i >= 0; {n}_i--)); do",
                    n = name,
                    s = source
                ));
                self.pending.push(format!("  {}+=(\"${{{}[{}_i]}}\")", name, source, name));
                self.pending.push("done".to_string());
                Ok(name)
            }
            _ => {
                let items = self.items(expr)?;
                let name = self.names.fresh("array");
                self.pending.push(format!("{}=({})", name, items));
                Ok(name)
            }
        }
    }
}

// =============================================================================
// SHAPE HELPERS
// =============================================================================

fn literal_value(lit: &LiteralExpression) -> String {
    match lit.value_type {
        ValueType::Number => lit.value.clone(),
        ValueType::Unknown if !lit.value.starts_with('$') => lit.value.clone(),
        _ => format!("\"{}\"", lit.value),
    }
}

fn boolean_word(condition: &str) -> String {
    format!("\"$({} && echo \"true\" || echo \"false\")\"", condition)
}

/// `+` joins strings when either side is string-typed.
pub(super) fn is_concatenation(expr: &Expression) -> bool {
    match expr.unparenthesized() {
        Expression::Binary(bin) => bin.operator == BinaryOperator::Add && expr.value_type() == ValueType::String,
        _ => false,
    }
}

fn is_logical(expr: &Expression) -> bool {
    matches!(expr.unparenthesized(), Expression::Binary(bin) if bin.operator.is_logical())
}

/// Numeric tests when either side is a number, string tests when either
/// side is a string or boolean, otherwise numeric only next to a numeric
/// literal.
fn is_numeric_comparison(left: &Expression, right: &Expression) -> bool {
    let (l, r) = (left.value_type(), right.value_type());
    if l == ValueType::Number || r == ValueType::Number {
        return true;
    }
    if matches!(l, ValueType::String | ValueType::Boolean) || matches!(r, ValueType::String | ValueType::Boolean) {
        return false;
    }
    right.is_numeric_literal() || left.is_numeric_literal()
}

pub(super) fn is_array_valued(declared: ValueType, value: &Expression) -> bool {
    declared.is_array()
        || value.value_type().is_array()
        || matches!(value.unparenthesized(), Expression::ArrayLiteral(_))
}

/// `"text"` -> `text`
pub(super) fn strip_quotes(word: &str) -> &str {
    if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
        &word[1..word.len() - 1]
    } else {
        word
    }
}

/// Single-quote arbitrary text for the shell.
pub(super) fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::AST;
    use crate::compiler::CompileOptions;

    fn with_compiler<T>(f: impl FnOnce(&mut Compiler<'_>) -> T) -> T {
        let options = CompileOptions::default();
        let mut compiler = Compiler::new(&options);
        f(&mut compiler)
    }

    fn var(name: &str, value_type: ValueType) -> Expression {
        AST::variable(name, value_type)
    }

    #[test]
    fn test_concatenation() {
        let expr = AST::binary(AST::string("n="), BinaryOperator::Add, var("n", ValueType::Number));
        assert_eq!(with_compiler(|c| c.value(&expr)).unwrap(), "\"n=${n}\"");
    }

    #[test]
    fn test_arithmetic_addition() {
        let expr = AST::binary(var("a", ValueType::Number), BinaryOperator::Add, AST::number("1"));
        assert_eq!(with_compiler(|c| c.value(&expr)).unwrap(), "$((a + 1))");
    }

    #[test]
    fn test_string_comparison() {
        let expr = AST::binary(var("s", ValueType::String), BinaryOperator::Eq, AST::string("x"));
        assert_eq!(with_compiler(|c| c.condition(&expr)).unwrap(), "[ \"${s}\" = \"x\" ]");
    }

    #[test]
    fn test_unknown_comparison_heuristic() {
        let expr = AST::binary(var("a", ValueType::Unknown), BinaryOperator::Eq, var("b", ValueType::Unknown));
        assert_eq!(with_compiler(|c| c.condition(&expr)).unwrap(), "[ \"${a}\" = \"${b}\" ]");
        let expr = AST::binary(var("a", ValueType::Unknown), BinaryOperator::Lt, AST::number("3"));
        assert_eq!(with_compiler(|c| c.condition(&expr)).unwrap(), "[ \"${a}\" -lt 3 ]");
    }

    #[test]
    fn test_logical_grouping() {
        let or = AST::binary(var("a", ValueType::Boolean), BinaryOperator::Or, var("b", ValueType::Boolean));
        let expr = AST::binary(Expression::Parenthesized(Box::new(or)), BinaryOperator::And, var("c", ValueType::Boolean));
        assert_eq!(
            with_compiler(|c| c.condition(&expr)).unwrap(),
            "{ [ \"${a}\" = \"true\" ] || [ \"${b}\" = \"true\" ]; } && [ \"${c}\" = \"true\" ]"
        );
    }

    #[test]
    fn test_not_groups_logical() {
        let and = AST::binary(var("a", ValueType::Boolean), BinaryOperator::And, var("b", ValueType::Boolean));
        let expr = AST::unary(UnaryOperator::Not, Expression::Parenthesized(Box::new(and)));
        assert_eq!(
            with_compiler(|c| c.condition(&expr)).unwrap(),
            "! { [ \"${a}\" = \"true\" ] && [ \"${b}\" = \"true\" ]; }"
        );
    }

    #[test]
    fn test_not_single_condition_ungrouped() {
        let expr = AST::unary(UnaryOperator::Not, var("ready", ValueType::Boolean));
        assert_eq!(with_compiler(|c| c.condition(&expr)).unwrap(), "! [ \"${ready}\" = \"true\" ]");
    }

    #[test]
    fn test_array_literal_in_scalar_position() {
        let expr = Expression::ArrayLiteral(crate::ast::types::ArrayLiteral {
            elements: vec![AST::number("1")],
            element_type: ValueType::Number,
        });
        assert!(with_compiler(|c| c.value(&expr)).is_err());
        assert_eq!(with_compiler(|c| c.items(&expr)).unwrap(), "1");
    }

    #[test]
    fn test_reverse_prelude() {
        let expr = Expression::ArrayReverse(Box::new(var("xs", ValueType::NumberArray)));
        let (items, pending) = with_compiler(|c| {
            let items = c.items(&expr).unwrap();
            (items, c.pending.clone())
        });
        assert_eq!(items, "\"${_reversed_1[@]}\"");
        assert_eq!(pending[0], "_reversed_1=()");
        assert_eq!(pending.last().unwrap(), "done");
    }

    #[test]
    fn test_unknown_literal_passthrough() {
        assert_eq!(with_compiler(|c| c.value(&AST::unknown("$HOME"))).unwrap(), "\"$HOME\"");
    }

    #[test]
    fn test_single_quote() {
        assert_eq!(single_quote("it's"), "'it'\\''s'");
    }
}
