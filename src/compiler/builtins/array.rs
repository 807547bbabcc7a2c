//! array.* lowering over bash indexed arrays.

use super::misrouted;
use crate::ast::types::{BuiltinCall, Expression, LambdaExpression, ValueType};
use crate::compiler::{CompileError, Compiler, Lowered};

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_array(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::ArrayJoin { array, separator } => {
                let items = self.items(array)?;
                let separator = match separator {
                    Some(separator) => self.quoted(separator)?,
                    None => "\",\"".to_string(),
                };
                let var = self.names.fresh("join");
                let format = format!("'%s'{}", separator.replace('%', "%%"));
                self.pending.push(format!("printf -v {} {} {}", var, format, items));
                self.pending.push(format!("{v}=\"${{{v}%{s}}}\"", v = var, s = separator));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            BuiltinCall::ArraySort { array, order } => {
                let numeric = array.value_type() == ValueType::NumberArray;
                let reverse = match order.as_ref().map(Expression::unparenthesized) {
                    None => String::new(),
                    Some(order) => match order.as_string_literal() {
                        Some("desc") => " -r".to_string(),
                        Some(_) => String::new(),
                        None => format!(" $([ {} = \"desc\" ] && echo -r)", self.value(order)?),
                    },
                };
                let command = format!("sort{}{}", if numeric { " -n" } else { "" }, reverse);
                self.piped(array, "sorted", &command)
            }
            BuiltinCall::ArrayMerge { first, second } => {
                let first = self.items(first)?;
                let second = self.items(second)?;
                Ok(Lowered::Array(format!("{} {}", first, second).trim().to_string()))
            }
            BuiltinCall::ArrayShuffle { array } => {
                self.piped(array, "shuffled", "{ if command -v shuf >/dev/null 2>&1; then shuf; else sort -R; fi; }")
            }
            BuiltinCall::ArrayUnique { array } => self.piped(array, "unique", "awk '!seen[$0]++'"),
            BuiltinCall::ArrayPush { array, value } => match array.unparenthesized() {
                Expression::Variable(var) => {
                    let value = self.value(value)?;
                    Ok(Lowered::Effect(vec![format!("{}+=({})", var.name, value)]))
                }
                _ => Err(CompileError::unsupported("array.push() target must be a variable")),
            },
            BuiltinCall::ArrayForEach { array, callback } => self.for_each(array, callback),
            other => Err(misrouted("array", other)),
        }
    }

    /// Items of `array` piped through `command` into a new array.
    fn piped(&mut self, array: &Expression, base: &str, command: &str) -> Result<Lowered, CompileError> {
        let source = self.array_name(array)?;
        let var = self.names.fresh(base);
        self.pending.push(format!("{}=()", var));
        self.pending.push(format!("if [ ${{#{}[@]}} -gt 0 ]; then", source));
        self.pending.push(format!(
            "  mapfile -t {} < <(printf '%s\\n' \"${{{}[@]}}\" | {})",
            var, source, command
        ));
        self.pending.push("fi".to_string());
        Ok(Lowered::Array(format!("\"${{{}[@]}}\"", var)))
    }

    /// `for item in ...; do body; done`, with an index counter when the
    /// callback takes a second parameter.
    fn for_each(&mut self, array: &Expression, callback: &LambdaExpression) -> Result<Lowered, CompileError> {
        let items = self.items(array)?;
        let item = callback
            .parameters
            .first()
            .cloned()
            .ok_or_else(|| CompileError::unsupported("array.forEach() callback needs a parameter"))?;
        let index = callback.parameters.get(1).cloned();
        let local = if self.in_function() { "local " } else { "" };

        let mut lines = Vec::new();
        let mut update = Vec::new();
        if let Some(index) = &index {
            lines.push(format!("{}{}=0", local, index));
            update.push(format!("{i}=$(({i} + 1))", i = index));
        }
        lines.push(format!("for {} in {}; do", item, items));

        let body = self.capture(|c| {
            c.out.indent();
            c.loops.push(update.clone());
            let result = callback.body.iter().try_for_each(|s| c.statement(s));
            c.loops.pop();
            result?;
            for line in &update {
                c.out.line(line);
            }
            Ok(())
        })?;
        if body.is_empty() {
            lines.push("  :".to_string());
        }
        lines.extend(body);
        lines.push("done".to_string());
        Ok(Lowered::Effect(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_join() {
        let out = body("let xs: string[] = [\"a\", \"b\"];\nlet s: string = array.join(xs, \",\");");
        assert_eq!(
            out,
            "xs=(\"a\" \"b\")\nprintf -v _join_1 '%s'\",\" \"${xs[@]}\"\n_join_1=\"${_join_1%\",\"}\"\ns=\"${_join_1}\"\n"
        );
    }

    #[test]
    fn test_method_form_join() {
        let out = body("let xs: number[] = [1, 2];\nconsole.log(xs.join(\"-\"));");
        assert!(out.contains("printf -v _join_1 '%s'\"-\" \"${xs[@]}\""));
        assert!(out.ends_with("echo \"${_join_1}\"\n"));
    }

    #[test]
    fn test_numeric_sort() {
        let out = body("let xs: number[] = [3, 1];\nlet s: number[] = array.sort(xs, \"desc\");");
        assert!(out.contains("mapfile -t _sorted_1 < <(printf '%s\\n' \"${xs[@]}\" | sort -n -r)"));
        assert!(out.ends_with("s=(\"${_sorted_1[@]}\")\n"));
    }

    #[test]
    fn test_push() {
        assert_eq!(body("let xs: string[] = [];\narray.push(xs, \"a\");"), "xs=()\nxs+=(\"a\")\n");
    }

    #[test]
    fn test_for_each_with_index() {
        let out = body("let xs: string[] = [\"a\"];\narray.forEach(xs, (x, i) => {\n  console.log(`${i}: ${x}`);\n});");
        assert_eq!(
            out,
            "xs=(\"a\")\ni=0\nfor x in \"${xs[@]}\"; do\n  echo \"${i}: ${x}\"\n  i=$((i + 1))\ndone\n"
        );
    }

    #[test]
    fn test_contains_condition() {
        let out = body("let xs: string[] = [\"a\"];\nif (array.contains(xs, \"a\")) {\n  console.log(\"y\");\n}");
        assert!(out.contains("if printf '%s\\n' \"${xs[@]}\" | grep -Fxq -- \"a\"; then"));
    }
}
