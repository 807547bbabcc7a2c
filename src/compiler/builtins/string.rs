//! string.* lowering, mostly parameter expansion on a named variable.

use super::{misrouted, template};
use crate::ast::types::{BuiltinCall, Expression};
use crate::compiler::{CompileError, Compiler, Lowered};

const PAD: &str = r#"@var@=@value@
while [ "${#@var@}" -lt @length@ ]; do
  @var@=@step@
done"#;

const REPEAT: &str = r#"@var@=""
for ((@var@_i = 0; @var@_i < @count@; @var@_i++)); do
  @var@+=@value@
done"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_string(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::StringLength { value } => {
                let name = self.scalar_name(value, "str")?;
                Ok(Lowered::Word(format!("${{#{}}}", name)))
            }
            BuiltinCall::StringTrim { value } => Ok(Lowered::Output(format!(
                "printf '%s' {} | sed -e 's/^[[:space:]]*//' -e 's/[[:space:]]*$//'",
                self.value(value)?
            ))),
            BuiltinCall::StringToUpperCase { value } => self.expansion(value, "^^"),
            BuiltinCall::StringToLowerCase { value } => self.expansion(value, ",,"),
            BuiltinCall::StringCapitalize { value } => self.expansion(value, "^"),
            BuiltinCall::StringIsEmpty { value } => Ok(Lowered::Status(format!("[ -z {} ]", self.value(value)?))),
            BuiltinCall::StringStartsWith { value, prefix } => {
                let value = self.value(value)?;
                let prefix = self.quoted(prefix)?;
                Ok(Lowered::Status(format!("[[ {} == {}* ]]", value, prefix)))
            }
            BuiltinCall::StringEndsWith { value, suffix } => {
                let value = self.value(value)?;
                let suffix = self.quoted(suffix)?;
                Ok(Lowered::Status(format!("[[ {} == *{} ]]", value, suffix)))
            }
            BuiltinCall::StringIncludes { value, search } => {
                let value = self.value(value)?;
                let search = self.quoted(search)?;
                Ok(Lowered::Status(format!("[[ {} == *{}* ]]", value, search)))
            }
            BuiltinCall::StringReplace { value, search, replacement } => self.replace(value, search, replacement, "/"),
            BuiltinCall::StringReplaceAll { value, search, replacement } => {
                self.replace(value, search, replacement, "//")
            }
            BuiltinCall::StringSplit { value, delimiter } => {
                let value = self.value(value)?;
                let delimiter = self.quoted(delimiter)?;
                let var = self.names.fresh("split");
                self.pending.push(format!("IFS={} read -r -a {} <<< {}", delimiter, var, value));
                Ok(Lowered::Array(format!("\"${{{}[@]}}\"", var)))
            }
            BuiltinCall::StringSubstring { value, start, length } => {
                let name = self.scalar_name(value, "str")?;
                let start = self.arithmetic(start)?;
                Ok(Lowered::Word(match length {
                    Some(length) => format!("\"${{{}:({}):({})}}\"", name, start, self.arithmetic(length)?),
                    None => format!("\"${{{}:({})}}\"", name, start),
                }))
            }
            BuiltinCall::StringIndexOf { value, search } => {
                let value = self.value(value)?;
                let search = self.value(search)?;
                Ok(Lowered::Output(format!(
                    "awk -v s={} -v t={} 'BEGIN {{ print index(s, t) - 1 }}'",
                    value, search
                )))
            }
            BuiltinCall::StringPadStart { value, length, pad } => self.pad(value, length, pad.as_ref(), true),
            BuiltinCall::StringPadEnd { value, length, pad } => self.pad(value, length, pad.as_ref(), false),
            BuiltinCall::StringRepeat { value, count } => {
                let value = self.value(value)?;
                let count = self.arithmetic_operand(count)?;
                let var = self.names.fresh("repeat");
                self.pending.extend(template(
                    REPEAT,
                    &[("var", var.as_str()), ("value", value.as_str()), ("count", count.as_str())],
                ));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            other => Err(misrouted("string", other)),
        }
    }

    /// `"${name<op>}"` for case conversion.
    fn expansion(&mut self, value: &Expression, op: &str) -> Result<Lowered, CompileError> {
        let name = self.scalar_name(value, "str")?;
        Ok(Lowered::Word(format!("\"${{{}{}}}\"", name, op)))
    }

    /// `"${name/"search"/"replacement"}"`; quoted parts match literally.
    fn replace(
        &mut self,
        value: &Expression,
        search: &Expression,
        replacement: &Expression,
        op: &str,
    ) -> Result<Lowered, CompileError> {
        let name = self.scalar_name(value, "str")?;
        let search = self.quoted(search)?;
        let replacement = self.quoted(replacement)?;
        Ok(Lowered::Word(format!("\"${{{}{}{}/{}}}\"", name, op, search, replacement)))
    }

    fn pad(
        &mut self,
        value: &Expression,
        length: &Expression,
        pad: Option<&Expression>,
        at_start: bool,
    ) -> Result<Lowered, CompileError> {
        let value = self.value(value)?;
        let length = self.value(length)?;
        let pad = match pad {
            Some(pad) => self.interpolated(pad)?,
            None => " ".to_string(),
        };
        let var = self.names.fresh("pad");
        let step = if at_start {
            format!("\"{}${{{}}}\"", pad, var)
        } else {
            format!("\"${{{}}}{}\"", var, pad)
        };
        self.pending.extend(template(
            PAD,
            &[("var", var.as_str()), ("value", value.as_str()), ("length", length.as_str()), ("step", step.as_str())],
        ));
        Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_case_conversion_on_variable() {
        let out = body("let s: string = \"abc\";\nlet u: string = string.toUpperCase(s);");
        assert_eq!(out, "s=\"abc\"\nu=\"${s^^}\"\n");
    }

    #[test]
    fn test_method_call_form() {
        let out = body("let s: string = \"abc\";\nlet n: number = s.length;");
        assert_eq!(out, "s=\"abc\"\nn=${#s}\n");
    }

    #[test]
    fn test_literal_gets_temporary() {
        let out = body("let l: string = string.toLowerCase(\"ABC\");");
        assert_eq!(out, "_str_1=\"ABC\"\nl=\"${_str_1,,}\"\n");
    }

    #[test]
    fn test_replace_all() {
        let out = body("let s: string = \"a-b-c\";\nlet t: string = string.replaceAll(s, \"-\", \"+\");");
        assert!(out.ends_with("t=\"${s//\"-\"/\"+\"}\"\n"));
    }

    #[test]
    fn test_starts_with_condition() {
        let out = body("let s: string = \"hello\";\nif (string.startsWith(s, \"he\")) {\n  console.log(\"y\");\n}");
        assert!(out.contains("if [[ \"${s}\" == \"he\"* ]]; then"));
    }

    #[test]
    fn test_split_to_array() {
        let out = body("let parts: string[] = string.split(\"a,b\", \",\");");
        assert_eq!(out, "IFS=\",\" read -r -a _split_1 <<< \"a,b\"\nparts=(\"${_split_1[@]}\")\n");
    }

    #[test]
    fn test_substring() {
        let out = body("let s: string = \"hello\";\nlet t: string = string.substring(s, 1, 3);");
        assert!(out.ends_with("t=\"${s:(1):(3)}\"\n"));
    }

    #[test]
    fn test_pad_start() {
        let out = body("let p: string = string.padStart(\"7\", 3, \"0\");");
        assert!(out.contains("_pad_1=\"7\"\nwhile [ \"${#_pad_1}\" -lt 3 ]; do\n  _pad_1=\"0${_pad_1}\"\ndone\n"));
    }
}
