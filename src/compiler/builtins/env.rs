//! env.* lowering over exported shell variables.

use super::{misrouted, template};
use crate::ast::types::{BuiltinCall, Expression};
use crate::compiler::expressions::strip_quotes;
use crate::compiler::{CompileError, Compiler, Lowered};

const LOAD: &str = r#"if [ -f @path@ ]; then
  set -a
  . @path@
  set +a
  @var@="true"
else
  @var@="false"
fi"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_env(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::EnvGet { name, default_value } => {
                let default = match default_value {
                    Some(value) => self.interpolated(value)?,
                    None => String::new(),
                };
                match static_name(name) {
                    Some(name) => Ok(Lowered::Word(format!("\"${{{}:-{}}}\"", name, default))),
                    None => {
                        let var = self.scalar_name(name, "env_name")?;
                        Ok(Lowered::Word(format!("\"${{!{}:-{}}}\"", var, default)))
                    }
                }
            }
            BuiltinCall::EnvSet { name, value } => {
                let value = self.value(value)?;
                let line = match static_name(name) {
                    Some(name) => format!("export {}={}", name, value),
                    None => format!("export \"{}={}\"", self.interpolated(name)?, strip_quotes(&value)),
                };
                Ok(Lowered::Effect(vec![line]))
            }
            BuiltinCall::EnvLoad { path } => {
                let path = match path {
                    Some(path) => self.value(path)?,
                    None => "\".env\"".to_string(),
                };
                let var = self.names.fresh("env_loaded");
                self.pending.extend(template(LOAD, &[("var", var.as_str()), ("path", path.as_str())]));
                Ok(Lowered::Flag(var))
            }
            BuiltinCall::EnvDelete { name } => match static_name(name) {
                Some(name) => Ok(Lowered::Effect(vec![format!("unset {}", name)])),
                None => Ok(Lowered::Effect(vec![format!("unset {}", self.value(name)?)])),
            },
            other => Err(misrouted("env", other)),
        }
    }
}

/// The variable name when `name` is a string literal that is a valid
/// shell identifier.
fn static_name(name: &Expression) -> Option<&str> {
    let text = name.unparenthesized().as_string_literal()?;
    let mut chars = text.chars();
    let first = chars.next()?;
    if (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_get_with_default() {
        let out = body("let home: string = env.get(\"HOME_DIR\", \"/tmp\");");
        assert_eq!(out, "home=\"${HOME_DIR:-/tmp}\"\n");
    }

    #[test]
    fn test_get_dynamic_name() {
        let out = body("let key: string = \"PATH\";\nlet v: string = env.get(key);");
        assert_eq!(out, "key=\"PATH\"\nv=\"${!key:-}\"\n");
    }

    #[test]
    fn test_set_exports() {
        assert_eq!(body("env.set(\"MODE\", \"prod\");"), "export MODE=\"prod\"\n");
    }

    #[test]
    fn test_load_default_file() {
        let out = body("env.load();");
        assert!(out.starts_with("if [ -f \".env\" ]; then\n  set -a\n  . \".env\"\n  set +a\n  _env_loaded_1=\"true\"\n"));
    }

    #[test]
    fn test_load_result_bound() {
        let out = body("let loaded: boolean = env.load(\"app.env\");");
        assert!(out.ends_with("loaded=\"${_env_loaded_1}\"\n"));
    }
}
