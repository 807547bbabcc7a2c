//! yaml.* lowering over yq (mikefarah, v4 syntax).

use super::{misrouted, template};
use crate::ast::types::BuiltinCall;
use crate::compiler::{CompileError, Compiler, Lowered};

const INSTALL_YQ: &str = r#"@var@="false"
if command -v yq >/dev/null 2>&1; then
  @var@="true"
elif command -v apt-get >/dev/null 2>&1; then
  sudo apt-get update -qq && sudo apt-get install -y -qq yq && @var@="true"
elif command -v snap >/dev/null 2>&1; then
  sudo snap install yq && @var@="true"
elif command -v brew >/dev/null 2>&1; then
  brew install yq && @var@="true"
else
  echo "Error: yq is not installed and no supported package manager was found" >&2
fi"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_yaml(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::YamlParse { value } => Ok(Lowered::Output(format!("{} | yq '.'", self.feed(value)?))),
            BuiltinCall::YamlStringify { value } => Ok(Lowered::Output(format!("{} | yq -P '.'", self.feed(value)?))),
            BuiltinCall::YamlIsValid { value } => Ok(Lowered::Status(format!(
                "{} | yq '.' >/dev/null 2>&1",
                self.feed(value)?
            ))),
            BuiltinCall::YamlGet { yaml, path } => {
                let feed = self.feed(yaml)?;
                let path = self.value(path)?;
                Ok(Lowered::Output(format!("{} | yq {}", feed, path)))
            }
            BuiltinCall::YamlSet { yaml, path, value } => {
                let feed = self.feed(yaml)?;
                let path = self.interpolated(path)?;
                let value = self.value(value)?;
                Ok(Lowered::Output(format!(
                    "{} | TYPESHELL_VALUE={} yq \"{} = strenv(TYPESHELL_VALUE)\"",
                    feed, value, path
                )))
            }
            BuiltinCall::YamlHas { yaml, path } => {
                let feed = self.feed(yaml)?;
                let path = self.interpolated(path)?;
                Ok(Lowered::Status(format!("{} | yq -e \"{}\" >/dev/null 2>&1", feed, path)))
            }
            BuiltinCall::YamlDelete { yaml, path } => {
                let feed = self.feed(yaml)?;
                let path = self.interpolated(path)?;
                Ok(Lowered::Output(format!("{} | yq \"del({})\"", feed, path)))
            }
            BuiltinCall::YamlKeys { yaml } => self.collect(yaml, "keys", "yq 'keys | .[]'"),
            BuiltinCall::YamlValues { yaml } => self.collect(yaml, "values", "yq '.[]'"),
            BuiltinCall::YamlMerge { first, second } => {
                let first = self.value(first)?;
                let second = self.value(second)?;
                Ok(Lowered::Output(format!(
                    "yq eval-all '. as $item ireduce ({{}}; . * $item)' <(printf '%s' {}) <(printf '%s' {})",
                    first, second
                )))
            }
            BuiltinCall::YamlInstallDependencies => {
                let var = self.names.fresh("deps");
                self.pending.extend(template(INSTALL_YQ, &[("var", var.as_str())]));
                Ok(Lowered::Flag(var))
            }
            other => Err(misrouted("yaml", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_set_uses_strenv() {
        let out = body("let doc: string = \"a: 1\";\nlet next: string = yaml.set(doc, \".a\", \"2\");");
        assert!(out.ends_with(
            "next=\"$(printf '%s' \"${doc}\" | TYPESHELL_VALUE=\"2\" yq \".a = strenv(TYPESHELL_VALUE)\")\"\n"
        ));
    }

    #[test]
    fn test_merge() {
        let out = body("let a: string = \"x: 1\";\nlet b: string = \"y: 2\";\nlet m: string = yaml.merge(a, b);");
        assert!(out.contains("yq eval-all '. as $item ireduce ({}; . * $item)' <(printf '%s' \"${a}\") <(printf '%s' \"${b}\")"));
    }

    #[test]
    fn test_has_condition() {
        let out = body("let doc: string = \"a: 1\";\nif (yaml.has(doc, \".a\")) {\n  console.log(\"y\");\n}");
        assert!(out.contains("if printf '%s' \"${doc}\" | yq -e \".a\" >/dev/null 2>&1; then"));
    }
}
