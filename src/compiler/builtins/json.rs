//! json.* lowering over jq.

use super::{misrouted, template};
use crate::ast::types::{BuiltinCall, Expression};
use crate::compiler::{CompileError, Compiler, Lowered};

const INSTALL_JQ: &str = r#"@var@="false"
if command -v jq >/dev/null 2>&1; then
  @var@="true"
elif command -v apt-get >/dev/null 2>&1; then
  sudo apt-get update -qq && sudo apt-get install -y -qq jq && @var@="true"
elif command -v dnf >/dev/null 2>&1; then
  sudo dnf install -y -q jq && @var@="true"
elif command -v yum >/dev/null 2>&1; then
  sudo yum install -y -q jq && @var@="true"
elif command -v brew >/dev/null 2>&1; then
  brew install jq && @var@="true"
else
  echo "Error: jq is not installed and no supported package manager was found" >&2
fi"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_json(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::JsonParse { value } => Ok(Lowered::Output(format!("{} | jq -c '.'", self.feed(value)?))),
            BuiltinCall::JsonStringify { value, pretty } => {
                let filter = match pretty.as_ref().map(Expression::unparenthesized) {
                    Some(Expression::Literal(lit)) if lit.value == "true" => "jq '.'",
                    _ => "jq -c '.'",
                };
                Ok(Lowered::Output(format!("{} | {}", self.feed(value)?, filter)))
            }
            BuiltinCall::JsonIsValid { value } => Ok(Lowered::Status(format!(
                "{} | jq -e . >/dev/null 2>&1",
                self.feed(value)?
            ))),
            BuiltinCall::JsonGet { json, path } => {
                let feed = self.feed(json)?;
                let path = self.value(path)?;
                Ok(Lowered::Output(format!("{} | jq -r {}", feed, path)))
            }
            BuiltinCall::JsonSet { json, path, value } => {
                let feed = self.feed(json)?;
                let path = self.interpolated(path)?;
                let value = self.value(value)?;
                Ok(Lowered::Output(format!(
                    "{} | jq -c --arg v {} \"{} = (\\$v | fromjson? // \\$v)\"",
                    feed, value, path
                )))
            }
            BuiltinCall::JsonHas { json, path } => {
                let feed = self.feed(json)?;
                let path = self.interpolated(path)?;
                Ok(Lowered::Status(format!("{} | jq -e \"{} != null\" >/dev/null 2>&1", feed, path)))
            }
            BuiltinCall::JsonDelete { json, path } => {
                let feed = self.feed(json)?;
                let path = self.interpolated(path)?;
                Ok(Lowered::Output(format!("{} | jq -c \"del({})\"", feed, path)))
            }
            BuiltinCall::JsonKeys { json } => self.collect(json, "keys", "jq -r 'keys[]'"),
            BuiltinCall::JsonValues { json } => self.collect(json, "values", "jq -r '.[] | tostring'"),
            BuiltinCall::JsonMerge { first, second } => {
                let first = self.value(first)?;
                let second = self.value(second)?;
                Ok(Lowered::Output(format!(
                    "jq -c -n --argjson a {} --argjson b {} '$a * $b'",
                    first, second
                )))
            }
            BuiltinCall::JsonInstallDependencies => {
                let var = self.names.fresh("deps");
                self.pending.extend(template(INSTALL_JQ, &[("var", var.as_str())]));
                Ok(Lowered::Flag(var))
            }
            other => Err(misrouted("json", other)),
        }
    }

    /// `printf '%s' <value>`, the head of a pipeline into jq or yq.
    pub(super) fn feed(&mut self, value: &Expression) -> Result<String, CompileError> {
        Ok(format!("printf '%s' {}", self.value(value)?))
    }

    /// Lines printed by `command` over `source`, gathered into an array.
    pub(super) fn collect(&mut self, source: &Expression, base: &str, command: &str) -> Result<Lowered, CompileError> {
        let feed = self.feed(source)?;
        let var = self.names.fresh(base);
        self.pending.push(format!("mapfile -t {} < <({} | {})", var, feed, command));
        Ok(Lowered::Array(format!("\"${{{}[@]}}\"", var)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_get() {
        let out = body("let doc: string = \"{}\";\nlet name: string = json.get(doc, \".name\");");
        assert_eq!(out, "doc=\"{}\"\nname=\"$(printf '%s' \"${doc}\" | jq -r \".name\")\"\n");
    }

    #[test]
    fn test_is_valid_condition() {
        let out = body("let doc: string = \"{}\";\nif (json.isValid(doc)) {\n  console.log(\"ok\");\n}");
        assert!(out.contains("if printf '%s' \"${doc}\" | jq -e . >/dev/null 2>&1; then"));
    }

    #[test]
    fn test_pretty_stringify() {
        let out = body("let doc: string = \"{}\";\nconsole.log(json.stringify(doc, true));");
        assert!(out.ends_with("echo \"$(printf '%s' \"${doc}\" | jq '.')\"\n"));
    }

    #[test]
    fn test_keys_to_array() {
        let out = body("let doc: string = \"{}\";\nlet ks: string[] = json.keys(doc);");
        assert!(out.contains("mapfile -t _keys_1 < <(printf '%s' \"${doc}\" | jq -r 'keys[]')"));
        assert!(out.ends_with("ks=(\"${_keys_1[@]}\")\n"));
    }

    #[test]
    fn test_install_dependencies_tiers() {
        let out = body("let ok: boolean = json.installDependencies();");
        let apt = out.find("apt-get install").unwrap();
        let brew = out.find("brew install").unwrap();
        assert!(apt < brew);
        assert!(out.ends_with("ok=\"${_deps_1}\"\n"));
    }
}
