//! utility.* lowering: random numbers, ids, hashes and base64.

use super::{misrouted, template};
use crate::ast::types::BuiltinCall;
use crate::compiler::{CompileError, Compiler, Lowered};

const RANDOM_RANGE: &str = r#"_random_min_@id@=$((@min@))
_random_max_@id@=$((@max@))
if [ "${_random_min_@id@}" -gt "${_random_max_@id@}" ]; then
  echo "Error: utility.random() min (${_random_min_@id@}) is greater than max (${_random_max_@id@})" >&2
  exit 100
fi"#;

const UUID: &str = r#"if command -v uuidgen >/dev/null 2>&1; then
  @var@="$(uuidgen | tr '[:upper:]' '[:lower:]')"
elif command -v python3 >/dev/null 2>&1; then
  @var@="$(python3 -c 'import uuid; print(uuid.uuid4())')"
else
  @var@="$(printf '%04x%04x-%04x-%04x-%04x-%04x%04x%04x' "${RANDOM}" "${RANDOM}" "${RANDOM}" \
    "$(((RANDOM & 0x0fff) | 0x4000))" "$(((RANDOM & 0x3fff) | 0x8000))" "${RANDOM}" "${RANDOM}" "${RANDOM}")"
fi"#;

const HASH: &str = r#"case @algorithm@ in
  md5) @var@="$(printf '%s' @text@ | md5sum | cut -d' ' -f1)" ;;
  sha1) @var@="$(printf '%s' @text@ | sha1sum | cut -d' ' -f1)" ;;
  sha256) @var@="$(printf '%s' @text@ | sha256sum | cut -d' ' -f1)" ;;
  sha512) @var@="$(printf '%s' @text@ | sha512sum | cut -d' ' -f1)" ;;
  *)
    echo "Error: unsupported hash algorithm: "@algorithm@ >&2
    exit 1
    ;;
esac"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_utility(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::UtilityRandom { min, max } => {
                let min = match min {
                    Some(min) => self.arithmetic(min)?,
                    None => "0".to_string(),
                };
                let max = match max {
                    Some(max) => self.arithmetic(max)?,
                    None => "32767".to_string(),
                };
                let id = self.names.next_id().to_string();
                self.pending.extend(template(
                    RANDOM_RANGE,
                    &[("id", id.as_str()), ("min", min.as_str()), ("max", max.as_str())],
                ));
                Ok(Lowered::Word(format!(
                    "$((RANDOM % (_random_max_{id} - _random_min_{id} + 1) + _random_min_{id}))",
                    id = id
                )))
            }
            BuiltinCall::UtilityUuid => {
                let var = self.names.fresh("uuid");
                self.pending.extend(template(UUID, &[("var", var.as_str())]));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            BuiltinCall::UtilityHash { text, algorithm } => {
                let text = self.value(text)?;
                let algorithm = match algorithm {
                    Some(algorithm) => self.value(algorithm)?,
                    None => "\"sha256\"".to_string(),
                };
                let var = self.names.fresh("hash");
                self.pending.extend(template(
                    HASH,
                    &[("var", var.as_str()), ("text", text.as_str()), ("algorithm", algorithm.as_str())],
                ));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            BuiltinCall::UtilityBase64Encode { text } => Ok(Lowered::Output(format!(
                "printf '%s' {} | base64 | tr -d '\\n'",
                self.value(text)?
            ))),
            BuiltinCall::UtilityBase64Decode { text } => Ok(Lowered::Output(format!(
                "printf '%s' {} | base64 -d",
                self.value(text)?
            ))),
            other => Err(misrouted("utility", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_random_range_guard() {
        let out = body("let n: number = utility.random(1, 6);");
        assert_eq!(
            out,
            "_random_min_1=$((1))\n_random_max_1=$((6))\n\
             if [ \"${_random_min_1}\" -gt \"${_random_max_1}\" ]; then\n\
             \x20 echo \"Error: utility.random() min (${_random_min_1}) is greater than max (${_random_max_1})\" >&2\n\
             \x20 exit 100\nfi\n\
             n=$((RANDOM % (_random_max_1 - _random_min_1 + 1) + _random_min_1))\n"
        );
    }

    #[test]
    fn test_random_defaults() {
        let out = body("let n: number = utility.random();");
        assert!(out.starts_with("_random_min_1=$((0))\n_random_max_1=$((32767))\n"));
    }

    #[test]
    fn test_uuid_tiers() {
        let out = body("let id: string = utility.uuid();");
        let uuidgen = out.find("uuidgen").unwrap();
        let python = out.find("python3 -c").unwrap();
        let fallback = out.find("printf '%04x%04x").unwrap();
        assert!(uuidgen < python && python < fallback);
    }

    #[test]
    fn test_hash_defaults_to_sha256() {
        let out = body("let h: string = utility.hash(\"abc\");");
        assert!(out.starts_with("case \"sha256\" in\n"));
        assert!(out.contains("  sha256) _hash_1=\"$(printf '%s' \"abc\" | sha256sum | cut -d' ' -f1)\" ;;"));
        assert!(out.ends_with("h=\"${_hash_1}\"\n"));
    }

    #[test]
    fn test_base64_encode() {
        let out = body("console.log(utility.base64Encode(\"hi\"));");
        assert_eq!(out, "echo \"$(printf '%s' \"hi\" | base64 | tr -d '\\n')\"\n");
    }
}
