//! os.* lowering.

use super::{misrouted, template};
use crate::ast::types::BuiltinCall;
use crate::compiler::{CompileError, Compiler, Lowered};

const GET_OS: &str = "case \"$(uname -s)\" in Linux*) echo linux ;; Darwin*) echo macos ;; \
CYGWIN*|MINGW*|MSYS*) echo windows ;; *) echo unknown ;; esac";

const LINUX_VERSION: &str = r#"@var@=""
if [ -f /etc/os-release ]; then
  @var@="$(. /etc/os-release && echo "${VERSION_ID}")"
fi
if [ -z "${@var@}" ] && command -v lsb_release >/dev/null 2>&1; then
  @var@="$(lsb_release -rs 2>/dev/null)"
fi
if [ -z "${@var@}" ] && [ -f /etc/lsb-release ]; then
  @var@="$(. /etc/lsb-release && echo "${DISTRIB_RELEASE}")"
fi"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_os(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::OsIsInstalled { app } => Ok(Lowered::Status(format!(
                "command -v {} >/dev/null 2>&1",
                self.value(app)?
            ))),
            BuiltinCall::OsGetOS => Ok(Lowered::Output(GET_OS.to_string())),
            BuiltinCall::OsGetLinuxVersion => {
                let var = self.names.fresh("linux_version");
                self.pending.extend(template(LINUX_VERSION, &[("var", var.as_str())]));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            other => Err(misrouted("os", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_is_installed() {
        let out = body("if (!os.isInstalled(\"git\")) {\n  console.error(\"missing\");\n}");
        assert!(out.starts_with("if ! command -v \"git\" >/dev/null 2>&1; then\n"));
    }

    #[test]
    fn test_get_os() {
        let out = body("let name: string = os.getOS();");
        assert!(out.starts_with("name=\"$(case \"$(uname -s)\" in Linux*) echo linux ;;"));
    }

    #[test]
    fn test_linux_version_tiers() {
        let out = body("let v: string = os.getLinuxVersion();");
        let release = out.find("/etc/os-release").unwrap();
        let lsb = out.find("lsb_release -rs").unwrap();
        let file = out.find("/etc/lsb-release").unwrap();
        assert!(release < lsb && lsb < file);
        assert!(out.ends_with("v=\"${_linux_version_1}\"\n"));
    }
}
