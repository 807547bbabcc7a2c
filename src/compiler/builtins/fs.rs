//! fs.* lowering over coreutils.

use super::{misrouted, template};
use crate::ast::types::BuiltinCall;
use crate::compiler::{CompileError, Compiler, Lowered};

const TEMP_FOLDER: &str = r#"@var@=""
if command -v mktemp >/dev/null 2>&1; then
  @var@="$(mktemp -d "@base@/@prefix@.XXXXXXXX" 2>/dev/null)" || @var@=""
fi
if [ -z "${@var@}" ]; then
  for @var@_attempt in 1 2 3 4 5 6 7 8 9 10; do
    @var@_candidate="@base@/@prefix@.$$.${RANDOM}${@var@_attempt}"
    if mkdir -m 700 "${@var@_candidate}" 2>/dev/null; then
      @var@="${@var@_candidate}"
      break
    fi
  done
fi
if [ -z "${@var@}" ]; then
  echo "Error: could not create a temporary folder in @base@" >&2
  exit 1
fi"#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_fs(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::FsReadFile { path } => Ok(Lowered::Output(format!("cat {}", self.value(path)?))),
            BuiltinCall::FsWriteFile { path, content } => {
                let content = self.value(content)?;
                let path = self.value(path)?;
                Ok(Lowered::Effect(vec![format!("echo {} > {}", content, path)]))
            }
            BuiltinCall::FsAppendFile { path, content } => {
                let content = self.value(content)?;
                let path = self.value(path)?;
                Ok(Lowered::Effect(vec![format!("echo {} >> {}", content, path)]))
            }
            BuiltinCall::FsExists { path } => Ok(Lowered::Status(format!("[ -e {} ]", self.value(path)?))),
            BuiltinCall::FsDirname { path } => Ok(Lowered::Output(format!("dirname {}", self.value(path)?))),
            BuiltinCall::FsFileName { path } => Ok(Lowered::Output(format!("basename {}", self.value(path)?))),
            BuiltinCall::FsExtension { path } => Ok(Lowered::Output(format!(
                "basename {} | awk -F. 'NF > 1 {{ print $NF }}'",
                self.value(path)?
            ))),
            BuiltinCall::FsParentDirName { path } => Ok(Lowered::Output(format!(
                "basename \"$(dirname {})\"",
                self.value(path)?
            ))),
            BuiltinCall::FsCopy { source, destination } => {
                let source = self.value(source)?;
                let destination = self.value(destination)?;
                Ok(Lowered::Status(format!("cp -r {} {}", source, destination)))
            }
            BuiltinCall::FsMove { source, destination } => {
                let source = self.value(source)?;
                let destination = self.value(destination)?;
                Ok(Lowered::Status(format!("mv {} {}", source, destination)))
            }
            BuiltinCall::FsRename { path, new_name } => {
                let path = self.value(path)?;
                let new_name = self.interpolated(new_name)?;
                Ok(Lowered::Status(format!("mv {p} \"$(dirname {p})/{n}\"", p = path, n = new_name)))
            }
            BuiltinCall::FsDelete { path } => Ok(Lowered::Status(format!("rm -rf {}", self.value(path)?))),
            BuiltinCall::FsCreateTempFolder { prefix, base_dir } => {
                let prefix = match prefix {
                    Some(prefix) => self.interpolated(prefix)?,
                    None => "tmp".to_string(),
                };
                let base = match base_dir {
                    Some(base) => self.interpolated(base)?,
                    None => "${TMPDIR:-/tmp}".to_string(),
                };
                let var = self.names.fresh("temp_dir");
                self.pending.extend(template(
                    TEMP_FOLDER,
                    &[("var", var.as_str()), ("base", base.as_str()), ("prefix", prefix.as_str())],
                ));
                Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
            }
            other => Err(misrouted("fs", other)),
        }
    }
}
