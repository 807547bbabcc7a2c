//! Builtin lowering
//!
//! One module per namespace. Each lowering renders its arguments, pushes
//! any setup lines onto the prelude and returns a `Lowered` form.

mod console;
mod fs;
mod string;
mod array;
mod json;
mod yaml;
mod os;
mod utility;
mod args;
mod env;
mod process;
mod web;
mod script;

use super::{CompileError, Compiler, Lowered};
use crate::ast::types::BuiltinCall;

impl Compiler<'_> {
    pub(super) fn lower_builtin(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        use BuiltinCall::*;
        match call {
            ConsoleLog { .. } | ConsoleError { .. } | ConsoleClear | ConsoleIsSudo | ConsolePromptYesNo { .. }
            | ConsoleShowMessage { .. } | ConsoleShowChoice { .. } | ConsoleShowMultiChoice { .. }
            | ConsoleShowConfirm { .. } | ConsoleShowInput { .. } | ConsoleShowPassword { .. }
            | ConsoleShowProgress { .. } => self.lower_console(call),

            FsReadFile { .. } | FsWriteFile { .. } | FsAppendFile { .. } | FsExists { .. } | FsDirname { .. }
            | FsFileName { .. } | FsExtension { .. } | FsParentDirName { .. } | FsCopy { .. } | FsMove { .. }
            | FsRename { .. } | FsDelete { .. } | FsCreateTempFolder { .. } => self.lower_fs(call),

            StringLength { .. } | StringTrim { .. } | StringToUpperCase { .. } | StringToLowerCase { .. }
            | StringCapitalize { .. } | StringIsEmpty { .. } | StringStartsWith { .. } | StringEndsWith { .. }
            | StringIncludes { .. } | StringReplace { .. } | StringReplaceAll { .. } | StringSplit { .. }
            | StringSubstring { .. } | StringIndexOf { .. } | StringPadStart { .. } | StringPadEnd { .. }
            | StringRepeat { .. } => self.lower_string(call),

            ArrayJoin { .. } | ArraySort { .. } | ArrayMerge { .. } | ArrayShuffle { .. } | ArrayUnique { .. }
            | ArrayPush { .. } | ArrayForEach { .. } => self.lower_array(call),

            JsonParse { .. } | JsonStringify { .. } | JsonIsValid { .. } | JsonGet { .. } | JsonSet { .. }
            | JsonHas { .. } | JsonDelete { .. } | JsonKeys { .. } | JsonValues { .. } | JsonMerge { .. }
            | JsonInstallDependencies => self.lower_json(call),

            YamlParse { .. } | YamlStringify { .. } | YamlIsValid { .. } | YamlGet { .. } | YamlSet { .. }
            | YamlHas { .. } | YamlDelete { .. } | YamlKeys { .. } | YamlValues { .. } | YamlMerge { .. }
            | YamlInstallDependencies => self.lower_yaml(call),

            OsIsInstalled { .. } | OsGetOS | OsGetLinuxVersion => self.lower_os(call),

            UtilityRandom { .. } | UtilityUuid | UtilityHash { .. } | UtilityBase64Encode { .. }
            | UtilityBase64Decode { .. } => self.lower_utility(call),

            ArgsDefine { .. } | ArgsHas { .. } | ArgsGet { .. } | ArgsAll | ArgsShowHelp => self.lower_args(call),

            EnvGet { .. } | EnvSet { .. } | EnvLoad { .. } | EnvDelete { .. } => self.lower_env(call),

            TimerStart | TimerStop | ProcessId | ProcessCpu | ProcessMemory | ProcessElapsedTime
            | ProcessCommand | ProcessStatus => self.lower_process(call),

            WebGet { .. } | WebPost { .. } | WebPut { .. } | WebDelete { .. } => self.lower_web(call),

            ScriptEnableDebug | ScriptDisableDebug | ScriptEnableGlobbing | ScriptDisableGlobbing
            | ScriptExitOnError | ScriptContinueOnError | ScriptDescription { .. } | SchedulerCron { .. }
            | TemplateUpdate { .. } | GitUndoLastCommit => self.lower_script(call),
        }
    }

    /// Name of a shell variable holding the value of `expr`, introducing a
    /// temporary for anything but a plain scalar variable.
    pub(super) fn scalar_name(&mut self, expr: &crate::ast::types::Expression, base: &str) -> Result<String, CompileError> {
        use crate::ast::types::Expression;
        match expr.unparenthesized() {
            Expression::Variable(var) if !var.value_type.is_array() => Ok(var.name.clone()),
            other => {
                let value = self.value(other)?;
                let name = self.names.fresh(base);
                self.pending.push(format!("{}={}", name, value));
                Ok(name)
            }
        }
    }
}

/// Error for a builtin routed to the wrong namespace module.
pub(super) fn misrouted(namespace: &str, call: &BuiltinCall) -> CompileError {
    CompileError::unsupported(format!("{:?} is not a {} builtin", call, namespace))
}

/// Lines of an `if command -v dialog ... elif whiptail ... else ... fi`
/// chain. `tool` receives the dialog program name.
pub(super) fn dialog_chain<F>(tool: F, fallback: Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut lines = vec!["if command -v dialog >/dev/null 2>&1; then".to_string()];
    lines.extend(tool("dialog").into_iter().map(|l| format!("  {}", l)));
    lines.push("elif command -v whiptail >/dev/null 2>&1; then".to_string());
    lines.extend(tool("whiptail").into_iter().map(|l| format!("  {}", l)));
    lines.push("else".to_string());
    lines.extend(fallback.into_iter().map(|l| format!("  {}", l)));
    lines.push("fi".to_string());
    lines
}

/// Expand `@key@` placeholders in a multi-line template, in one pass so
/// substituted text is never expanded again.
pub(super) fn template(text: &str, vars: &[(&str, &str)]) -> Vec<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        for (key, value) in vars {
            if tail.starts_with(key) && tail[key.len()..].starts_with('@') {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
                continue 'scan;
            }
        }
        out.push('@');
        rest = tail;
    }
    out.push_str(rest);
    out.lines().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;
    use crate::parser::parse;

    pub(super) fn body(source: &str) -> String {
        let script = compile(&parse(source).unwrap()).unwrap();
        script.splitn(3, '\n').nth(2).unwrap_or("").to_string()
    }

    #[test]
    fn test_template_single_pass() {
        let lines = super::template("echo @a@ \"${x[@]}\"\necho @b@", &[("a", "@b@"), ("b", "2")]);
        assert_eq!(lines, vec!["echo @b@ \"${x[@]}\"", "echo 2"]);
    }

    #[test]
    fn test_dialog_chain_order() {
        let out = body("console.showInfo(\"Title\", \"Hello\");");
        let dialog = out.find("command -v dialog").unwrap();
        let whiptail = out.find("command -v whiptail").unwrap();
        let fallback = out.find("echo \"[INFO] Title: Hello\"").unwrap();
        assert!(dialog < whiptail && whiptail < fallback);
    }

    #[test]
    fn test_statement_output_discarded() {
        assert_eq!(body("fs.readFile(\"a.txt\");"), "cat \"a.txt\" >/dev/null\n");
    }
}
