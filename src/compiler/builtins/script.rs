//! script.*, scheduler.cron, template.update and git.* lowering.

use super::misrouted;
use crate::ast::types::{BuiltinCall, Expression, LambdaExpression, ProgramNode};
use crate::compiler::expressions::single_quote;
use crate::compiler::{CompileError, Compiler, Lowered};

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_script(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        let line = match call {
            BuiltinCall::ScriptEnableDebug => "set -x",
            BuiltinCall::ScriptDisableDebug => "set +x",
            BuiltinCall::ScriptEnableGlobbing => "set +f",
            BuiltinCall::ScriptDisableGlobbing => "set -f",
            BuiltinCall::ScriptExitOnError => "set -e",
            BuiltinCall::ScriptContinueOnError => "set +e",
            BuiltinCall::ScriptDescription { text } => {
                self.description = Some(text.clone());
                return Ok(Lowered::Effect(Vec::new()));
            }
            BuiltinCall::SchedulerCron { pattern, job } => return self.cron(pattern, job),
            BuiltinCall::TemplateUpdate { source, target } => {
                let source = self.value(source)?;
                let target = self.value(target)?;
                return Ok(Lowered::Status(format!("envsubst < {} > {}", source, target)));
            }
            BuiltinCall::GitUndoLastCommit => return Ok(Lowered::Status("git reset --soft HEAD~1".to_string())),
            other => return Err(misrouted("script", other)),
        };
        Ok(Lowered::Effect(vec![line.to_string()]))
    }

    /// Compile the job as its own script, write it under
    /// `~/.typeshell/cron` and replace any crontab entry for that file.
    fn cron(&mut self, pattern: &Expression, job: &LambdaExpression) -> Result<Lowered, CompileError> {
        let pattern = self.interpolated(pattern)?;
        let program = ProgramNode { statements: job.body.clone() };
        let script = Compiler::new(self.options).compile(&program)?;

        let id = self.names.next_id();
        let file = format!("_cron_job_{}", id);
        let mut lines = vec![
            format!("{}=\"${{HOME}}/.typeshell/cron/job_{}.sh\"", file, id),
            format!("mkdir -p \"$(dirname \"${{{}}}\")\"", file),
            "{".to_string(),
        ];
        for line in script.lines() {
            lines.push(format!("  printf '%s\\n' {}", single_quote(line)));
        }
        lines.push(format!("}} > \"${{{}}}\"", file));
        lines.push(format!("chmod +x \"${{{}}}\"", file));
        lines.push(format!(
            "( crontab -l 2>/dev/null | grep -Fv \"${{{f}}}\"; echo \"{p} ${{{f}}}\" ) | crontab -",
            f = file,
            p = pattern
        ));
        tracing::debug!(pattern = %pattern, lines = script.lines().count(), "compiled cron job");
        Ok(Lowered::Effect(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_shell_options() {
        let out = body("script.enableDebug();\nscript.disableGlobbing();\nscript.continueOnError();");
        assert_eq!(out, "set -x\nset -f\nset +e\n");
    }

    #[test]
    fn test_description_in_help() {
        let out = body("script.description(\"Backs up the database\");\nargs.showHelp();");
        assert!(out.contains("echo \"Backs up the database\""));
        assert!(out.ends_with("__args_show_help\n"));
    }

    #[test]
    fn test_cron_writes_job_script() {
        let out = body("scheduler.cron(\"0 * * * *\", () => {\n  console.log(\"tick\");\n});");
        assert!(out.starts_with("_cron_job_1=\"${HOME}/.typeshell/cron/job_1.sh\"\n"));
        assert!(out.contains("  printf '%s\\n' '#!/bin/bash'\n"));
        assert!(out.contains("  printf '%s\\n' 'echo \"tick\"'\n"));
        assert!(out.contains("echo \"0 * * * * ${_cron_job_1}\" ) | crontab -"));
    }

    #[test]
    fn test_template_update() {
        assert_eq!(
            body("template.update(\"app.tmpl\", \"app.conf\");"),
            "envsubst < \"app.tmpl\" > \"app.conf\"\n"
        );
    }
}
