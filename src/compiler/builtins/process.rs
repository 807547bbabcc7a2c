//! timer.* and process.* lowering.

use super::misrouted;
use crate::ast::types::BuiltinCall;
use crate::compiler::{CompileError, Compiler, Lowered};

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_process(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::TimerStart => {
                self.usage.timer = true;
                Ok(Lowered::Effect(vec!["_TIMER_START=\"$(__timer_now_ms)\"".to_string()]))
            }
            BuiltinCall::TimerStop => {
                self.usage.timer = true;
                Ok(Lowered::Word("$(( $(__timer_now_ms) - _TIMER_START ))".to_string()))
            }
            BuiltinCall::ProcessId => Ok(Lowered::Word("$$".to_string())),
            BuiltinCall::ProcessCpu => Ok(Lowered::Output(ps_field("%cpu"))),
            BuiltinCall::ProcessMemory => Ok(Lowered::Output(ps_field("%mem"))),
            BuiltinCall::ProcessElapsedTime => Ok(Lowered::Output(ps_field("etime"))),
            BuiltinCall::ProcessCommand => Ok(Lowered::Output("ps -o args= -p $$".to_string())),
            BuiltinCall::ProcessStatus => Ok(Lowered::Output(ps_field("stat"))),
            other => Err(misrouted("process", other)),
        }
    }
}

/// One `ps` column for the current shell, padding removed.
fn ps_field(field: &str) -> String {
    format!("ps -o {}= -p $$ | tr -d ' '", field)
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_timer_emits_helper() {
        let out = body("timer.start();\nlet ms: number = timer.stop();");
        assert!(out.starts_with("_TIMER_START=0\n"));
        assert!(out.contains("__timer_now_ms() {"));
        assert!(out.ends_with("_TIMER_START=\"$(__timer_now_ms)\"\nms=$(( $(__timer_now_ms) - _TIMER_START ))\n"));
    }

    #[test]
    fn test_process_fields() {
        let out = body("let pid: number = process.id();\nlet cpu: string = process.cpu();");
        assert_eq!(out, "pid=$$\ncpu=\"$(ps -o %cpu= -p $$ | tr -d ' ')\"\n");
    }
}
