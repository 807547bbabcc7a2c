//! args.* lowering over the `__args_*` runtime helpers.

use super::misrouted;
use crate::ast::types::BuiltinCall;
use crate::compiler::{ArgDefinition, CompileError, Compiler, Lowered};

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_args(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        self.usage.args = true;
        match call {
            BuiltinCall::ArgsDefine { long_flag, short_flag, description, arg_type, required, default_value } => {
                let default_value = match default_value {
                    Some(value) => Some(self.interpolated(value)?),
                    None => None,
                };
                if self.args.contains_key(long_flag) {
                    tracing::warn!(flag = %long_flag, "argument defined twice, keeping the last definition");
                }
                self.args.insert(
                    long_flag.clone(),
                    ArgDefinition {
                        short_flag: short_flag.clone(),
                        description: description.clone(),
                        arg_type: *arg_type,
                        required: *required,
                        default_value,
                    },
                );
                if !*required {
                    return Ok(Lowered::Effect(Vec::new()));
                }
                Ok(Lowered::Effect(vec![
                    format!("if ! __args_has \"{}\" \"{}\"; then", long_flag, short_flag),
                    format!("  echo \"Error: missing required argument {}\" >&2", long_flag),
                    "  __args_show_help >&2".to_string(),
                    "  exit 1".to_string(),
                    "fi".to_string(),
                ]))
            }
            BuiltinCall::ArgsHas { flag } => {
                let (long, short, _) = self.resolve_flag(flag);
                Ok(Lowered::Status(format!("__args_has \"{}\" \"{}\"", long, short)))
            }
            BuiltinCall::ArgsGet { flag } => {
                let (long, short, default) = self.resolve_flag(flag);
                Ok(Lowered::Output(format!("__args_get \"{}\" \"{}\" \"{}\"", long, short, default)))
            }
            BuiltinCall::ArgsAll => Ok(Lowered::Array("\"${_SCRIPT_ARGS[@]}\"".to_string())),
            BuiltinCall::ArgsShowHelp => Ok(Lowered::Effect(vec!["__args_show_help".to_string()])),
            other => Err(misrouted("args", other)),
        }
    }

    /// Long flag, short flag and default text for a flag given in either
    /// form. Undefined flags match only themselves.
    fn resolve_flag(&self, flag: &str) -> (String, String, String) {
        if let Some(def) = self.args.get(flag) {
            return (flag.to_string(), def.short_flag.clone(), def.default_value.clone().unwrap_or_default());
        }
        if let Some((long, def)) = self.args.iter().find(|(_, def)| !flag.is_empty() && def.short_flag == flag) {
            return (long.clone(), def.short_flag.clone(), def.default_value.clone().unwrap_or_default());
        }
        tracing::debug!(flag = %flag, "flag used before args.define()");
        (flag.to_string(), String::new(), String::new())
    }
}
