//! Runtime helper functions
//!
//! Shell functions emitted once at the top of a script. Only the helper
//! families the program actually uses are written; usage is recorded while
//! builtins are lowered.

use indexmap::IndexMap;

use super::ShellWriter;
use crate::ast::types::ValueType;

/// Helper families a compilation needs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HelperUsage {
    pub args: bool,
    pub timer: bool,
}

/// One `args.define(...)` entry, keyed by its long flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDefinition {
    pub short_flag: String,
    pub description: String,
    pub arg_type: ValueType,
    pub required: bool,
    /// Double-quote text of the default value
    pub default_value: Option<String>,
}

const ARGS_RUNTIME: &str = r#"_SCRIPT_ARGS=("$@")

__args_has() {
  local long="$1" short="$2" arg
  for arg in "${_SCRIPT_ARGS[@]}"; do
    if [ "${arg}" = "${long}" ] || [ "${arg%%=*}" = "${long}" ]; then
      return 0
    fi
    if [ -n "${short}" ] && [ "${arg}" = "${short}" ]; then
      return 0
    fi
  done
  return 1
}

__args_get() {
  local long="$1" short="$2" default="$3" arg i
  for ((i = 0; i < ${#_SCRIPT_ARGS[@]}; i++)); do
    arg="${_SCRIPT_ARGS[i]}"
    case "${arg}" in
      "${long}="*)
        echo "${arg#*=}"
        return 0
        ;;
    esac
    if [ "${arg}" = "${long}" ] || { [ -n "${short}" ] && [ "${arg}" = "${short}" ]; }; then
      echo "${_SCRIPT_ARGS[i + 1]}"
      return 0
    fi
  done
  echo "${default}"
}"#;

const TIMER_RUNTIME: &str = r#"_TIMER_START=0

__timer_now_ms() {
  local now
  now="$(date +%s%3N 2>/dev/null)"
  case "${now}" in
    ''|*N*) echo $(( $(date +%s) * 1000 )) ;;
    *) echo "${now}" ;;
  esac
}"#;

/// Write the used helper families, each followed by a blank line.
pub fn write_helpers(
    out: &mut ShellWriter,
    usage: &HelperUsage,
    args: &IndexMap<String, ArgDefinition>,
    description: Option<&str>,
) {
    if usage.args {
        out.raw(ARGS_RUNTIME);
        out.line("");
        write_help(out, args, description);
        out.line("");
    }
    if usage.timer {
        out.raw(TIMER_RUNTIME);
        out.line("");
    }
}

/// `__args_show_help`, generated from the definitions in declaration order.
fn write_help(out: &mut ShellWriter, args: &IndexMap<String, ArgDefinition>, description: Option<&str>) {
    out.line("__args_show_help() {");
    out.indent();
    out.line("echo \"Usage: $(basename \"$0\") [options]\"");
    if let Some(text) = description {
        out.line("echo \"\"");
        out.line(&format!("echo \"{}\"", text));
    }
    out.line("echo \"\"");
    out.line("echo \"Options:\"");
    for (long, def) in args {
        let flags = if def.short_flag.is_empty() {
            long.clone()
        } else {
            format!("{}, {}", long, def.short_flag)
        };
        let mut details = vec![def.arg_type.as_str().to_string()];
        if def.required {
            details.push("required".to_string());
        }
        if let Some(default) = &def.default_value {
            details.push(format!("default: {}", default));
        }
        out.line(&format!(
            "echo \"  {}  {} ({})\"",
            flags,
            def.description,
            details.join(", ")
        ));
    }
    out.dedent();
    out.line("}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_used() {
        let mut out = ShellWriter::new();
        write_helpers(&mut out, &HelperUsage::default(), &IndexMap::new(), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_timer_only() {
        let mut out = ShellWriter::new();
        let usage = HelperUsage { timer: true, ..HelperUsage::default() };
        write_helpers(&mut out, &usage, &IndexMap::new(), None);
        let text = out.finish();
        assert!(text.contains("__timer_now_ms() {"));
        assert!(!text.contains("__args_has"));
    }

    #[test]
    fn test_help_keeps_declaration_order() {
        let mut args = IndexMap::new();
        for (long, short) in [("--zeta", "-z"), ("--alpha", "")] {
            args.insert(
                long.to_string(),
                ArgDefinition {
                    short_flag: short.to_string(),
                    description: "Some flag".to_string(),
                    arg_type: ValueType::String,
                    required: long == "--zeta",
                    default_value: None,
                },
            );
        }
        let mut out = ShellWriter::new();
        let usage = HelperUsage { args: true, ..HelperUsage::default() };
        write_helpers(&mut out, &usage, &args, Some("Deploys things"));
        let text = out.finish();
        let zeta = text.find("--zeta, -z  Some flag (string, required)").unwrap();
        let alpha = text.find("--alpha  Some flag (string)").unwrap();
        assert!(zeta < alpha);
        assert!(text.contains("echo \"Deploys things\""));
    }
}
