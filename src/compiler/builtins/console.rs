//! console.* lowering: output, prompts and dialog boxes.
//!
//! Dialog builtins try `dialog`, then `whiptail`, then plain `read`/`echo`.

use super::{dialog_chain, misrouted, template};
use crate::ast::types::{BuiltinCall, Expression, MessageKind};
use crate::compiler::{CompileError, Compiler, Lowered};

const PROMPT_YES_NO: &str = r#"while true; do
  read -r -p "@prompt@ (y/n): " @var@
  case "${@var@}" in
    [Yy]*) @var@="true"; break ;;
    [Nn]*) @var@="false"; break ;;
    *) echo "Please answer yes or no." ;;
  esac
done"#;

const CHOICE_SETUP: &str = r#"@var@_options=(@options@)
@var@=""
@var@_menu=()
for @var@_i in "${!@var@_options[@]}"; do
  @var@_menu+=("${@var@_i}" "${@var@_options[@var@_i]}")
done"#;

const CHOICE_DIALOG: &str = r#"if @var@_index="$(@tool@ --title @title@@default_item@ --menu @message@ 15 60 8 "${@var@_menu[@]}" 3>&1 1>&2 2>&3)"; then
  @var@="${@var@_options[@var@_index]}"
fi"#;

const CHOICE_FALLBACK: &str = r#"echo @message@
for @var@_i in "${!@var@_options[@]}"; do
  echo "  $((@var@_i + 1))) ${@var@_options[@var@_i]}"
done
read -r -p "Enter choice [1-${#@var@_options[@]}]: " @var@_index
@var@_index="${@var@_index:-@default@}"
@var@="${@var@_options[@var@_index - 1]}""#;

const MULTI_SETUP: &str = r#"@var@_options=(@options@)
@var@_defaults=(@defaults@)
@var@=()
@var@_menu=()
for @var@_i in "${!@var@_options[@]}"; do
  @var@_state="off"
  if [[ " ${@var@_defaults[*]} " == *" ${@var@_options[@var@_i]} "* ]]; then
    @var@_state="on"
  fi
  @var@_menu+=("${@var@_i}" "${@var@_options[@var@_i]}" "${@var@_state}")
done"#;

const MULTI_DIALOG: &str = r#"@var@_picked="$(@tool@ --title @title@ --separate-output --checklist @message@ 15 60 8 "${@var@_menu[@]}" 3>&1 1>&2 2>&3)" || @var@_picked=""
while read -r @var@_i; do
  [ -n "${@var@_i}" ] && @var@+=("${@var@_options[@var@_i]}")
done <<< "${@var@_picked}""#;

const MULTI_FALLBACK: &str = r#"echo @message@
for @var@_i in "${!@var@_options[@]}"; do
  echo "  $((@var@_i + 1))) ${@var@_options[@var@_i]}"
done
read -r -p "Enter choices separated by spaces: " @var@_picked
for @var@_i in ${@var@_picked}; do
  @var@+=("${@var@_options[@var@_i - 1]}")
done"#;

const CONFIRM_DIALOG: &str = r#"if @tool@ --title @title@@default_no@ --yesno @message@ 10 60; then
  @var@="true"
else
  @var@="false"
fi"#;

const CONFIRM_FALLBACK: &str = r#"read -r -p "@prompt@ @hint@: " @var@_answer
case "${@var@_answer:-@default@}" in
  [Yy]*) @var@="true" ;;
  *) @var@="false" ;;
esac"#;

const INPUT_DIALOG: &str = r#"@var@="$(@tool@ --title @title@ --@box@ @message@ 10 60 @default@ 3>&1 1>&2 2>&3)" || @var@="""#;

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_console(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::ConsoleLog { message } => {
                let message = self.value(message)?;
                Ok(Lowered::Effect(vec![format!("echo {}", message)]))
            }
            BuiltinCall::ConsoleError { message } => {
                let message = self.value(message)?;
                Ok(Lowered::Effect(vec![format!("echo {} >&2", message)]))
            }
            BuiltinCall::ConsoleClear => Ok(Lowered::Effect(vec!["clear".to_string()])),
            BuiltinCall::ConsoleIsSudo => Ok(Lowered::Status("[ \"$(id -u)\" -eq 0 ]".to_string())),
            BuiltinCall::ConsolePromptYesNo { prompt } => {
                let prompt = self.interpolated(prompt)?;
                let var = self.names.fresh("answer");
                self.pending.extend(template(PROMPT_YES_NO, &[("prompt", prompt.as_str()), ("var", var.as_str())]));
                Ok(Lowered::Flag(var))
            }
            BuiltinCall::ConsoleShowMessage { kind, title, message } => self.message_box(*kind, title, message),
            BuiltinCall::ConsoleShowChoice { title, message, options, default_index } => {
                self.show_choice(title, message, options, default_index.as_ref())
            }
            BuiltinCall::ConsoleShowMultiChoice { title, message, options, default_selected } => {
                self.show_multi_choice(title, message, options, default_selected.as_ref())
            }
            BuiltinCall::ConsoleShowConfirm { title, message, default_yes } => {
                self.show_confirm(title, message, default_yes.as_ref())
            }
            BuiltinCall::ConsoleShowInput { title, message, default_value } => {
                self.show_input(title, message, default_value.as_ref(), false)
            }
            BuiltinCall::ConsoleShowPassword { title, message } => self.show_input(title, message, None, true),
            BuiltinCall::ConsoleShowProgress { title, message, percent, .. } => {
                let title = self.value(title)?;
                let text = self.interpolated(message)?;
                let message = format!("\"{}\"", text);
                let percent = self.arithmetic(percent)?;
                let lines = dialog_chain(
                    |tool| vec![format!("echo $(({})) | {} --title {} --gauge {} 10 60 0", percent, tool, title, message)],
                    vec![format!("echo \"{}: {} ($(({}))%)\"", strip(&title), text, percent)],
                );
                Ok(Lowered::Effect(lines))
            }
            other => Err(misrouted("console", other)),
        }
    }

    fn message_box(&mut self, kind: MessageKind, title: &Expression, message: &Expression) -> Result<Lowered, CompileError> {
        let title_text = self.interpolated(title)?;
        let message_text = self.interpolated(message)?;
        let title = format!("\"{}\"", title_text);
        let message = format!("\"{}\"", message_text);
        let fallback = match kind.label() {
            "" => format!("echo \"{}: {}\"", title_text, message_text),
            label => format!("echo \"[{}] {}: {}\"", label, title_text, message_text),
        };
        let fallback = if kind == MessageKind::Error { format!("{} >&2", fallback) } else { fallback };
        let lines = dialog_chain(
            |tool| vec![format!("{} --title {} --msgbox {} 10 60", tool, title, message)],
            vec![fallback],
        );
        Ok(Lowered::Effect(lines))
    }

    fn show_choice(
        &mut self,
        title: &Expression,
        message: &Expression,
        options: &Expression,
        default_index: Option<&Expression>,
    ) -> Result<Lowered, CompileError> {
        let title = self.value(title)?;
        let message = self.value(message)?;
        let options = self.items(options)?;
        let (default_item, default) = match default_index {
            Some(index) => {
                let index = self.arithmetic(index)?;
                (format!(" --default-item \"$(({}))\"", index), format!("$(({} + 1))", index))
            }
            None => (String::new(), "1".to_string()),
        };
        let var = self.names.fresh("choice");
        let vars = [
            ("var", var.as_str()),
            ("options", options.as_str()),
            ("title", title.as_str()),
            ("message", message.as_str()),
            ("default_item", default_item.as_str()),
            ("default", default.as_str()),
        ];

        self.pending.extend(template(CHOICE_SETUP, &vars));
        let lines = dialog_chain(
            |tool| {
                let mut with_tool = vars.to_vec();
                with_tool.push(("tool", tool));
                template(CHOICE_DIALOG, &with_tool)
            },
            template(CHOICE_FALLBACK, &vars),
        );
        self.pending.extend(lines);
        Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
    }

    fn show_multi_choice(
        &mut self,
        title: &Expression,
        message: &Expression,
        options: &Expression,
        defaults: Option<&Expression>,
    ) -> Result<Lowered, CompileError> {
        let title = self.value(title)?;
        let message = self.value(message)?;
        let options = self.items(options)?;
        let defaults = match defaults {
            Some(defaults) => self.items(defaults)?,
            None => String::new(),
        };
        let var = self.names.fresh("choices");
        let vars = [
            ("var", var.as_str()),
            ("options", options.as_str()),
            ("defaults", defaults.as_str()),
            ("title", title.as_str()),
            ("message", message.as_str()),
        ];

        self.pending.extend(template(MULTI_SETUP, &vars));
        let lines = dialog_chain(
            |tool| {
                let mut with_tool = vars.to_vec();
                with_tool.push(("tool", tool));
                template(MULTI_DIALOG, &with_tool)
            },
            template(MULTI_FALLBACK, &vars),
        );
        self.pending.extend(lines);
        Ok(Lowered::Array(format!("\"${{{}[@]}}\"", var)))
    }

    fn show_confirm(
        &mut self,
        title: &Expression,
        message: &Expression,
        default_yes: Option<&Expression>,
    ) -> Result<Lowered, CompileError> {
        let title = self.value(title)?;
        let prompt = self.interpolated(message)?;
        let message = format!("\"{}\"", prompt);
        // only a literal `false` switches the default to "no"
        let default_no = matches!(
            default_yes.map(Expression::unparenthesized),
            Some(Expression::Literal(lit)) if lit.value == "false"
        );
        let var = self.names.fresh("confirm");
        let (flag, hint, default) = if default_no { (" --defaultno", "[y/N]", "n") } else { ("", "[Y/n]", "y") };
        let vars = [
            ("var", var.as_str()),
            ("title", title.as_str()),
            ("message", message.as_str()),
            ("prompt", prompt.as_str()),
            ("default_no", flag),
            ("hint", hint),
            ("default", default),
        ];

        let lines = dialog_chain(
            |tool| {
                let mut with_tool = vars.to_vec();
                with_tool.push(("tool", tool));
                template(CONFIRM_DIALOG, &with_tool)
            },
            template(CONFIRM_FALLBACK, &vars),
        );
        self.pending.extend(lines);
        Ok(Lowered::Flag(var))
    }

    fn show_input(
        &mut self,
        title: &Expression,
        message: &Expression,
        default_value: Option<&Expression>,
        password: bool,
    ) -> Result<Lowered, CompileError> {
        let title = self.value(title)?;
        let prompt = self.interpolated(message)?;
        let message = format!("\"{}\"", prompt);
        let default = match default_value {
            Some(value) => self.value(value)?,
            None => "\"\"".to_string(),
        };
        let var = self.names.fresh(if password { "password" } else { "input" });
        let box_kind = if password { "passwordbox" } else { "inputbox" };
        let vars = [
            ("var", var.as_str()),
            ("title", title.as_str()),
            ("message", message.as_str()),
            ("default", default.as_str()),
            ("box", box_kind),
        ];

        let fallback = if password {
            vec![format!("read -r -s -p \"{}: \" {}", prompt, var), "echo".to_string()]
        } else {
            vec![
                format!("read -r -p \"{}: \" {}", prompt, var),
                format!("{v}=\"${{{v}:-{d}}}\"", v = var, d = strip(&default)),
            ]
        };
        let lines = dialog_chain(
            |tool| {
                let mut with_tool = vars.to_vec();
                with_tool.push(("tool", tool));
                template(INPUT_DIALOG, &with_tool)
            },
            fallback,
        );
        self.pending.extend(lines);
        Ok(Lowered::Word(format!("\"${{{}}}\"", var)))
    }
}

fn strip(word: &str) -> &str {
    crate::compiler::expressions::strip_quotes(word)
}
