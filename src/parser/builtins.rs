//! Builtin Function Registry
//!
//! Declarative table mapping a dotted builtin name (`fs.copy`,
//! `string.padStart`, ...) to its arity and a constructor that turns the
//! parsed arguments into an AST node. Arity is validated once, here, for
//! every builtin.

use std::collections::{HashMap, VecDeque};

use crate::ast::types::{
    ArrayContains, BuiltinCall, Expression, LambdaExpression, MessageKind, ValueType, AST,
};
use crate::parser::types::ParseError;

/// Namespaces whose dotted calls go through the registry
pub const NAMESPACES: &[&str] = &[
    "console", "fs", "string", "array", "json", "yaml", "os", "utility", "args", "env", "timer",
    "process", "web", "script", "scheduler", "template", "git",
];

pub const HASH_ALGORITHMS: &[&str] = &["md5", "sha1", "sha256", "sha512"];

/// Arguments of one builtin call, consumed front to back by its constructor.
pub struct BuiltinArgs {
    pub name: &'static str,
    args: VecDeque<Expression>,
}

impl BuiltinArgs {
    fn new(name: &'static str, args: Vec<Expression>) -> Self {
        Self { name, args: args.into() }
    }

    /// Next required argument. Arity is checked before construction.
    pub fn next(&mut self) -> Expression {
        self.args.pop_front().unwrap_or_else(|| AST::string(""))
    }

    pub fn next_opt(&mut self) -> Option<Expression> {
        self.args.pop_front()
    }

    /// Next argument, which must be a plain string literal.
    pub fn next_string_literal(&mut self, what: &str) -> Result<String, ParseError> {
        let arg = self.next();
        match arg.as_string_literal() {
            Some(text) => Ok(text.to_string()),
            None => Err(ParseError::syntax(format!(
                "{}() expects {} to be a string literal",
                self.name, what
            ))),
        }
    }

    /// Next argument, which must be a lambda taking `min..=max` parameters.
    pub fn next_lambda(&mut self, min: usize, max: usize) -> Result<LambdaExpression, ParseError> {
        match self.next() {
            Expression::Lambda(lambda) if (min..=max).contains(&lambda.parameters.len()) => Ok(lambda),
            Expression::Lambda(lambda) => Err(ParseError::syntax(format!(
                "{}() callback takes {} parameters, got {}",
                self.name,
                if min == max { min.to_string() } else { format!("{} to {}", min, max) },
                lambda.parameters.len()
            ))),
            _ => Err(ParseError::syntax(format!("{}() expects a lambda callback", self.name))),
        }
    }

    /// Next argument, which must not be a known scalar.
    pub fn next_array(&mut self) -> Result<Expression, ParseError> {
        let arg = self.next();
        let t = arg.value_type();
        if matches!(t, ValueType::String | ValueType::Number | ValueType::Boolean) {
            return Err(ParseError::type_mismatch(format!(
                "{}() expects an array, got {}",
                self.name, t
            )));
        }
        Ok(arg)
    }
}

pub type BuildFn = fn(&mut BuiltinArgs) -> Result<Expression, ParseError>;

/// Registry entry
pub struct BuiltinSpec {
    pub min: usize,
    pub max: usize,
    pub build: BuildFn,
}

impl BuiltinSpec {
    fn check_arity(&self, name: &str, count: usize) -> Result<(), ParseError> {
        if (self.min..=self.max).contains(&count) {
            return Ok(());
        }
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        let message = if self.max == 0 {
            format!("{}() takes no arguments", name)
        } else if self.min == self.max {
            format!("{}() requires exactly {} {}", name, self.min, plural(self.min))
        } else if count < self.min {
            format!("{}() requires at least {} {}", name, self.min, plural(self.min))
        } else {
            format!("{}() accepts at most {} {}", name, self.max, plural(self.max))
        };
        Err(ParseError::arity(message))
    }
}

fn ok(call: BuiltinCall) -> Result<Expression, ParseError> {
    Ok(AST::builtin(call))
}

fn message_box(a: &mut BuiltinArgs, kind: MessageKind) -> Result<Expression, ParseError> {
    ok(BuiltinCall::ConsoleShowMessage { kind, title: a.next(), message: a.next() })
}

fn hash(a: &mut BuiltinArgs) -> Result<Expression, ParseError> {
    let text = a.next();
    let algorithm = a.next_opt();
    if let Some(name) = algorithm.as_ref().and_then(|e| e.as_string_literal()) {
        if !HASH_ALGORITHMS.contains(&name) {
            return Err(ParseError::syntax(format!(
                "utility.hash() algorithm must be one of {}, got '{}'",
                HASH_ALGORITHMS.join(", "),
                name
            )));
        }
    }
    ok(BuiltinCall::UtilityHash { text, algorithm })
}

fn args_define(a: &mut BuiltinArgs) -> Result<Expression, ParseError> {
    let long_flag = a.next_string_literal("the long flag")?;
    let short_flag = a.next_string_literal("the short flag")?;
    let description = a.next_string_literal("the description")?;
    let type_name = a.next_string_literal("the type")?;
    let arg_type = match type_name.as_str() {
        "string" | "number" | "boolean" => ValueType::from_annotation(&type_name),
        other => {
            return Err(ParseError::syntax(format!(
                "args.define() type must be string, number or boolean, got '{}'",
                other
            )))
        }
    };
    let required = match a.next_opt() {
        None => false,
        Some(Expression::Literal(lit)) if lit.value_type == ValueType::Boolean => lit.value == "true",
        Some(_) => {
            return Err(ParseError::syntax(
                "args.define() expects required to be true or false",
            ))
        }
    };
    let default_value = a.next_opt();
    ok(BuiltinCall::ArgsDefine { long_flag, short_flag, description, arg_type, required, default_value })
}

fn register(m: &mut HashMap<&'static str, BuiltinSpec>, name: &'static str, min: usize, max: usize, build: BuildFn) {
    m.insert(name, BuiltinSpec { min, max, build });
}

lazy_static::lazy_static! {
    static ref REGISTRY: HashMap<&'static str, BuiltinSpec> = {
        use BuiltinCall::*;
        let mut m = HashMap::new();

        // console
        register(&mut m, "console.log", 0, 1, |a| ok(ConsoleLog { message: a.next_opt().unwrap_or_else(|| AST::string("")) }));
        register(&mut m, "console.error", 1, 1, |a| ok(ConsoleError { message: a.next() }));
        register(&mut m, "console.clear", 0, 0, |_| ok(ConsoleClear));
        register(&mut m, "console.isSudo", 0, 0, |_| ok(ConsoleIsSudo));
        register(&mut m, "console.promptYesNo", 1, 1, |a| ok(ConsolePromptYesNo { prompt: a.next() }));
        register(&mut m, "console.showMessage", 2, 2, |a| message_box(a, MessageKind::Message));
        register(&mut m, "console.showInfo", 2, 2, |a| message_box(a, MessageKind::Info));
        register(&mut m, "console.showWarning", 2, 2, |a| message_box(a, MessageKind::Warning));
        register(&mut m, "console.showError", 2, 2, |a| message_box(a, MessageKind::Error));
        register(&mut m, "console.showSuccess", 2, 2, |a| message_box(a, MessageKind::Success));
        register(&mut m, "console.showChoice", 3, 4, |a| {
            ok(ConsoleShowChoice { title: a.next(), message: a.next(), options: a.next_array()?, default_index: a.next_opt() })
        });
        register(&mut m, "console.showMultiChoice", 3, 4, |a| {
            ok(ConsoleShowMultiChoice { title: a.next(), message: a.next(), options: a.next_array()?, default_selected: a.next_opt() })
        });
        register(&mut m, "console.showConfirm", 2, 3, |a| {
            ok(ConsoleShowConfirm { title: a.next(), message: a.next(), default_yes: a.next_opt() })
        });
        register(&mut m, "console.showInput", 2, 3, |a| {
            ok(ConsoleShowInput { title: a.next(), message: a.next(), default_value: a.next_opt() })
        });
        register(&mut m, "console.showPassword", 2, 2, |a| ok(ConsoleShowPassword { title: a.next(), message: a.next() }));
        register(&mut m, "console.showProgress", 3, 4, |a| {
            ok(ConsoleShowProgress { title: a.next(), message: a.next(), percent: a.next(), can_cancel: a.next_opt() })
        });

        // fs
        register(&mut m, "fs.readFile", 1, 1, |a| ok(FsReadFile { path: a.next() }));
        register(&mut m, "fs.writeFile", 2, 2, |a| ok(FsWriteFile { path: a.next(), content: a.next() }));
        register(&mut m, "fs.appendFile", 2, 2, |a| ok(FsAppendFile { path: a.next(), content: a.next() }));
        register(&mut m, "fs.exists", 1, 1, |a| ok(FsExists { path: a.next() }));
        register(&mut m, "fs.dirname", 1, 1, |a| ok(FsDirname { path: a.next() }));
        register(&mut m, "fs.fileName", 1, 1, |a| ok(FsFileName { path: a.next() }));
        register(&mut m, "fs.extension", 1, 1, |a| ok(FsExtension { path: a.next() }));
        register(&mut m, "fs.parentDirName", 1, 1, |a| ok(FsParentDirName { path: a.next() }));
        register(&mut m, "fs.copy", 2, 2, |a| ok(FsCopy { source: a.next(), destination: a.next() }));
        register(&mut m, "fs.move", 2, 2, |a| ok(FsMove { source: a.next(), destination: a.next() }));
        register(&mut m, "fs.rename", 2, 2, |a| ok(FsRename { path: a.next(), new_name: a.next() }));
        register(&mut m, "fs.delete", 1, 1, |a| ok(FsDelete { path: a.next() }));
        register(&mut m, "fs.createTempFolder", 0, 2, |a| ok(FsCreateTempFolder { prefix: a.next_opt(), base_dir: a.next_opt() }));

        // string
        register(&mut m, "string.length", 1, 1, |a| ok(StringLength { value: a.next() }));
        register(&mut m, "string.trim", 1, 1, |a| ok(StringTrim { value: a.next() }));
        register(&mut m, "string.toUpperCase", 1, 1, |a| ok(StringToUpperCase { value: a.next() }));
        register(&mut m, "string.toLowerCase", 1, 1, |a| ok(StringToLowerCase { value: a.next() }));
        register(&mut m, "string.capitalize", 1, 1, |a| ok(StringCapitalize { value: a.next() }));
        register(&mut m, "string.isEmpty", 1, 1, |a| ok(StringIsEmpty { value: a.next() }));
        register(&mut m, "string.startsWith", 2, 2, |a| ok(StringStartsWith { value: a.next(), prefix: a.next() }));
        register(&mut m, "string.endsWith", 2, 2, |a| ok(StringEndsWith { value: a.next(), suffix: a.next() }));
        register(&mut m, "string.includes", 2, 2, |a| ok(StringIncludes { value: a.next(), search: a.next() }));
        register(&mut m, "string.replace", 3, 3, |a| {
            ok(StringReplace { value: a.next(), search: a.next(), replacement: a.next() })
        });
        register(&mut m, "string.replaceAll", 3, 3, |a| {
            ok(StringReplaceAll { value: a.next(), search: a.next(), replacement: a.next() })
        });
        register(&mut m, "string.split", 2, 2, |a| ok(StringSplit { value: a.next(), delimiter: a.next() }));
        register(&mut m, "string.substring", 2, 3, |a| {
            ok(StringSubstring { value: a.next(), start: a.next(), length: a.next_opt() })
        });
        register(&mut m, "string.indexOf", 2, 2, |a| ok(StringIndexOf { value: a.next(), search: a.next() }));
        register(&mut m, "string.padStart", 2, 3, |a| ok(StringPadStart { value: a.next(), length: a.next(), pad: a.next_opt() }));
        register(&mut m, "string.padEnd", 2, 3, |a| ok(StringPadEnd { value: a.next(), length: a.next(), pad: a.next_opt() }));
        register(&mut m, "string.repeat", 2, 2, |a| ok(StringRepeat { value: a.next(), count: a.next() }));

        // array
        register(&mut m, "array.length", 1, 1, |a| Ok(Expression::ArrayLength(Box::new(a.next_array()?))));
        register(&mut m, "array.isEmpty", 1, 1, |a| Ok(Expression::ArrayIsEmpty(Box::new(a.next_array()?))));
        register(&mut m, "array.contains", 2, 2, |a| {
            Ok(Expression::ArrayContains(Box::new(ArrayContains { array: a.next_array()?, value: a.next() })))
        });
        register(&mut m, "array.reverse", 1, 1, |a| Ok(Expression::ArrayReverse(Box::new(a.next_array()?))));
        register(&mut m, "array.join", 1, 2, |a| ok(ArrayJoin { array: a.next_array()?, separator: a.next_opt() }));
        register(&mut m, "array.sort", 1, 2, |a| ok(ArraySort { array: a.next_array()?, order: a.next_opt() }));
        register(&mut m, "array.merge", 2, 2, |a| ok(ArrayMerge { first: a.next_array()?, second: a.next_array()? }));
        register(&mut m, "array.shuffle", 1, 1, |a| ok(ArrayShuffle { array: a.next_array()? }));
        register(&mut m, "array.unique", 1, 1, |a| ok(ArrayUnique { array: a.next_array()? }));
        register(&mut m, "array.push", 2, 2, |a| ok(ArrayPush { array: a.next_array()?, value: a.next() }));
        register(&mut m, "array.forEach", 2, 2, |a| {
            ok(ArrayForEach { array: a.next_array()?, callback: a.next_lambda(1, 2)? })
        });

        // json
        register(&mut m, "json.parse", 1, 1, |a| ok(JsonParse { value: a.next() }));
        register(&mut m, "json.stringify", 1, 2, |a| ok(JsonStringify { value: a.next(), pretty: a.next_opt() }));
        register(&mut m, "json.isValid", 1, 1, |a| ok(JsonIsValid { value: a.next() }));
        register(&mut m, "json.get", 2, 2, |a| ok(JsonGet { json: a.next(), path: a.next() }));
        register(&mut m, "json.set", 3, 3, |a| ok(JsonSet { json: a.next(), path: a.next(), value: a.next() }));
        register(&mut m, "json.has", 2, 2, |a| ok(JsonHas { json: a.next(), path: a.next() }));
        register(&mut m, "json.delete", 2, 2, |a| ok(JsonDelete { json: a.next(), path: a.next() }));
        register(&mut m, "json.keys", 1, 1, |a| ok(JsonKeys { json: a.next() }));
        register(&mut m, "json.values", 1, 1, |a| ok(JsonValues { json: a.next() }));
        register(&mut m, "json.merge", 2, 2, |a| ok(JsonMerge { first: a.next(), second: a.next() }));
        register(&mut m, "json.installDependencies", 0, 0, |_| ok(JsonInstallDependencies));

        // yaml
        register(&mut m, "yaml.parse", 1, 1, |a| ok(YamlParse { value: a.next() }));
        register(&mut m, "yaml.stringify", 1, 1, |a| ok(YamlStringify { value: a.next() }));
        register(&mut m, "yaml.isValid", 1, 1, |a| ok(YamlIsValid { value: a.next() }));
        register(&mut m, "yaml.get", 2, 2, |a| ok(YamlGet { yaml: a.next(), path: a.next() }));
        register(&mut m, "yaml.set", 3, 3, |a| ok(YamlSet { yaml: a.next(), path: a.next(), value: a.next() }));
        register(&mut m, "yaml.has", 2, 2, |a| ok(YamlHas { yaml: a.next(), path: a.next() }));
        register(&mut m, "yaml.delete", 2, 2, |a| ok(YamlDelete { yaml: a.next(), path: a.next() }));
        register(&mut m, "yaml.keys", 1, 1, |a| ok(YamlKeys { yaml: a.next() }));
        register(&mut m, "yaml.values", 1, 1, |a| ok(YamlValues { yaml: a.next() }));
        register(&mut m, "yaml.merge", 2, 2, |a| ok(YamlMerge { first: a.next(), second: a.next() }));
        register(&mut m, "yaml.installDependencies", 0, 0, |_| ok(YamlInstallDependencies));

        // os
        register(&mut m, "os.isInstalled", 1, 1, |a| ok(OsIsInstalled { app: a.next() }));
        register(&mut m, "os.getOS", 0, 0, |_| ok(OsGetOS));
        register(&mut m, "os.getLinuxVersion", 0, 0, |_| ok(OsGetLinuxVersion));

        // utility
        register(&mut m, "utility.random", 0, 2, |a| ok(UtilityRandom { min: a.next_opt(), max: a.next_opt() }));
        register(&mut m, "utility.uuid", 0, 0, |_| ok(UtilityUuid));
        register(&mut m, "utility.hash", 1, 2, hash);
        register(&mut m, "utility.base64Encode", 1, 1, |a| ok(UtilityBase64Encode { text: a.next() }));
        register(&mut m, "utility.base64Decode", 1, 1, |a| ok(UtilityBase64Decode { text: a.next() }));

        // args
        register(&mut m, "args.define", 4, 6, args_define);
        register(&mut m, "args.has", 1, 1, |a| ok(ArgsHas { flag: a.next_string_literal("the flag")? }));
        register(&mut m, "args.get", 1, 1, |a| ok(ArgsGet { flag: a.next_string_literal("the flag")? }));
        register(&mut m, "args.all", 0, 0, |_| ok(ArgsAll));
        register(&mut m, "args.showHelp", 0, 0, |_| ok(ArgsShowHelp));

        // env
        register(&mut m, "env.get", 1, 2, |a| ok(EnvGet { name: a.next(), default_value: a.next_opt() }));
        register(&mut m, "env.set", 2, 2, |a| ok(EnvSet { name: a.next(), value: a.next() }));
        register(&mut m, "env.load", 0, 1, |a| ok(EnvLoad { path: a.next_opt() }));
        register(&mut m, "env.delete", 1, 1, |a| ok(EnvDelete { name: a.next() }));

        // timer
        register(&mut m, "timer.start", 0, 0, |_| ok(TimerStart));
        register(&mut m, "timer.stop", 0, 0, |_| ok(TimerStop));

        // process
        register(&mut m, "process.id", 0, 0, |_| ok(ProcessId));
        register(&mut m, "process.cpu", 0, 0, |_| ok(ProcessCpu));
        register(&mut m, "process.memory", 0, 0, |_| ok(ProcessMemory));
        register(&mut m, "process.elapsedTime", 0, 0, |_| ok(ProcessElapsedTime));
        register(&mut m, "process.command", 0, 0, |_| ok(ProcessCommand));
        register(&mut m, "process.status", 0, 0, |_| ok(ProcessStatus));

        // web
        register(&mut m, "web.get", 1, 1, |a| ok(WebGet { url: a.next() }));
        register(&mut m, "web.post", 1, 2, |a| ok(WebPost { url: a.next(), data: a.next_opt() }));
        register(&mut m, "web.put", 2, 2, |a| ok(WebPut { url: a.next(), data: a.next() }));
        register(&mut m, "web.delete", 1, 1, |a| ok(WebDelete { url: a.next() }));

        // script
        register(&mut m, "script.enableDebug", 0, 0, |_| ok(ScriptEnableDebug));
        register(&mut m, "script.disableDebug", 0, 0, |_| ok(ScriptDisableDebug));
        register(&mut m, "script.enableGlobbing", 0, 0, |_| ok(ScriptEnableGlobbing));
        register(&mut m, "script.disableGlobbing", 0, 0, |_| ok(ScriptDisableGlobbing));
        register(&mut m, "script.exitOnError", 0, 0, |_| ok(ScriptExitOnError));
        register(&mut m, "script.continueOnError", 0, 0, |_| ok(ScriptContinueOnError));
        register(&mut m, "script.description", 1, 1, |a| ok(ScriptDescription { text: a.next_string_literal("the text")? }));

        // misc
        register(&mut m, "scheduler.cron", 2, 2, |a| ok(SchedulerCron { pattern: a.next(), job: a.next_lambda(0, 0)? }));
        register(&mut m, "template.update", 2, 2, |a| ok(TemplateUpdate { source: a.next(), target: a.next() }));
        register(&mut m, "git.undoLastCommit", 0, 0, |_| ok(GitUndoLastCommit));

        m
    };
}

pub fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

pub fn lookup(name: &str) -> Option<&'static BuiltinSpec> {
    REGISTRY.get(name)
}

/// Build the AST node for a builtin call.
///
/// Returns `None` when `name` is not a registered builtin.
pub fn build_builtin(name: &str, args: Vec<Expression>) -> Option<Result<Expression, ParseError>> {
    let (&key, spec) = REGISTRY.get_key_value(name)?;
    Some(
        spec.check_arity(key, args.len())
            .and_then(|_| (spec.build)(&mut BuiltinArgs::new(key, args))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::ParseErrorKind;

    fn lambda(params: &[&str]) -> Expression {
        Expression::Lambda(LambdaExpression {
            parameters: params.iter().map(|p| p.to_string()).collect(),
            body: Vec::new(),
        })
    }

    #[test]
    fn test_arity_message() {
        let err = build_builtin("fs.copy", vec![AST::string("a")]).unwrap().unwrap_err();
        assert_eq!(err.message, "fs.copy() requires exactly 2 arguments");
        assert_eq!(err.kind, ParseErrorKind::Arity);
    }

    #[test]
    fn test_unknown_name() {
        assert!(build_builtin("fs.teleport", vec![]).is_none());
        assert!(lookup("string.padStart").is_some());
    }

    #[test]
    fn test_optional_arguments() {
        let expr = build_builtin("utility.random", vec![]).unwrap().unwrap();
        assert_eq!(expr, AST::builtin(BuiltinCall::UtilityRandom { min: None, max: None }));
        let err = build_builtin("utility.random", vec![AST::number("1"); 3]).unwrap().unwrap_err();
        assert!(err.message.contains("at most 2"));
    }

    #[test]
    fn test_hash_algorithm_checked() {
        let args = vec![AST::string("x"), AST::string("crc32")];
        assert!(build_builtin("utility.hash", args).unwrap().is_err());
        let args = vec![AST::string("x"), AST::string("sha1")];
        assert!(build_builtin("utility.hash", args).unwrap().is_ok());
    }

    #[test]
    fn test_for_each_requires_lambda() {
        let arr = AST::variable("xs", ValueType::StringArray);
        assert!(build_builtin("array.forEach", vec![arr.clone(), AST::string("f")]).unwrap().is_err());
        assert!(build_builtin("array.forEach", vec![arr.clone(), lambda(&["a", "b", "c"])]).unwrap().is_err());
        assert!(build_builtin("array.forEach", vec![arr, lambda(&["item", "i"])]).unwrap().is_ok());
    }

    #[test]
    fn test_array_builtin_rejects_scalar() {
        let err = build_builtin("array.join", vec![AST::variable("s", ValueType::String)]).unwrap().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TypeMismatch);
    }

    #[test]
    fn test_args_define() {
        let args = vec![
            AST::string("--name"),
            AST::string("-n"),
            AST::string("Your name"),
            AST::string("string"),
            AST::boolean(true),
        ];
        let expr = build_builtin("args.define", args).unwrap().unwrap();
        match expr {
            Expression::Builtin(call) => match *call {
                BuiltinCall::ArgsDefine { long_flag, required, arg_type, .. } => {
                    assert_eq!(long_flag, "--name");
                    assert!(required);
                    assert_eq!(arg_type, ValueType::String);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_define_rejects_variable_flag() {
        let args = vec![
            AST::variable("flag", ValueType::String),
            AST::string("-n"),
            AST::string("d"),
            AST::string("string"),
        ];
        assert!(build_builtin("args.define", args).unwrap().is_err());
    }
}
