//! Abstract Syntax Tree (AST) Types for typeshell
//!
//! This module defines the complete AST produced by the parser and consumed
//! by the compiler. Nodes are plain data: every statement owns its
//! expressions and sub-statements, there are no back-references and nothing
//! is shared, so a `ProgramNode` is a strict tree.

use serde::Serialize;
use std::fmt;

// =============================================================================
// TYPE TAGS
// =============================================================================

/// Lightweight type tag carried by every expression.
///
/// Computed during parsing from literal shapes and from the declared types
/// of variables and functions. `Unknown` means the compiler has to fall back
/// to shape heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    StringArray,
    NumberArray,
    BooleanArray,
    Void,
    Unknown,
}

impl ValueType {
    /// Resolve a source type annotation (`string`, `number[]`, ...).
    pub fn from_annotation(annotation: &str) -> Self {
        match annotation.trim() {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "string[]" => Self::StringArray,
            "number[]" => Self::NumberArray,
            "boolean[]" => Self::BooleanArray,
            "void" => Self::Void,
            _ => Self::Unknown,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, Self::StringArray | Self::NumberArray | Self::BooleanArray)
    }

    /// Element type of an array type; `Unknown` for scalars.
    pub fn element(self) -> Self {
        match self {
            Self::StringArray => Self::String,
            Self::NumberArray => Self::Number,
            Self::BooleanArray => Self::Boolean,
            _ => Self::Unknown,
        }
    }

    /// Array type holding elements of this type.
    pub fn array_of(self) -> Self {
        match self {
            Self::String => Self::StringArray,
            Self::Number => Self::NumberArray,
            Self::Boolean => Self::BooleanArray,
            // untyped arrays are treated as string arrays
            _ => Self::StringArray,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::StringArray => "string[]",
            Self::NumberArray => "number[]",
            Self::BooleanArray => "boolean[]",
            Self::Void => "void",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROGRAM & STATEMENTS
// =============================================================================

/// Root node: a complete program
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProgramNode {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(FunctionDeclaration),
    If(IfStatement),
    For(ForLoop),
    ForIn(ForInLoop),
    While(WhileStatement),
    Switch(SwitchStatement),
    TryCatch(TryCatchStatement),
    Break,
    Continue,
    Return(ReturnStatement),
    Exit(ExitStatement),
    Assignment(AssignmentStatement),
    Expression(ExpressionStatement),
    Raw(RawStatement),
}

/// `let name: type = value;` / `const name: type = value;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub value_type: ValueType,
    pub value: Expression,
    pub is_const: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub return_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_body: Vec<Statement>,
    /// Empty means no `else` branch
    pub else_body: Vec<Statement>,
    /// The else body is a single `if` written as `else if`
    pub else_if: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOperator {
    Increment,      // ++
    Decrement,      // --
    AddAssign,      // +=
    SubAssign,      // -=
}

impl UpdateOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
        }
    }
}

/// C-style `for (let i = 0; i < n; i++)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub init_variable: String,
    pub init_type: ValueType,
    pub init_value: Expression,
    pub condition: Expression,
    pub update_variable: String,
    pub update_operator: UpdateOperator,
    /// Right-hand side for `+=` / `-=`
    pub update_value: Option<Expression>,
    pub body: Vec<Statement>,
}

/// `for (let item of items)` / `for (let item in items)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForInLoop {
    pub variable: String,
    pub variable_type: ValueType,
    pub iterable: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

/// How a case clause ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaseEnd {
    /// Explicit `break;`
    Break,
    /// No `break;` and another clause follows
    FallThrough,
    /// No `break;` and nothing follows
    ImplicitEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseClause {
    /// Several values model grouped labels (`case 1: case 2:`)
    pub values: Vec<Expression>,
    pub body: Vec<Statement>,
    pub end: CaseEnd,
}

impl CaseClause {
    pub fn has_break(&self) -> bool {
        self.end == CaseEnd::Break
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchStatement {
    pub expression: Expression,
    pub cases: Vec<CaseClause>,
    pub default_case: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TryCatchStatement {
    pub try_body: Vec<Statement>,
    pub catch_variable: Option<String>,
    pub catch_body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitStatement {
    pub exit_code: Expression,
}

/// `name = value;` or `name[index] = value;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStatement {
    pub variable_name: String,
    pub index: Option<Expression>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

/// Native shell kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawStatement {
    pub content: String,
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Literal(LiteralExpression),
    Variable(VariableExpression),
    Binary(Box<BinaryExpression>),
    Unary(Box<UnaryExpression>),
    Update(UpdateExpression),
    Ternary(Box<TernaryExpression>),
    Parenthesized(Box<Expression>),
    ArrayLiteral(ArrayLiteral),
    ArrayAccess(Box<ArrayAccess>),
    ArrayLength(Box<Expression>),
    ArrayIsEmpty(Box<Expression>),
    ArrayContains(Box<ArrayContains>),
    ArrayReverse(Box<Expression>),
    Assignment(Box<AssignmentExpression>),
    Call(FunctionCall),
    Interpolation(StringInterpolation),
    Lambda(LambdaExpression),
    Builtin(Box<BuiltinCall>),
}

/// A literal. For strings, `value` is the text as it appears between
/// double quotes in the generated shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralExpression {
    pub value: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableExpression {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add, Sub, Mul, Div, Mod,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpression {
    pub left: Expression,
    pub operator: BinaryOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Expression,
}

/// `++x`, `x++`, `--x`, `x--`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateExpression {
    pub name: String,
    pub increment: bool,
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TernaryExpression {
    pub condition: Expression,
    pub when_true: Expression,
    pub when_false: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
    pub element_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayAccess {
    pub array: Expression,
    pub index: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayContains {
    pub array: Expression,
    pub value: Expression,
}

/// `x = value` used as an expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentExpression {
    pub name: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
    /// Declared return type when the function was seen before the call
    pub return_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InterpolationPart {
    Text(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringInterpolation {
    pub parts: Vec<InterpolationPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaExpression {
    pub parameters: Vec<String>,
    pub body: Vec<Statement>,
}

// =============================================================================
// BUILTIN NAMESPACE CALLS
// =============================================================================

/// Dialog flavour for the `console.show*` message boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Message,
    Info,
    Warning,
    Error,
    Success,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Message => "",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        }
    }
}

/// One variant per builtin function, each a flat record of its arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BuiltinCall {
    // console.*
    ConsoleLog { message: Expression },
    ConsoleError { message: Expression },
    ConsoleClear,
    ConsoleIsSudo,
    ConsolePromptYesNo { prompt: Expression },
    ConsoleShowMessage { kind: MessageKind, title: Expression, message: Expression },
    ConsoleShowChoice { title: Expression, message: Expression, options: Expression, default_index: Option<Expression> },
    ConsoleShowMultiChoice { title: Expression, message: Expression, options: Expression, default_selected: Option<Expression> },
    ConsoleShowConfirm { title: Expression, message: Expression, default_yes: Option<Expression> },
    ConsoleShowInput { title: Expression, message: Expression, default_value: Option<Expression> },
    ConsoleShowPassword { title: Expression, message: Expression },
    ConsoleShowProgress { title: Expression, message: Expression, percent: Expression, can_cancel: Option<Expression> },

    // fs.*
    FsReadFile { path: Expression },
    FsWriteFile { path: Expression, content: Expression },
    FsAppendFile { path: Expression, content: Expression },
    FsExists { path: Expression },
    FsDirname { path: Expression },
    FsFileName { path: Expression },
    FsExtension { path: Expression },
    FsParentDirName { path: Expression },
    FsCopy { source: Expression, destination: Expression },
    FsMove { source: Expression, destination: Expression },
    FsRename { path: Expression, new_name: Expression },
    FsDelete { path: Expression },
    FsCreateTempFolder { prefix: Option<Expression>, base_dir: Option<Expression> },

    // string.*
    StringLength { value: Expression },
    StringTrim { value: Expression },
    StringToUpperCase { value: Expression },
    StringToLowerCase { value: Expression },
    StringCapitalize { value: Expression },
    StringIsEmpty { value: Expression },
    StringStartsWith { value: Expression, prefix: Expression },
    StringEndsWith { value: Expression, suffix: Expression },
    StringIncludes { value: Expression, search: Expression },
    StringReplace { value: Expression, search: Expression, replacement: Expression },
    StringReplaceAll { value: Expression, search: Expression, replacement: Expression },
    StringSplit { value: Expression, delimiter: Expression },
    StringSubstring { value: Expression, start: Expression, length: Option<Expression> },
    StringIndexOf { value: Expression, search: Expression },
    StringPadStart { value: Expression, length: Expression, pad: Option<Expression> },
    StringPadEnd { value: Expression, length: Expression, pad: Option<Expression> },
    StringRepeat { value: Expression, count: Expression },

    // array.* (length/isEmpty/contains/reverse are core expressions)
    ArrayJoin { array: Expression, separator: Option<Expression> },
    ArraySort { array: Expression, order: Option<Expression> },
    ArrayMerge { first: Expression, second: Expression },
    ArrayShuffle { array: Expression },
    ArrayUnique { array: Expression },
    ArrayPush { array: Expression, value: Expression },
    ArrayForEach { array: Expression, callback: LambdaExpression },

    // json.*
    JsonParse { value: Expression },
    JsonStringify { value: Expression, pretty: Option<Expression> },
    JsonIsValid { value: Expression },
    JsonGet { json: Expression, path: Expression },
    JsonSet { json: Expression, path: Expression, value: Expression },
    JsonHas { json: Expression, path: Expression },
    JsonDelete { json: Expression, path: Expression },
    JsonKeys { json: Expression },
    JsonValues { json: Expression },
    JsonMerge { first: Expression, second: Expression },
    JsonInstallDependencies,

    // yaml.*
    YamlParse { value: Expression },
    YamlStringify { value: Expression },
    YamlIsValid { value: Expression },
    YamlGet { yaml: Expression, path: Expression },
    YamlSet { yaml: Expression, path: Expression, value: Expression },
    YamlHas { yaml: Expression, path: Expression },
    YamlDelete { yaml: Expression, path: Expression },
    YamlKeys { yaml: Expression },
    YamlValues { yaml: Expression },
    YamlMerge { first: Expression, second: Expression },
    YamlInstallDependencies,

    // os.*
    OsIsInstalled { app: Expression },
    OsGetOS,
    OsGetLinuxVersion,

    // utility.*
    UtilityRandom { min: Option<Expression>, max: Option<Expression> },
    UtilityUuid,
    UtilityHash { text: Expression, algorithm: Option<Expression> },
    UtilityBase64Encode { text: Expression },
    UtilityBase64Decode { text: Expression },

    // args.*
    ArgsDefine {
        long_flag: String,
        short_flag: String,
        description: String,
        arg_type: ValueType,
        required: bool,
        default_value: Option<Expression>,
    },
    ArgsHas { flag: String },
    ArgsGet { flag: String },
    ArgsAll,
    ArgsShowHelp,

    // env.*
    EnvGet { name: Expression, default_value: Option<Expression> },
    EnvSet { name: Expression, value: Expression },
    EnvLoad { path: Option<Expression> },
    EnvDelete { name: Expression },

    // timer.*
    TimerStart,
    TimerStop,

    // process.*
    ProcessId,
    ProcessCpu,
    ProcessMemory,
    ProcessElapsedTime,
    ProcessCommand,
    ProcessStatus,

    // web.*
    WebGet { url: Expression },
    WebPost { url: Expression, data: Option<Expression> },
    WebPut { url: Expression, data: Expression },
    WebDelete { url: Expression },

    // script.*
    ScriptEnableDebug,
    ScriptDisableDebug,
    ScriptEnableGlobbing,
    ScriptDisableGlobbing,
    ScriptExitOnError,
    ScriptContinueOnError,
    ScriptDescription { text: String },

    // misc
    SchedulerCron { pattern: Expression, job: LambdaExpression },
    TemplateUpdate { source: Expression, target: Expression },
    GitUndoLastCommit,
}

impl BuiltinCall {
    /// Type of the value a builtin produces in expression position.
    pub fn result_type(&self) -> ValueType {
        use BuiltinCall::*;
        match self {
            ConsoleIsSudo | ConsolePromptYesNo { .. } | ConsoleShowConfirm { .. } => ValueType::Boolean,
            ConsoleShowChoice { .. } | ConsoleShowInput { .. } | ConsoleShowPassword { .. } => ValueType::String,
            ConsoleShowMultiChoice { .. } => ValueType::StringArray,
            ConsoleLog { .. } | ConsoleError { .. } | ConsoleClear | ConsoleShowMessage { .. }
            | ConsoleShowProgress { .. } => ValueType::Void,

            FsExists { .. } | FsCopy { .. } | FsMove { .. } | FsRename { .. } | FsDelete { .. } => ValueType::Boolean,
            FsWriteFile { .. } | FsAppendFile { .. } => ValueType::Void,
            FsReadFile { .. } | FsDirname { .. } | FsFileName { .. } | FsExtension { .. }
            | FsParentDirName { .. } | FsCreateTempFolder { .. } => ValueType::String,

            StringLength { .. } | StringIndexOf { .. } => ValueType::Number,
            StringIsEmpty { .. } | StringStartsWith { .. } | StringEndsWith { .. }
            | StringIncludes { .. } => ValueType::Boolean,
            StringSplit { .. } => ValueType::StringArray,
            StringTrim { .. } | StringToUpperCase { .. } | StringToLowerCase { .. }
            | StringCapitalize { .. } | StringReplace { .. } | StringReplaceAll { .. }
            | StringSubstring { .. } | StringPadStart { .. } | StringPadEnd { .. }
            | StringRepeat { .. } => ValueType::String,

            ArrayJoin { .. } => ValueType::String,
            ArraySort { array, .. } | ArrayShuffle { array } | ArrayUnique { array } => {
                let t = array.value_type();
                if t.is_array() { t } else { ValueType::StringArray }
            }
            ArrayMerge { first, .. } => {
                let t = first.value_type();
                if t.is_array() { t } else { ValueType::StringArray }
            }
            ArrayPush { .. } | ArrayForEach { .. } => ValueType::Void,

            JsonIsValid { .. } | JsonHas { .. } | YamlIsValid { .. } | YamlHas { .. } => ValueType::Boolean,
            JsonKeys { .. } | JsonValues { .. } | YamlKeys { .. } | YamlValues { .. } => ValueType::StringArray,
            JsonInstallDependencies | YamlInstallDependencies => ValueType::Boolean,
            JsonParse { .. } | JsonStringify { .. } | JsonGet { .. } | JsonSet { .. }
            | JsonDelete { .. } | JsonMerge { .. } | YamlParse { .. } | YamlStringify { .. }
            | YamlGet { .. } | YamlSet { .. } | YamlDelete { .. } | YamlMerge { .. } => ValueType::String,

            OsIsInstalled { .. } => ValueType::Boolean,
            OsGetOS | OsGetLinuxVersion => ValueType::String,

            UtilityRandom { .. } => ValueType::Number,
            UtilityUuid | UtilityHash { .. } | UtilityBase64Encode { .. }
            | UtilityBase64Decode { .. } => ValueType::String,

            ArgsHas { .. } => ValueType::Boolean,
            ArgsGet { .. } => ValueType::String,
            ArgsAll => ValueType::StringArray,
            ArgsDefine { .. } | ArgsShowHelp => ValueType::Void,

            EnvGet { .. } => ValueType::String,
            EnvLoad { .. } => ValueType::Boolean,
            EnvSet { .. } | EnvDelete { .. } => ValueType::Void,

            TimerStart => ValueType::Void,
            TimerStop => ValueType::Number,

            ProcessId | ProcessCpu | ProcessMemory => ValueType::Number,
            ProcessElapsedTime | ProcessCommand | ProcessStatus => ValueType::String,

            WebGet { .. } | WebPost { .. } | WebPut { .. } | WebDelete { .. } => ValueType::String,

            ScriptEnableDebug | ScriptDisableDebug | ScriptEnableGlobbing | ScriptDisableGlobbing
            | ScriptExitOnError | ScriptContinueOnError | ScriptDescription { .. } => ValueType::Void,

            SchedulerCron { .. } | GitUndoLastCommit => ValueType::Void,
            TemplateUpdate { .. } => ValueType::Boolean,
        }
    }
}

impl Expression {
    /// Type tag of this expression, derived from its own fields only.
    pub fn value_type(&self) -> ValueType {
        match self {
            Expression::Literal(lit) => lit.value_type,
            Expression::Variable(var) => var.value_type,
            Expression::Binary(bin) => {
                if bin.operator.is_comparison() || bin.operator.is_logical() {
                    return ValueType::Boolean;
                }
                if bin.operator != BinaryOperator::Add {
                    return ValueType::Number;
                }
                let (l, r) = (bin.left.value_type(), bin.right.value_type());
                if l == ValueType::String || r == ValueType::String {
                    ValueType::String
                } else if l == ValueType::Number && r == ValueType::Number {
                    ValueType::Number
                } else {
                    ValueType::Unknown
                }
            }
            Expression::Unary(un) => match un.operator {
                UnaryOperator::Not => ValueType::Boolean,
                UnaryOperator::Neg => ValueType::Number,
            },
            Expression::Update(_) => ValueType::Number,
            Expression::Ternary(t) => {
                let (a, b) = (t.when_true.value_type(), t.when_false.value_type());
                if a == b { a } else { ValueType::Unknown }
            }
            Expression::Parenthesized(inner) => inner.value_type(),
            Expression::ArrayLiteral(arr) => arr.element_type.array_of(),
            Expression::ArrayAccess(access) => access.array.value_type().element(),
            Expression::ArrayLength(_) => ValueType::Number,
            Expression::ArrayIsEmpty(_) | Expression::ArrayContains(_) => ValueType::Boolean,
            Expression::ArrayReverse(inner) => inner.value_type(),
            Expression::Assignment(assign) => assign.value.value_type(),
            Expression::Call(call) => call.return_type,
            Expression::Interpolation(_) => ValueType::String,
            Expression::Lambda(_) => ValueType::Void,
            Expression::Builtin(builtin) => builtin.result_type(),
        }
    }

    /// Strip any number of wrapping parentheses.
    pub fn unparenthesized(&self) -> &Expression {
        let mut expr = self;
        while let Expression::Parenthesized(inner) = expr {
            expr = inner;
        }
        expr
    }

    pub fn is_string_like(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expression::Interpolation(_)
                | Expression::Literal(LiteralExpression { value_type: ValueType::String, .. })
        )
    }

    pub fn is_numeric_literal(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expression::Literal(LiteralExpression { value_type: ValueType::Number, .. })
        )
    }

    /// Literal string contents, if this is a plain string literal.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self.unparenthesized() {
            Expression::Literal(LiteralExpression { value, value_type: ValueType::String }) => {
                Some(value.as_str())
            }
            _ => None,
        }
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Factory functions for building AST nodes
pub struct AST;

impl AST {
    pub fn program(statements: Vec<Statement>) -> ProgramNode {
        ProgramNode { statements }
    }

    pub fn string(value: impl Into<String>) -> Expression {
        Expression::Literal(LiteralExpression { value: value.into(), value_type: ValueType::String })
    }

    pub fn number(value: impl Into<String>) -> Expression {
        Expression::Literal(LiteralExpression { value: value.into(), value_type: ValueType::Number })
    }

    pub fn boolean(value: bool) -> Expression {
        Expression::Literal(LiteralExpression {
            value: if value { "true" } else { "false" }.to_string(),
            value_type: ValueType::Boolean,
        })
    }

    pub fn unknown(value: impl Into<String>) -> Expression {
        Expression::Literal(LiteralExpression { value: value.into(), value_type: ValueType::Unknown })
    }

    pub fn variable(name: impl Into<String>, value_type: ValueType) -> Expression {
        Expression::Variable(VariableExpression { name: name.into(), value_type })
    }

    pub fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
        Expression::Binary(Box::new(BinaryExpression { left, operator, right }))
    }

    pub fn unary(operator: UnaryOperator, operand: Expression) -> Expression {
        Expression::Unary(Box::new(UnaryExpression { operator, operand }))
    }

    pub fn ternary(condition: Expression, when_true: Expression, when_false: Expression) -> Expression {
        Expression::Ternary(Box::new(TernaryExpression { condition, when_true, when_false }))
    }

    pub fn builtin(call: BuiltinCall) -> Expression {
        Expression::Builtin(Box::new(call))
    }

    /// Default value for a declaration without an initializer.
    pub fn default_value(value_type: ValueType) -> Expression {
        match value_type {
            ValueType::Number => Self::number("0"),
            ValueType::Boolean => Self::boolean(false),
            t if t.is_array() => Expression::ArrayLiteral(ArrayLiteral {
                elements: Vec::new(),
                element_type: t.element(),
            }),
            _ => Self::string(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_round_trip() {
        for name in ["string", "number", "boolean", "string[]", "number[]", "boolean[]", "void"] {
            assert_eq!(ValueType::from_annotation(name).as_str(), name);
        }
        assert_eq!(ValueType::from_annotation("Map<string>"), ValueType::Unknown);
    }

    #[test]
    fn test_concatenation_type() {
        let expr = AST::binary(AST::string("a"), BinaryOperator::Add, AST::variable("n", ValueType::Number));
        assert_eq!(expr.value_type(), ValueType::String);
        let expr = AST::binary(AST::number("1"), BinaryOperator::Add, AST::number("2"));
        assert_eq!(expr.value_type(), ValueType::Number);
        let expr = AST::binary(AST::variable("a", ValueType::Unknown), BinaryOperator::Add, AST::number("2"));
        assert_eq!(expr.value_type(), ValueType::Unknown);
    }

    #[test]
    fn test_comparison_is_boolean() {
        let expr = AST::binary(AST::variable("a", ValueType::Unknown), BinaryOperator::Gt, AST::number("0"));
        assert_eq!(expr.value_type(), ValueType::Boolean);
    }

    #[test]
    fn test_unparenthesized() {
        let inner = AST::number("1");
        let expr = Expression::Parenthesized(Box::new(Expression::Parenthesized(Box::new(inner.clone()))));
        assert_eq!(expr.unparenthesized(), &inner);
        assert!(expr.is_numeric_literal());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(AST::default_value(ValueType::Number), AST::number("0"));
        assert_eq!(AST::default_value(ValueType::String), AST::string(""));
        assert!(matches!(AST::default_value(ValueType::NumberArray), Expression::ArrayLiteral(_)));
    }
}
