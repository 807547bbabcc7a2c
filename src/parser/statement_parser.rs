//! Statement Parser
//!
//! Line-driven recursive descent over prepared source lines. Each line is
//! matched against the statement forms in a fixed order (first match wins):
//!
//! 1. `bash { ... }` raw blocks
//! 2. `let` / `const` declarations
//! 3. `function` declarations
//! 4. `if` / `else if` / `else`
//! 5. `for` (C-style and `of`/`in`)
//! 6. `while`
//! 7. `switch`
//! 8. `try` / `catch`
//! 9. `return`, `exit`, `break`, `continue`
//! 10. builtin namespace calls
//! 11. bare assignments
//! 12. lines that look like native shell
//! 13. expression statements
//!
//! Block bodies may be written on one line (`if (x) { a; } else { b; }`);
//! the inline text is split into virtual lines that carry the header's line
//! number.

use std::collections::{HashMap, HashSet};

use regex_lite::Regex;

use crate::ast::types::{
    AssignmentStatement, BinaryOperator, CaseClause, CaseEnd, Expression, ExitStatement,
    ExpressionStatement, ForInLoop, ForLoop, FunctionDeclaration, IfStatement, Parameter,
    ProgramNode, RawStatement, ReturnStatement, Statement, SwitchStatement, TryCatchStatement,
    UpdateOperator, ValueType, VariableDeclaration, WhileStatement, AST,
};
use crate::parser::builtins;
use crate::parser::comments::strip_comments;
use crate::parser::lines::{
    bracket_balance, find_matching, find_top_level, keyword_parens, prepare_lines, split_inline, split_top_level,
    SourceLine,
};
use crate::parser::raw_shell::{dedent, find_block_close, is_raw_block_start, looks_like_shell};
use crate::parser::types::{
    is_identifier, ParseError, ParseErrorKind, MAX_INPUT_SIZE, MAX_PARSER_DEPTH,
};

lazy_static::lazy_static! {
    static ref DECLARATION: Regex = Regex::new(
        r"(?s)^(let|const)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z]+(?:\[\])?))?\s*(?:=\s*(.+?))?\s*;?\s*$"
    ).unwrap();
    static ref FUNCTION: Regex = Regex::new(
        r"^function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?::\s*([A-Za-z]+(?:\[\])?))?\s*(.*)$"
    ).unwrap();
    static ref PARAMETER: Regex = Regex::new(
        r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z]+(?:\[\])?))?$"
    ).unwrap();
    static ref FOR_OF: Regex = Regex::new(
        r"^(?:(?:let|const|var)\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z]+(?:\[\])?))?\s+(?:of|in)\s+(.+)$"
    ).unwrap();
    static ref FOR_INIT: Regex = Regex::new(
        r"^(?:(?:let|var)\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z]+(?:\[\])?))?\s*=\s*(.+)$"
    ).unwrap();
    static ref FOR_UPDATE: Regex = Regex::new(
        r"^(?:(\+\+|--)\s*([A-Za-z_][A-Za-z0-9_]*)|([A-Za-z_][A-Za-z0-9_]*)\s*(\+\+|--)|([A-Za-z_][A-Za-z0-9_]*)\s*(\+=|-=)\s*(.+))$"
    ).unwrap();
    static ref ASSIGNMENT: Regex = Regex::new(
        r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[(.+?)\])?\s*([+\-*/%]?=)([^=].*)$"
    ).unwrap();
    static ref NAMESPACE_CALL: Regex = Regex::new(r"^([a-z]+)\.[A-Za-z_]").unwrap();
    static ref RETURN: Regex = Regex::new(r"(?s)^return(?:\s+(.*?))?\s*;?$").unwrap();
    static ref EXIT: Regex = Regex::new(r"(?s)^exit\s*(?:\((.*)\)|(.*?))\s*;?$").unwrap();
}

/// Words that start a block header; such lines are never joined with the
/// lines that follow them.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "function", "try", "catch", "finally", "bash", "case",
    "default",
];

/// Statement parser with the symbol tables of one parse.
pub struct Parser {
    lines: Vec<SourceLine>,
    pos: usize,
    depth: usize,
    line_number: usize,
    consts: HashSet<String>,
    variables: HashMap<String, ValueType>,
    functions: HashMap<String, ValueType>,
    strict: bool,
}

impl Parser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Parser {
            lines: Vec::new(),
            pos: 0,
            depth: 0,
            line_number: 0,
            consts: HashSet::new(),
            variables: HashMap::new(),
            functions: HashMap::new(),
            strict: false,
        }
    }

    /// Reject lines that would only be accepted by the raw-shell heuristic.
    /// `bash { ... }` blocks stay allowed.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse a complete program
    pub fn parse(&mut self, source: &str) -> Result<ProgramNode, ParseError> {
        if source.len() > MAX_INPUT_SIZE {
            return Err(ParseError::syntax(format!(
                "Input too large: {} bytes exceeds limit of {}",
                source.len(),
                MAX_INPUT_SIZE
            ))
            .with_kind(ParseErrorKind::Limit));
        }

        let stripped = strip_comments(source);
        self.lines = prepare_lines(&stripped);
        self.pos = 0;
        self.depth = 0;
        self.line_number = 0;
        self.consts.clear();
        self.variables.clear();
        self.functions.clear();

        let statements = self.parse_statements(true)?;
        Ok(AST::program(statements))
    }

    // =========================================================================
    // SYMBOLS (shared with the expression parser)
    // =========================================================================

    pub(crate) fn is_const(&self, name: &str) -> bool {
        self.consts.contains(name)
    }

    pub(crate) fn variable_type(&self, name: &str) -> Option<ValueType> {
        self.variables.get(name).copied()
    }

    pub(crate) fn function_type(&self, name: &str) -> Option<ValueType> {
        self.functions.get(name).copied()
    }

    fn check_not_const(&self, name: &str) -> Result<(), ParseError> {
        if self.is_const(name) {
            return Err(ParseError::const_reassignment(name));
        }
        Ok(())
    }

    /// Parse the body of a lambda as an independent block that shares this
    /// parse's symbol tables. `params` are visible inside the body only.
    pub(crate) fn parse_block_text(&mut self, text: &str, params: &[String]) -> Result<Vec<Statement>, ParseError> {
        self.enter()?;
        let base = self.line_number.max(1) - 1;
        let lines = prepare_lines(text)
            .into_iter()
            .map(|l| SourceLine { number: l.number + base, ..l })
            .collect();

        let saved_lines = std::mem::replace(&mut self.lines, lines);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_line = self.line_number;
        let saved_variables = self.variables.clone();
        for param in params {
            self.variables.insert(param.clone(), ValueType::Unknown);
        }

        let result = self.parse_statements(true);

        self.lines = saved_lines;
        self.pos = saved_pos;
        self.line_number = saved_line;
        self.variables = saved_variables;
        self.leave();
        result
    }

    // =========================================================================
    // LINE CURSOR
    // =========================================================================

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(ParseError::new(
                format!("Maximum nesting depth of {} exceeded", MAX_PARSER_DEPTH),
                self.line_number,
            )
            .with_kind(ParseErrorKind::Limit));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn current(&self) -> Option<&SourceLine> {
        self.lines.get(self.pos)
    }

    fn current_text(&self) -> &str {
        self.current().map(|l| l.text.as_str()).unwrap_or("")
    }

    /// Insert virtual lines at the cursor.
    fn insert_lines(&mut self, pieces: Vec<String>, number: usize) {
        let new_lines: Vec<SourceLine> = pieces.into_iter().map(|p| SourceLine::new(p, number)).collect();
        self.lines.splice(self.pos..self.pos, new_lines);
    }

    /// Take the current statement text, joining following lines while
    /// brackets stay open.
    fn take_statement_text(&mut self) -> Result<String, ParseError> {
        let mut text = self.current_text().to_string();
        self.pos += 1;

        if starts_with_keyword(&text, BLOCK_KEYWORDS) || text.starts_with('}') {
            return Ok(text);
        }

        let start_line = self.line_number;
        while bracket_balance(&text) > 0 {
            match self.current() {
                Some(line) => {
                    text.push('\n');
                    text.push_str(&line.text);
                    self.pos += 1;
                }
                None => {
                    return Err(ParseError::new("Unclosed bracket", start_line));
                }
            }
        }
        Ok(text)
    }

    /// Consume the header line and splice the text after its opening brace
    /// in as virtual lines. `rest` is the header text after the construct's
    /// parenthesized part. A header without a brace takes one statement.
    fn open_block(&mut self, rest: &str) -> Result<(), ParseError> {
        let number = self.line_number;
        self.pos += 1;
        let rest = rest.trim();

        let body = if let Some(tail) = rest.strip_prefix('{') {
            tail.to_string()
        } else if rest.is_empty() {
            match self.current() {
                Some(line) if line.text.starts_with('{') => {
                    let tail = line.text[1..].to_string();
                    self.pos += 1;
                    tail
                }
                _ => return Err(ParseError::new("Expected '{' to open block", number)),
            }
        } else {
            format!("{} }}", rest)
        };

        let pieces = split_inline(&body);
        self.insert_lines(pieces, number);
        Ok(())
    }

    /// Parse statements up to (not including) the closing `}` line.
    fn parse_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        let open_line = self.line_number;
        self.enter()?;
        let body = self.parse_statements(false)?;
        self.leave();
        if self.current().is_none() {
            return Err(ParseError::new("Unmatched '{': missing closing brace", open_line));
        }
        Ok(body)
    }

    /// Consume the closing `}` line and return whatever follows the brace.
    fn close_block(&mut self) -> String {
        let rest = self.current_text().trim_start_matches('}').trim().to_string();
        self.pos += 1;
        rest
    }

    /// After a closing brace, return the continuation keyword line
    /// (`else ...`, `catch ...`) if there is one, consuming it.
    fn continuation(&mut self, after_brace: String, keyword: &str) -> Option<String> {
        if starts_with_keyword(&after_brace, &[keyword]) {
            return Some(after_brace);
        }
        if !after_brace.is_empty() && after_brace != ";" && after_brace != ")" && after_brace != ");" {
            let number = self.line_number;
            self.insert_lines(vec![after_brace], number);
            return None;
        }
        if starts_with_keyword(self.current_text(), &[keyword]) {
            let text = self.current_text().to_string();
            self.line_number = self.current().map(|l| l.number).unwrap_or(self.line_number);
            self.pos += 1;
            return Some(text);
        }
        None
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn parse_statements(&mut self, top_level: bool) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while let Some(line) = self.current() {
            if line.text.starts_with('}') {
                if top_level {
                    return Err(ParseError::new("Unexpected '}'", line.number));
                }
                break;
            }
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }

    pub(crate) fn parse_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        let Some(line) = self.current() else {
            return Ok(None);
        };
        let number = line.number;
        let text = line.text.clone();
        self.line_number = number;

        if text == ";" {
            self.pos += 1;
            return Ok(None);
        }

        self.dispatch(&text).map_err(|e| e.at_line(number))
    }

    fn dispatch(&mut self, text: &str) -> Result<Option<Statement>, ParseError> {
        if is_raw_block_start(text) {
            return self.parse_raw_block(text).map(Some);
        }
        if starts_with_keyword(text, &["let", "const"]) {
            let text = self.take_statement_text()?;
            return self.parse_declaration(&text).map(Some);
        }
        if starts_with_keyword(text, &["function"]) {
            return self.parse_function(text).map(Some);
        }
        if let Some((condition, rest)) = keyword_parens(text, "if") {
            let (condition, rest) = (condition.to_string(), rest.to_string());
            return self.parse_if(&condition, &rest).map(Some);
        }
        if let Some((header, rest)) = keyword_parens(text, "for") {
            let (header, rest) = (header.to_string(), rest.to_string());
            return self.parse_for(&header, &rest).map(Some);
        }
        if let Some((condition, rest)) = keyword_parens(text, "while") {
            let condition = self.parse_expression(condition)?;
            let rest = rest.to_string();
            self.open_block(&rest)?;
            let body = self.parse_body()?;
            self.close_trailing();
            return Ok(Some(Statement::While(WhileStatement { condition, body })));
        }
        if let Some((subject, rest)) = keyword_parens(text, "switch") {
            let (subject, rest) = (subject.to_string(), rest.to_string());
            return self.parse_switch(&subject, &rest).map(Some);
        }
        if starts_with_keyword(text, &["try"]) {
            let rest = text[3..].to_string();
            return self.parse_try(&rest).map(Some);
        }
        if starts_with_keyword(text, &["return"]) {
            let text = self.take_statement_text()?;
            return self.parse_return(&text).map(Some);
        }
        if starts_with_keyword(text, &["exit"]) && (text.len() == 4 || !looks_like_shell_exit(text)) {
            let text = self.take_statement_text()?;
            return self.parse_exit(&text).map(Some);
        }
        if text == "break;" || text == "break" {
            self.pos += 1;
            return Ok(Some(Statement::Break));
        }
        if text == "continue;" || text == "continue" {
            self.pos += 1;
            return Ok(Some(Statement::Continue));
        }
        if let Some(caps) = NAMESPACE_CALL.captures(text) {
            let head = &caps[1];
            if builtins::is_namespace(head) && self.variable_type(head).is_none() {
                let text = self.take_statement_text()?;
                return self.parse_expression_statement(&text).map(Some);
            }
        }
        if let Some(statement) = self.try_parse_assignment(text)? {
            return Ok(Some(statement));
        }
        if looks_like_shell(text) {
            if self.strict {
                return Err(ParseError::new(
                    format!("Unrecognized statement '{}' (wrap native shell in bash {{ ... }})", text),
                    self.line_number,
                ));
            }
            tracing::warn!(line = self.line_number, content = %text, "treating line as raw shell");
            let text = self.take_statement_text()?;
            return Ok(Some(Statement::Raw(RawStatement { content: text })));
        }

        let text = self.take_statement_text()?;
        self.parse_expression_statement(&text).map(Some)
    }

    /// Consume a closing brace, keeping anything after it as a new line.
    fn close_trailing(&mut self) {
        let rest = self.close_block();
        if !rest.is_empty() && rest != ";" {
            let number = self.line_number;
            self.insert_lines(vec![rest], number);
        }
    }

    fn parse_raw_block(&mut self, text: &str) -> Result<Statement, ParseError> {
        let open_line = self.line_number;
        let brace = text.find('{').unwrap_or(text.len());
        let mut pending = text[brace + 1..].trim().to_string();
        self.pos += 1;

        let mut depth = 1;
        // (line, taken from the source as written)
        let mut content: Vec<(String, bool)> = Vec::new();
        let mut from_source = false;
        let mut last_number = open_line;
        loop {
            if !pending.trim().is_empty() {
                if let Some(close) = find_block_close(&pending, &mut depth) {
                    let before = pending[..close].trim_end();
                    if !before.trim().is_empty() {
                        content.push((before.to_string(), from_source));
                    }
                    let after = pending[close + 1..].trim().to_string();
                    if !after.is_empty() && after != ";" {
                        self.insert_lines(vec![after], last_number);
                    }
                    break;
                }
                content.push((pending, from_source));
            }
            match self.current() {
                Some(line) => {
                    // Blank lines were dropped while preparing lines
                    for _ in last_number + 1..line.number {
                        content.push((String::new(), true));
                    }
                    last_number = last_number.max(line.number);
                    pending = line.raw.clone();
                    from_source = true;
                    self.pos += 1;
                }
                None => return Err(ParseError::new("Unterminated 'bash {' block", open_line)),
            }
        }

        Ok(Statement::Raw(RawStatement { content: dedent(&content) }))
    }

    fn parse_declaration(&mut self, text: &str) -> Result<Statement, ParseError> {
        let caps = DECLARATION
            .captures(text)
            .ok_or_else(|| ParseError::syntax(format!("Invalid variable declaration: {}", text)))?;
        let is_const = &caps[1] == "const";
        let name = caps[2].to_string();

        if self.is_const(&name) {
            return Err(ParseError::syntax(format!("Cannot redeclare const variable '{}'", name))
                .with_kind(ParseErrorKind::ConstReassignment));
        }

        let declared = match caps.get(3) {
            Some(annotation) => {
                let t = ValueType::from_annotation(annotation.as_str());
                if t == ValueType::Unknown || t == ValueType::Void {
                    return Err(ParseError::syntax(format!(
                        "Unknown type '{}' for variable '{}'",
                        annotation.as_str(),
                        name
                    )));
                }
                Some(t)
            }
            None => None,
        };

        let value = match caps.get(4) {
            Some(value_text) => {
                let mut value = self.parse_expression(value_text.as_str())?;
                if let (Some(t), Expression::ArrayLiteral(array)) = (declared, &mut value) {
                    if array.elements.is_empty() && t.is_array() {
                        array.element_type = t.element();
                    }
                }
                value
            }
            None if is_const => {
                return Err(ParseError::syntax(format!("const variable '{}' must be initialized", name)));
            }
            None => AST::default_value(declared.unwrap_or(ValueType::String)),
        };

        if let Some(t) = declared {
            check_literal_type(&name, t, &value)?;
        }

        let value_type = declared.unwrap_or_else(|| value.value_type());
        self.variables.insert(name.clone(), value_type);
        if is_const {
            self.consts.insert(name.clone());
        }

        Ok(Statement::VariableDeclaration(VariableDeclaration { name, value_type, value, is_const }))
    }

    fn parse_function(&mut self, text: &str) -> Result<Statement, ParseError> {
        let caps = FUNCTION
            .captures(text)
            .ok_or_else(|| ParseError::syntax(format!("Invalid function signature: {}", text)))?;
        let name = caps[1].to_string();

        let mut parameters = Vec::new();
        for param in caps[2].split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let param_caps = PARAMETER
                .captures(param)
                .ok_or_else(|| ParseError::syntax(format!("Invalid parameter '{}' in function '{}'", param, name)))?;
            let value_type = param_caps
                .get(2)
                .map(|t| ValueType::from_annotation(t.as_str()))
                .unwrap_or(ValueType::Unknown);
            parameters.push(Parameter { name: param_caps[1].to_string(), value_type });
        }

        let return_type = caps
            .get(3)
            .map(|t| ValueType::from_annotation(t.as_str()))
            .unwrap_or(ValueType::Unknown);
        let rest = caps.get(4).map(|m| m.as_str()).unwrap_or("").to_string();

        // registered before the body so recursive calls see the return type
        self.functions.insert(name.clone(), return_type);

        let saved_variables = self.variables.clone();
        for param in &parameters {
            self.variables.insert(param.name.clone(), param.value_type);
        }

        self.open_block(&rest)?;
        let body = self.parse_body();
        self.variables = saved_variables;
        let body = body?;
        self.close_trailing();

        Ok(Statement::FunctionDeclaration(FunctionDeclaration { name, parameters, body, return_type }))
    }

    fn parse_if(&mut self, condition: &str, rest: &str) -> Result<Statement, ParseError> {
        let condition = self.parse_expression(condition)?;
        self.open_block(rest)?;
        let then_body = self.parse_body()?;

        let after = self.close_block();
        let mut else_body = Vec::new();
        let mut else_if = false;

        if let Some(else_line) = self.continuation(after, "else") {
            let number = self.line_number;
            let tail = else_line["else".len()..].trim().to_string();
            // the else line is re-inserted so the nested construct can consume it
            self.insert_lines(vec![tail.clone()], number);
            if let Some((nested_condition, nested_rest)) = keyword_parens(&tail, "if") {
                let (c, r) = (nested_condition.to_string(), nested_rest.to_string());
                self.enter()?;
                let nested = self.parse_if(&c, &r).map_err(|e| e.at_line(number))?;
                self.leave();
                else_body.push(nested);
                else_if = true;
            } else {
                self.open_block(&tail)?;
                else_body = self.parse_body()?;
                self.close_trailing();
            }
        }

        Ok(Statement::If(IfStatement { condition, then_body, else_body, else_if }))
    }

    fn parse_for(&mut self, header: &str, rest: &str) -> Result<Statement, ParseError> {
        if let Some(caps) = FOR_OF.captures(header) {
            let variable = caps[1].to_string();
            let iterable = self.parse_expression(&caps[3])?;
            let variable_type = caps
                .get(2)
                .map(|t| ValueType::from_annotation(t.as_str()))
                .unwrap_or_else(|| iterable.value_type().element());

            self.variables.insert(variable.clone(), variable_type);
            self.open_block(rest)?;
            let body = self.parse_body()?;
            self.close_trailing();
            return Ok(Statement::ForIn(ForInLoop { variable, variable_type, iterable, body }));
        }

        let parts = split_top_level(header, ';');
        if parts.len() != 3 {
            return Err(ParseError::syntax(format!("Invalid for loop header: {}", header)));
        }

        let init = FOR_INIT
            .captures(&parts[0])
            .ok_or_else(|| ParseError::syntax(format!("Invalid for loop initializer: {}", parts[0])))?;
        let init_variable = init[1].to_string();
        self.check_not_const(&init_variable)?;
        let init_value = self.parse_expression(&init[3])?;
        let init_type = init
            .get(2)
            .map(|t| ValueType::from_annotation(t.as_str()))
            .unwrap_or_else(|| match init_value.value_type() {
                ValueType::Unknown => ValueType::Number,
                t => t,
            });
        self.variables.insert(init_variable.clone(), init_type);

        let condition = self.parse_expression(&parts[1])?;

        let update = FOR_UPDATE
            .captures(&parts[2])
            .ok_or_else(|| ParseError::syntax(format!("Invalid for loop update: {}", parts[2])))?;
        let (update_variable, update_operator, update_value) = if let Some(name) = update.get(2) {
            (name.as_str().to_string(), step_operator(&update[1]), None)
        } else if let Some(name) = update.get(3) {
            (name.as_str().to_string(), step_operator(&update[4]), None)
        } else {
            let operator = if &update[6] == "+=" { UpdateOperator::AddAssign } else { UpdateOperator::SubAssign };
            let value = self.parse_expression(&update[7])?;
            (update[5].to_string(), operator, Some(value))
        };
        self.check_not_const(&update_variable)?;

        self.open_block(rest)?;
        let body = self.parse_body()?;
        self.close_trailing();

        Ok(Statement::For(ForLoop {
            init_variable,
            init_type,
            init_value,
            condition,
            update_variable,
            update_operator,
            update_value,
            body,
        }))
    }

    fn parse_switch(&mut self, subject: &str, rest: &str) -> Result<Statement, ParseError> {
        let expression = self.parse_expression(subject)?;
        self.open_block(rest)?;
        self.enter()?;

        struct Pending {
            values: Vec<Expression>,
            body: Vec<Statement>,
            broke: bool,
        }

        let mut clauses: Vec<Pending> = Vec::new();
        let mut default: Option<Pending> = None;
        // number of case clauses seen before `default:`
        let mut default_position: Option<usize> = None;
        let mut in_default = false;

        loop {
            let Some(line) = self.current() else {
                return Err(ParseError::new("Unmatched '{' in switch statement", self.line_number));
            };
            let text = line.text.clone();
            let number = line.number;
            self.line_number = number;

            if text.starts_with('}') {
                break;
            }

            if let Some(label) = case_label(&text) {
                let (value_text, remainder) = label;
                let value = self.parse_expression(&value_text).map_err(|e| e.at_line(number))?;
                self.pos += 1;
                in_default = false;
                let clause_count = clauses.len();
                match clauses.last_mut() {
                    Some(last) if last.body.is_empty() && !last.broke && default_position != Some(clause_count) => {
                        last.values.push(value)
                    }
                    _ => clauses.push(Pending { values: vec![value], body: Vec::new(), broke: false }),
                }
                if !remainder.is_empty() {
                    self.insert_lines(split_inline(&remainder), number);
                }
                continue;
            }

            if let Some(remainder) = text.strip_prefix("default") {
                if let Some(remainder) = remainder.trim_start().strip_prefix(':') {
                    self.pos += 1;
                    in_default = true;
                    default_position = Some(clauses.len());
                    default = Some(Pending { values: Vec::new(), body: Vec::new(), broke: false });
                    let remainder = remainder.trim();
                    if !remainder.is_empty() {
                        self.insert_lines(split_inline(remainder), number);
                    }
                    continue;
                }
            }

            let target = if in_default { default.as_mut() } else { clauses.last_mut() };
            let Some(target) = target else {
                return Err(ParseError::new("Statement outside of a case clause", number));
            };

            if text == "break;" || text == "break" {
                self.pos += 1;
                target.broke = true;
                continue;
            }

            let statement = self.parse_statement()?;
            let target = if in_default { default.as_mut() } else { clauses.last_mut() };
            if let (Some(target), Some(statement)) = (target, statement) {
                if target.broke {
                    tracing::warn!(line = number, "unreachable statement after break in case clause");
                } else {
                    target.body.push(statement);
                }
            }
        }

        self.leave();
        self.close_trailing();

        // `*)` is emitted last, so a default placed before other clauses
        // carries the bodies it falls into, and so does the clause falling
        // into it.
        if let (Some(position), Some(pending)) = (default_position, default.as_mut()) {
            if position < clauses.len() {
                for clause in &clauses[position..] {
                    if pending.broke {
                        break;
                    }
                    pending.body.extend(clause.body.iter().cloned());
                    pending.broke = clause.broke;
                }
                if let Some(before) = position.checked_sub(1).and_then(|i| clauses.get_mut(i)) {
                    if !before.broke {
                        before.body.extend(pending.body.iter().cloned());
                        before.broke = true;
                    }
                }
            }
        }

        let count = clauses.len();
        let cases = clauses
            .into_iter()
            .enumerate()
            .map(|(i, pending)| {
                let followed = i + 1 < count || default_position.is_some_and(|d| d > i);
                let end = if pending.broke {
                    CaseEnd::Break
                } else if followed {
                    CaseEnd::FallThrough
                } else {
                    CaseEnd::ImplicitEnd
                };
                CaseClause { values: pending.values, body: pending.body, end }
            })
            .collect();

        Ok(Statement::Switch(SwitchStatement {
            expression,
            cases,
            default_case: default.map(|d| d.body),
        }))
    }

    fn parse_try(&mut self, rest: &str) -> Result<Statement, ParseError> {
        let open_line = self.line_number;
        self.open_block(rest)?;
        let try_body = self.parse_body()?;
        let after = self.close_block();

        let Some(catch_line) = self.continuation(after, "catch") else {
            return Err(ParseError::new("try block requires a catch block", open_line));
        };

        let tail = catch_line["catch".len()..].trim();
        let (catch_variable, rest) = if tail.starts_with('(') {
            let close = find_matching(tail, 0)
                .ok_or_else(|| ParseError::syntax("Unclosed '(' in catch clause"))?;
            let name = tail[1..close].split(':').next().unwrap_or("").trim().to_string();
            if !name.is_empty() && !is_identifier(&name) {
                return Err(ParseError::syntax(format!("Invalid catch variable '{}'", name)));
            }
            ((!name.is_empty()).then_some(name), tail[close + 1..].to_string())
        } else {
            (None, tail.to_string())
        };

        let number = self.line_number;
        self.insert_lines(vec![rest.clone()], number);
        if let Some(name) = &catch_variable {
            self.variables.insert(name.clone(), ValueType::String);
        }
        self.open_block(&rest)?;
        let catch_body = self.parse_body()?;
        let after = self.close_block();

        if starts_with_keyword(&after, &["finally"]) || starts_with_keyword(self.current_text(), &["finally"]) {
            return Err(ParseError::syntax("finally blocks are not supported"));
        }
        if !after.is_empty() && after != ";" {
            self.insert_lines(vec![after], number);
        }

        Ok(Statement::TryCatch(TryCatchStatement { try_body, catch_variable, catch_body }))
    }

    fn parse_return(&mut self, text: &str) -> Result<Statement, ParseError> {
        let caps = RETURN
            .captures(text)
            .ok_or_else(|| ParseError::syntax(format!("Invalid return statement: {}", text)))?;
        let value = match caps.get(1).map(|m| m.as_str().trim()).filter(|v| !v.is_empty()) {
            Some(v) => Some(self.parse_expression(v)?),
            None => None,
        };
        Ok(Statement::Return(ReturnStatement { value }))
    }

    fn parse_exit(&mut self, text: &str) -> Result<Statement, ParseError> {
        let caps = EXIT
            .captures(text)
            .ok_or_else(|| ParseError::syntax(format!("Invalid exit statement: {}", text)))?;
        let code = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty());
        let exit_code = match code {
            Some(code) => self.parse_expression(code)?,
            None => AST::number("0"),
        };
        Ok(Statement::Exit(ExitStatement { exit_code }))
    }

    fn try_parse_assignment(&mut self, text: &str) -> Result<Option<Statement>, ParseError> {
        let Some(caps) = ASSIGNMENT.captures(text) else {
            return Ok(None);
        };
        let name = caps[1].to_string();
        // `NAME=value` without a semicolon is shell unless NAME is declared
        if !text.ends_with(';') && self.variable_type(&name).is_none() {
            return Ok(None);
        }

        let text = self.take_statement_text()?;
        let Some(caps) = ASSIGNMENT.captures(&text) else {
            return Err(ParseError::syntax(format!("Invalid assignment: {}", text)));
        };
        self.check_not_const(&name)?;

        let index = match caps.get(2) {
            Some(index) => Some(self.parse_expression(index.as_str())?),
            None => None,
        };
        let value_text = caps[4].trim().trim_end_matches(';').trim();
        let mut value = self.parse_expression(value_text)?;

        let operator = &caps[3];
        if operator != "=" {
            let binary = match operator {
                "+=" => BinaryOperator::Add,
                "-=" => BinaryOperator::Sub,
                "*=" => BinaryOperator::Mul,
                "/=" => BinaryOperator::Div,
                _ => BinaryOperator::Mod,
            };
            let current_type = self.variable_type(&name).unwrap_or(ValueType::Unknown);
            value = AST::binary(AST::variable(&name, current_type), binary, value);
        }

        if index.is_none() {
            if let Some(t) = self.variable_type(&name) {
                if t != ValueType::Unknown {
                    check_literal_type(&name, t, &value)?;
                }
            }
        }

        Ok(Some(Statement::Assignment(AssignmentStatement { variable_name: name, index, value })))
    }

    fn parse_expression_statement(&mut self, text: &str) -> Result<Statement, ParseError> {
        let expression = self.parse_expression(text.trim().trim_end_matches(';'))?;
        Ok(Statement::Expression(ExpressionStatement { expression }))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Does `text` start with one of `keywords` as a whole word?
fn starts_with_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| {
        text.strip_prefix(k)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'))
    })
}

/// `exit 1` is both shell and source; only an `exit` that continues with
/// shell syntax (`exit $code`, `exit "$?"`) is left to the raw fallback.
fn looks_like_shell_exit(text: &str) -> bool {
    let rest = text[4..].trim_start();
    rest.starts_with('$') || rest.starts_with("\"$")
}

fn step_operator(text: &str) -> UpdateOperator {
    if text == "++" {
        UpdateOperator::Increment
    } else {
        UpdateOperator::Decrement
    }
}

/// Split `case X: rest` into the label text and what follows the colon.
fn case_label(text: &str) -> Option<(String, String)> {
    if !starts_with_keyword(text, &["case"]) {
        return None;
    }
    let colon = find_top_level(text, 4, |c| c == ':')?;
    Some((text[4..colon].trim().to_string(), text[colon + 1..].trim().to_string()))
}

/// Reject a literal whose type contradicts a declared type.
fn check_literal_type(name: &str, declared: ValueType, value: &Expression) -> Result<(), ParseError> {
    let actual = match value.unparenthesized() {
        Expression::Literal(lit) => lit.value_type,
        Expression::ArrayLiteral(array) if array.elements.is_empty() => return Ok(()),
        Expression::ArrayLiteral(array) => array.element_type.array_of(),
        Expression::Interpolation(_) => ValueType::String,
        _ => return Ok(()),
    };
    if actual == ValueType::Unknown || actual == declared {
        return Ok(());
    }
    Err(ParseError::type_mismatch(format!(
        "Type mismatch: cannot assign {} to '{}' of type {}",
        actual, name, declared
    )))
}

/// Convenience function to parse a program
pub fn parse(source: &str) -> Result<ProgramNode, ParseError> {
    let mut parser = Parser::new();
    parser.parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{BuiltinCall, LiteralExpression};

    fn statements(source: &str) -> Vec<Statement> {
        parse(source).unwrap().statements
    }

    #[test]
    fn test_declaration_with_type() {
        let stmts = statements("let x: number = 5;");
        assert_eq!(
            stmts,
            vec![Statement::VariableDeclaration(VariableDeclaration {
                name: "x".to_string(),
                value_type: ValueType::Number,
                value: AST::number("5"),
                is_const: false,
            })]
        );
    }

    #[test]
    fn test_declaration_default_value() {
        let stmts = statements("let items: string[];");
        match &stmts[0] {
            Statement::VariableDeclaration(decl) => {
                assert_eq!(decl.value_type, ValueType::StringArray);
                assert!(matches!(decl.value, Expression::ArrayLiteral(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_const_reassignment_rejected() {
        let err = parse("const x = 1;\nx = 2;").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ConstReassignment);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_const_increment_rejected() {
        let err = parse("const n = 1;\nn++;").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ConstReassignment);
        let err = parse("const n = 1;\nn += 2;").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ConstReassignment);
    }

    #[test]
    fn test_let_reassignment_allowed() {
        let stmts = statements("let x = 1;\nx = 2;");
        assert!(matches!(stmts[1], Statement::Assignment(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = parse("let x: number = \"five\";").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TypeMismatch);
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let stmts = statements("let total = 1;\ntotal += 2;");
        match &stmts[1] {
            Statement::Assignment(assign) => {
                assert_eq!(
                    assign.value,
                    AST::binary(AST::variable("total", ValueType::Number), BinaryOperator::Add, AST::number("2"))
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_else_multi_line() {
        let stmts = statements("let x = 1;\nif (x > 0) {\n  console.log(\"pos\");\n} else {\n  console.log(\"neg\");\n}");
        match &stmts[1] {
            Statement::If(stmt) => {
                assert_eq!(stmt.then_body.len(), 1);
                assert_eq!(stmt.else_body.len(), 1);
                assert!(!stmt.else_if);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_single_line_matches_multi_line() {
        let single = statements("let x = 1;\nif (x > 0) { console.log(\"a\"); } else { console.log(\"b\"); }");
        let multi = statements("let x = 1;\nif (x > 0) {\nconsole.log(\"a\");\n}\nelse\n{\nconsole.log(\"b\");\n}");
        assert_eq!(single, multi);
    }

    #[test]
    fn test_else_if_chain() {
        let stmts = statements(
            "let x = 1;\nif (x == 1) {\n  console.log(\"one\");\n} else if (x == 2) {\n  console.log(\"two\");\n} else {\n  console.log(\"many\");\n}",
        );
        match &stmts[1] {
            Statement::If(stmt) => {
                assert!(stmt.else_if);
                match &stmt.else_body[0] {
                    Statement::If(nested) => assert_eq!(nested.else_body.len(), 1),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_insensitive() {
        let a = statements("let x: number = 1 + 2;\nif (x > 2) {\nconsole.log(x);\n}");
        let b = statements("\n\n   let   x :  number=1+2 ;\n\n   if(x>2){\n\n      console.log( x );\n   }\n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_c_style_for() {
        let stmts = statements("for (let i = 0; i < 3; i++) {\n  console.log(i);\n}");
        match &stmts[0] {
            Statement::For(stmt) => {
                assert_eq!(stmt.init_variable, "i");
                assert_eq!(stmt.update_operator, UpdateOperator::Increment);
                assert_eq!(stmt.body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_for_of() {
        let stmts = statements("let names: string[] = [\"a\", \"b\"];\nfor (const name of names) {\n  console.log(name);\n}");
        match &stmts[1] {
            Statement::ForIn(stmt) => {
                assert_eq!(stmt.variable, "name");
                assert_eq!(stmt.variable_type, ValueType::String);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switch_grouped_labels_and_ends() {
        let source = r#"let c = "b";
switch (c) {
  case "a":
  case "b":
    console.log("ab");
    break;
  case "c":
    console.log("c");
  case "d":
    console.log("d");
  default:
    console.log("other");
}"#;
        match &statements(source)[1] {
            Statement::Switch(stmt) => {
                assert_eq!(stmt.cases.len(), 3);
                assert_eq!(stmt.cases[0].values.len(), 2);
                assert_eq!(stmt.cases[0].end, CaseEnd::Break);
                assert_eq!(stmt.cases[1].end, CaseEnd::FallThrough);
                assert_eq!(stmt.cases[2].end, CaseEnd::FallThrough);
                assert_eq!(stmt.default_case.as_ref().map(|d| d.len()), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switch_inline_case() {
        let source = "let n = 2;\nswitch (n) {\n  case 1: console.log(\"one\"); break;\n  case 2: console.log(\"two\");\n}";
        match &statements(source)[1] {
            Statement::Switch(stmt) => {
                assert_eq!(stmt.cases[0].end, CaseEnd::Break);
                assert_eq!(stmt.cases[1].end, CaseEnd::ImplicitEnd);
                assert!(stmt.default_case.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switch_default_first_falls_into_case() {
        let source = "let x = \"B\";\nswitch (x) {\n  default:\n    console.log(\"d\");\n  case \"A\":\n    console.log(\"a\");\n    break;\n  case \"C\":\n    console.log(\"c\");\n}";
        match &statements(source)[1] {
            Statement::Switch(stmt) => {
                assert_eq!(stmt.cases.len(), 2);
                assert_eq!(stmt.cases[0].body.len(), 1);
                assert_eq!(stmt.default_case.as_ref().map(|d| d.len()), Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switch_case_falls_through_middle_default() {
        let source = "let x = \"A\";\nswitch (x) {\n  case \"A\":\n    console.log(\"a\");\n  default:\n    console.log(\"d\");\n  case \"B\":\n    console.log(\"b\");\n    break;\n}";
        match &statements(source)[1] {
            Statement::Switch(stmt) => {
                // a, d, b
                assert_eq!(stmt.cases[0].body.len(), 3);
                assert_eq!(stmt.cases[0].end, CaseEnd::Break);
                assert_eq!(stmt.cases[1].body.len(), 1);
                assert_eq!(stmt.default_case.as_ref().map(|d| d.len()), Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_switch_default_first_with_break_unchanged() {
        let source = "let x = \"B\";\nswitch (x) {\n  default:\n    console.log(\"d\");\n    break;\n  case \"A\":\n    console.log(\"a\");\n}";
        match &statements(source)[1] {
            Statement::Switch(stmt) => {
                assert_eq!(stmt.default_case.as_ref().map(|d| d.len()), Some(1));
                assert_eq!(stmt.cases[0].end, CaseEnd::ImplicitEnd);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_catch() {
        let stmts = statements("try {\n  fs.readFile(\"x\");\n} catch (e) {\n  console.error(e);\n}");
        match &stmts[0] {
            Statement::TryCatch(stmt) => {
                assert_eq!(stmt.catch_variable.as_deref(), Some("e"));
                assert_eq!(stmt.try_body.len(), 1);
                assert_eq!(stmt.catch_body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_without_catch() {
        assert!(parse("try {\n  a();\n}").is_err());
    }

    #[test]
    fn test_function_declaration() {
        let stmts = statements("function add(a: number, b: number): number {\n  return a + b;\n}\nlet s = add(1, 2);");
        match &stmts[0] {
            Statement::FunctionDeclaration(func) => {
                assert_eq!(func.parameters.len(), 2);
                assert_eq!(func.return_type, ValueType::Number);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &stmts[1] {
            Statement::VariableDeclaration(decl) => assert_eq!(decl.value_type, ValueType::Number),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_raw_block() {
        let stmts = statements("bash {\n  for f in *; do\n    echo \"$f\"\n  done\n}\nconsole.log(\"x\");");
        assert_eq!(
            stmts[0],
            Statement::Raw(RawStatement { content: "for f in *; do\n  echo \"$f\"\ndone".to_string() })
        );
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_raw_block_keeps_heredoc_body() {
        let stmts = statements("bash {\n  cat <<EOF\n  indented\n\n    deeper\nEOF\n}");
        assert_eq!(
            stmts[0],
            Statement::Raw(RawStatement { content: "  cat <<EOF\n  indented\n\n    deeper\nEOF".to_string() })
        );
    }

    #[test]
    fn test_raw_block_nested_in_if_keeps_relative_indent() {
        let stmts = statements("if (true) {\n  bash {\n    if true; then\n      echo hi\n    fi\n  }\n}");
        match &stmts[0] {
            Statement::If(stmt) => assert_eq!(
                stmt.then_body[0],
                Statement::Raw(RawStatement { content: "if true; then\n  echo hi\nfi".to_string() })
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_raw_glob_keeps_following_statements() {
        let stmts = statements("rm -rf /tmp/cache/*\nconsole.log(\"after\");\nlet y: number = 2;");
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], Statement::Raw(RawStatement { content: "rm -rf /tmp/cache/*".to_string() }));
    }

    #[test]
    fn test_raw_block_keeps_glob_and_url() {
        let stmts = statements("bash {\n  cp /src/* /dst/\n  curl http://example.com/a\n}\nconsole.log(\"x\");");
        assert_eq!(
            stmts[0],
            Statement::Raw(RawStatement { content: "cp /src/* /dst/\ncurl http://example.com/a".to_string() })
        );
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_error_line_after_block_comment() {
        let err = parse("/*\n * header\n */\nconst x = 1;\nx = 2;").unwrap_err();
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_raw_heuristic() {
        let stmts = statements("echo \"hello\" | tr a-z A-Z");
        assert!(matches!(stmts[0], Statement::Raw(_)));
    }

    #[test]
    fn test_multi_line_array_joined() {
        let stmts = statements("let xs: number[] = [\n  1,\n  2,\n  3\n];");
        match &stmts[0] {
            Statement::VariableDeclaration(decl) => match &decl.value {
                Expression::ArrayLiteral(array) => assert_eq!(array.elements.len(), 3),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_multi_line_for_each() {
        let stmts = statements("let xs = [\"a\"];\narray.forEach(xs, (x) => {\n  console.log(x);\n});");
        match &stmts[1] {
            Statement::Expression(stmt) => match &stmt.expression {
                Expression::Builtin(call) => match call.as_ref() {
                    BuiltinCall::ArrayForEach { callback, .. } => assert_eq!(callback.body.len(), 1),
                    other => panic!("unexpected {:?}", other),
                },
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_brace() {
        let err = parse("if (true) {\n  console.log(\"x\");").unwrap_err();
        assert!(err.message.contains("missing closing brace"));
    }

    #[test]
    fn test_unexpected_closing_brace() {
        assert!(parse("}").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut source = String::new();
        for _ in 0..(MAX_PARSER_DEPTH + 5) {
            source.push_str("if (true) {\n");
        }
        for _ in 0..(MAX_PARSER_DEPTH + 5) {
            source.push_str("}\n");
        }
        let err = parse(&source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Limit);
    }

    #[test]
    fn test_exit_and_return() {
        let stmts = statements("exit(2);\nexit;");
        assert_eq!(stmts[0], Statement::Exit(ExitStatement { exit_code: AST::number("2") }));
        assert_eq!(stmts[1], Statement::Exit(ExitStatement { exit_code: AST::number("0") }));
    }

    #[test]
    fn test_unknown_builtin() {
        let err = parse("fs.teleport(\"x\");").unwrap_err();
        assert!(err.message.contains("fs.teleport"));
    }

    #[test]
    fn test_literal_value_kept() {
        let stmts = statements("const greeting = 'it\\'s';");
        match &stmts[0] {
            Statement::VariableDeclaration(decl) => assert_eq!(
                decl.value,
                Expression::Literal(LiteralExpression { value: "it's".to_string(), value_type: ValueType::String })
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_strict_rejects_heuristic_shell() {
        let source = "ls -la | grep foo";
        assert!(matches!(statements(source)[0], Statement::Raw(_)));
        let err = Parser::new().strict(true).parse(source).unwrap_err();
        assert!(err.message.contains("bash {"));
        assert!(Parser::new().strict(true).parse("bash {\n  ls -la | grep foo\n}").is_ok());
    }
}
