//! Expression Lexer
//!
//! Tokenizes a single expression string into a token vector once, so the
//! precedence parser never re-scans substrings. It handles:
//! - numbers, identifiers and keywords (`true`/`false`)
//! - single, double and template (backtick) string literals
//! - multi-character operators (`===`, `=>`, `++`, `+=`, `&&`, ...)
//! - runs of characters the language does not know, kept as `Unknown`

use std::collections::HashMap;

use crate::parser::types::ParseError;

/// Token types for expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,

    Number,
    String,
    Template,
    Identifier,
    Unknown,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Punctuation
    Comma,
    Dot,
    Colon,
    Question,
    Semicolon,
    Arrow,

    // Assignment
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,

    // Comparison
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // Logical
    AndAnd,
    OrOr,
    Bang,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "end of expression",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Template => "TEMPLATE",
            Self::Identifier => "IDENTIFIER",
            Self::Unknown => "UNKNOWN",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Colon => ":",
            Self::Question => "?",
            Self::Semicolon => ";",
            Self::Arrow => "=>",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::Eq => "==",
            Self::StrictEq => "===",
            Self::Ne => "!=",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
        }
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Identifier/number text, or the raw contents of a string literal
    pub value: String,
    /// Byte offsets into the expression text
    pub start: usize,
    pub end: usize,
    /// Quote character for string literals
    pub quote: Option<char>,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            quote: None,
        }
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.token_type == token_type
    }
}

lazy_static::lazy_static! {
    /// Operators, longest first
    static ref OPERATORS: Vec<(&'static str, TokenType)> = vec![
        ("===", TokenType::StrictEq),
        ("!==", TokenType::StrictNe),
        ("=>", TokenType::Arrow),
        ("==", TokenType::Eq),
        ("!=", TokenType::Ne),
        ("<=", TokenType::Le),
        (">=", TokenType::Ge),
        ("&&", TokenType::AndAnd),
        ("||", TokenType::OrOr),
        ("++", TokenType::PlusPlus),
        ("--", TokenType::MinusMinus),
        ("+=", TokenType::PlusAssign),
        ("-=", TokenType::MinusAssign),
        ("*=", TokenType::StarAssign),
        ("/=", TokenType::SlashAssign),
        ("%=", TokenType::PercentAssign),
    ];

    static ref SINGLE_CHAR: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('(', TokenType::LParen);
        m.insert(')', TokenType::RParen);
        m.insert('[', TokenType::LBracket);
        m.insert(']', TokenType::RBracket);
        m.insert('{', TokenType::LBrace);
        m.insert('}', TokenType::RBrace);
        m.insert(',', TokenType::Comma);
        m.insert('.', TokenType::Dot);
        m.insert(':', TokenType::Colon);
        m.insert('?', TokenType::Question);
        m.insert(';', TokenType::Semicolon);
        m.insert('=', TokenType::Assign);
        m.insert('<', TokenType::Lt);
        m.insert('>', TokenType::Gt);
        m.insert('+', TokenType::Plus);
        m.insert('-', TokenType::Minus);
        m.insert('*', TokenType::Star);
        m.insert('/', TokenType::Slash);
        m.insert('%', TokenType::Percent);
        m.insert('!', TokenType::Bang);
        m
    };
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        }
    }

    fn offset(&self, pos: usize) -> usize {
        self.chars.get(pos).map(|(o, _)| *o).unwrap_or(self.input.len())
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }

            let start = self.offset(self.pos);

            if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
                tokens.push(self.read_number(start));
            } else if c.is_ascii_alphabetic() || c == '_' {
                tokens.push(self.read_identifier(start));
            } else if c == '"' || c == '\'' || c == '`' {
                tokens.push(self.read_string(start, c)?);
            } else if let Some(token) = self.read_operator(start) {
                tokens.push(token);
            } else {
                tokens.push(self.read_unknown(start));
            }
        }

        let end = self.input.len();
        tokens.push(Token::new(TokenType::Eof, "", end, end));
        Ok(tokens)
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut seen_dot = false;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_dot && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let end = self.offset(self.pos);
        Token::new(TokenType::Number, &self.input[start..end], start, end)
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let end = self.offset(self.pos);
        Token::new(TokenType::Identifier, &self.input[start..end], start, end)
    }

    fn read_string(&mut self, start: usize, quote: char) -> Result<Token, ParseError> {
        self.pos += 1;
        let content_start = self.offset(self.pos);
        let mut escaped = false;

        while let Some(c) = self.peek(0) {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                let content_end = self.offset(self.pos);
                self.pos += 1;
                let end = self.offset(self.pos);
                let token_type = if quote == '`' { TokenType::Template } else { TokenType::String };
                return Ok(Token::new(token_type, &self.input[content_start..content_end], start, end)
                    .with_quote(quote));
            }
            self.pos += 1;
        }

        Err(ParseError::syntax(format!(
            "Unterminated string literal: {}",
            &self.input[start..]
        )))
    }

    fn read_operator(&mut self, start: usize) -> Option<Token> {
        let rest = &self.input[start..];
        for (text, token_type) in OPERATORS.iter() {
            if rest.starts_with(text) {
                self.pos += text.chars().count();
                return Some(Token::new(*token_type, *text, start, start + text.len()));
            }
        }
        let c = self.peek(0)?;
        let token_type = *SINGLE_CHAR.get(&c)?;
        self.pos += 1;
        Some(Token::new(token_type, c.to_string(), start, start + c.len_utf8()))
    }

    /// Anything the language does not know (`$HOME`, `@`, `~/x`) up to the
    /// next whitespace or delimiter. `${...}` and `$(...)` are kept whole.
    fn read_unknown(&mut self, start: usize) -> Token {
        if self.peek(0) == Some('$') && matches!(self.peek(1), Some('{') | Some('(')) {
            self.skip_shell_group();
            let end = self.offset(self.pos);
            return Token::new(TokenType::Unknown, &self.input[start..end], start, end);
        }
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | ';' | '"' | '\'' | '`') {
                break;
            }
            self.pos += 1;
        }
        if self.offset(self.pos) == start {
            self.pos += 1;
        }
        let end = self.offset(self.pos);
        Token::new(TokenType::Unknown, &self.input[start..end], start, end)
    }

    /// Skip `$` and a balanced `{...}` / `(...)` group after it.
    fn skip_shell_group(&mut self) {
        self.pos += 1;
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                '{' | '(' => depth += 1,
                '}' | ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Convenience function to tokenize an expression
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        tokenize(input).unwrap().into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            types("1 + x * 2.5"),
            vec![TokenType::Number, TokenType::Plus, TokenType::Identifier, TokenType::Star, TokenType::Number, TokenType::Eof]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            types("a === b !== c => d++"),
            vec![
                TokenType::Identifier, TokenType::StrictEq, TokenType::Identifier, TokenType::StrictNe,
                TokenType::Identifier, TokenType::Arrow, TokenType::Identifier, TokenType::PlusPlus, TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_raw_contents() {
        let tokens = tokenize(r#""say \"hi\"" + 'x'"#).unwrap();
        assert_eq!(tokens[0].value, r#"say \"hi\""#);
        assert_eq!(tokens[0].quote, Some('"'));
        assert_eq!(tokens[2].value, "x");
        assert_eq!(tokens[2].quote, Some('\''));
    }

    #[test]
    fn test_template() {
        let tokens = tokenize("`Hello, ${name}`").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Template);
        assert_eq!(tokens[0].value, "Hello, ${name}");
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn test_unknown_run() {
        let tokens = tokenize("$HOME").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Unknown);
        assert_eq!(tokens[0].value, "$HOME");
    }

    #[test]
    fn test_shell_expansion_is_one_token() {
        let tokens = tokenize("${items[@]} $(date +%s)").unwrap();
        assert_eq!(tokens[0].value, "${items[@]}");
        assert_eq!(tokens[1].value, "$(date +%s)");
        assert_eq!(tokens[2].token_type, TokenType::Eof);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("f(() => { a; })").unwrap();
        let lbrace = tokens.iter().find(|t| t.is(TokenType::LBrace)).unwrap();
        let rbrace = tokens.iter().find(|t| t.is(TokenType::RBrace)).unwrap();
        assert_eq!(&"f(() => { a; })"[lbrace.end..rbrace.start], " a; ");
    }
}
