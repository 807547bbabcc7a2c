//! Expression Parser
//!
//! Precedence descent over the token vector produced by the expression
//! lexer. Precedence, loosest first:
//!
//! 1. assignment `=`, `+=`, ... (right associative)
//! 2. ternary `? :` (right associative)
//! 3. `||`
//! 4. `&&`
//! 5. `==` `===` `!=` `!==`
//! 6. `<` `<=` `>` `>=`
//! 7. `+` `-`
//! 8. `*` `/` `%`
//! 9. unary `!` `-` and prefix `++` `--`
//! 10. postfix `++` `--`
//! 11. primary

use crate::ast::types::{
    ArrayAccess, ArrayLiteral, AssignmentExpression, BinaryOperator, BuiltinCall, Expression, FunctionCall,
    LambdaExpression, UnaryOperator, UpdateExpression, ValueType, AST,
};
use crate::parser::builtins;
use crate::parser::interpolation::{has_interpolation, normalize_string, parse_interpolation};
use crate::parser::lexer::{tokenize, Token, TokenType};
use crate::parser::statement_parser::Parser;
use crate::parser::types::{ParseError, ParseErrorKind, MAX_PARSER_DEPTH};

impl Parser {
    /// Parse one expression. A trailing `;` is allowed.
    pub(crate) fn parse_expression(&mut self, text: &str) -> Result<Expression, ParseError> {
        let tokens = tokenize(text)?;
        let mut parser = ExpressionParser { parser: self, source: text, tokens, pos: 0, depth: 0 };
        parser.parse()
    }
}

struct ExpressionParser<'p, 's> {
    parser: &'p mut Parser,
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'p, 's> ExpressionParser<'p, 's> {
    fn parse(&mut self) -> Result<Expression, ParseError> {
        if self.check(TokenType::Eof) {
            return Err(ParseError::syntax("Expected expression"));
        }
        let expr = self.parse_assignment()?;
        while self.check(TokenType::Semicolon) {
            self.advance();
        }
        if !self.check(TokenType::Eof) {
            return Err(ParseError::syntax(format!(
                "Unexpected '{}' in expression: {}",
                self.current().value,
                self.source.trim()
            )));
        }
        Ok(expr)
    }

    // =========================================================================
    // TOKEN CURSOR
    // =========================================================================

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.token_type != TokenType::Eof {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token_type: TokenType) -> Result<Token, ParseError> {
        if self.check(token_type) {
            return Ok(self.advance());
        }
        let found = if self.check(TokenType::Eof) {
            "end of expression".to_string()
        } else {
            format!("'{}'", self.current().value)
        };
        Err(ParseError::syntax(format!(
            "Expected '{}' but found {} in: {}",
            token_type.as_str(),
            found,
            self.source.trim()
        )))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(ParseError::syntax("Expression nesting too deep").with_kind(ParseErrorKind::Limit));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn check_mutable(&self, name: &str) -> Result<(), ParseError> {
        if self.parser.is_const(name) {
            return Err(ParseError::const_reassignment(name));
        }
        Ok(())
    }

    fn variable(&self, name: &str) -> Expression {
        AST::variable(name, self.parser.variable_type(name).unwrap_or(ValueType::Unknown))
    }

    // =========================================================================
    // PRECEDENCE LEVELS
    // =========================================================================

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let operator = match self.peek(1).token_type {
            TokenType::Assign => None,
            TokenType::PlusAssign => Some(BinaryOperator::Add),
            TokenType::MinusAssign => Some(BinaryOperator::Sub),
            TokenType::StarAssign => Some(BinaryOperator::Mul),
            TokenType::SlashAssign => Some(BinaryOperator::Div),
            TokenType::PercentAssign => Some(BinaryOperator::Mod),
            _ => return self.parse_ternary(),
        };
        if !self.check(TokenType::Identifier) {
            return self.parse_ternary();
        }

        let name = self.advance().value;
        self.advance();
        self.check_mutable(&name)?;
        let value = self.nested(|p| p.parse_assignment())?;
        let value = match operator {
            Some(op) => AST::binary(self.variable(&name), op, value),
            None => value,
        };
        Ok(Expression::Assignment(Box::new(AssignmentExpression { name, value })))
    }

    fn parse_ternary(&mut self) -> Result<Expression, ParseError> {
        let condition = self.parse_or()?;
        if !self.check(TokenType::Question) {
            return Ok(condition);
        }
        self.advance();
        let when_true = self.nested(|p| p.parse_assignment())?;
        self.expect(TokenType::Colon)?;
        let when_false = self.nested(|p| p.parse_assignment())?;
        Ok(AST::ternary(condition, when_true, when_false))
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.check(TokenType::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = AST::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(TokenType::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = AST::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::Eq | TokenType::StrictEq => BinaryOperator::Eq,
                TokenType::Ne | TokenType::StrictNe => BinaryOperator::Ne,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = AST::binary(left, operator, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::Lt => BinaryOperator::Lt,
                TokenType::Le => BinaryOperator::Le,
                TokenType::Gt => BinaryOperator::Gt,
                TokenType::Ge => BinaryOperator::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = AST::binary(left, operator, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::Plus => BinaryOperator::Add,
                TokenType::Minus => BinaryOperator::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = AST::binary(left, operator, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::Star => BinaryOperator::Mul,
                TokenType::Slash => BinaryOperator::Div,
                TokenType::Percent => BinaryOperator::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = AST::binary(left, operator, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        match self.current().token_type {
            TokenType::Bang => {
                self.advance();
                let operand = self.nested(|p| p.parse_unary())?;
                Ok(AST::unary(UnaryOperator::Not, operand))
            }
            TokenType::Minus => {
                self.advance();
                if self.check(TokenType::Number) {
                    let number = self.advance();
                    return Ok(AST::number(format!("-{}", number.value)));
                }
                let operand = self.nested(|p| p.parse_unary())?;
                Ok(AST::unary(UnaryOperator::Neg, operand))
            }
            TokenType::PlusPlus | TokenType::MinusMinus => {
                let increment = self.advance().token_type == TokenType::PlusPlus;
                let name = self.expect(TokenType::Identifier)?.value;
                self.check_mutable(&name)?;
                Ok(Expression::Update(UpdateExpression { name, increment, prefix: true }))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_primary()?;
        if let Expression::Variable(var) = &expr {
            if self.check(TokenType::PlusPlus) || self.check(TokenType::MinusMinus) {
                let increment = self.advance().token_type == TokenType::PlusPlus;
                self.check_mutable(&var.name)?;
                return Ok(Expression::Update(UpdateExpression { name: var.name.clone(), increment, prefix: false }));
            }
        }
        Ok(expr)
    }

    // =========================================================================
    // PRIMARY
    // =========================================================================

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::LParen => {
                if self.is_lambda_start() {
                    return self.parse_lambda().map(Expression::Lambda);
                }
                self.advance();
                let inner = self.nested(|p| p.parse_assignment())?;
                self.expect(TokenType::RParen)?;
                Ok(Expression::Parenthesized(Box::new(inner)))
            }
            TokenType::String | TokenType::Template => {
                self.advance();
                let quote = token.quote.unwrap_or('"');
                self.parse_string(&token.value, quote)
            }
            TokenType::Number => {
                self.advance();
                Ok(AST::number(token.value))
            }
            TokenType::LBracket => self.parse_array_literal(),
            TokenType::Identifier => {
                if self.peek(1).is(TokenType::Arrow) {
                    return self.parse_lambda().map(Expression::Lambda);
                }
                match token.value.as_str() {
                    "true" => {
                        self.advance();
                        Ok(AST::boolean(true))
                    }
                    "false" => {
                        self.advance();
                        Ok(AST::boolean(false))
                    }
                    "null" | "undefined" => {
                        self.advance();
                        Ok(AST::string(""))
                    }
                    _ => self.parse_identifier_chain(),
                }
            }
            TokenType::Unknown => {
                self.advance();
                Ok(AST::unknown(token.value))
            }
            TokenType::Eof => Err(ParseError::syntax(format!(
                "Unexpected end of expression: {}",
                self.source.trim()
            ))),
            _ => Err(ParseError::syntax(format!(
                "Unexpected '{}' in expression: {}",
                token.value,
                self.source.trim()
            ))),
        }
    }

    fn parse_string(&mut self, raw: &str, quote: char) -> Result<Expression, ParseError> {
        if !has_interpolation(raw) {
            return Ok(AST::string(normalize_string(raw, quote)));
        }
        let parser = &mut *self.parser;
        let interpolation = parse_interpolation(raw, quote, |inner| parser.parse_expression(inner))?;
        Ok(Expression::Interpolation(interpolation))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect(TokenType::LBracket)?;
        let mut elements = Vec::new();
        while !self.check(TokenType::RBracket) {
            elements.push(self.nested(|p| p.parse_ternary())?);
            if !self.check(TokenType::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenType::RBracket)?;

        let element_type = elements.first().map(|e| e.value_type()).unwrap_or(ValueType::Unknown);
        if element_type != ValueType::Unknown {
            for element in &elements {
                if let Expression::Literal(lit) = element {
                    if lit.value_type != ValueType::Unknown && lit.value_type != element_type {
                        return Err(ParseError::type_mismatch(format!(
                            "Array elements must all be of type {}",
                            element_type
                        )));
                    }
                }
            }
        }

        Ok(Expression::ArrayLiteral(ArrayLiteral { elements, element_type }))
    }

    fn parse_identifier_chain(&mut self) -> Result<Expression, ParseError> {
        let mut segments = vec![self.advance().value];
        while self.check(TokenType::Dot) && self.peek(1).is(TokenType::Identifier) {
            self.advance();
            segments.push(self.advance().value);
        }

        if self.check(TokenType::LParen) {
            let arguments = self.parse_arguments()?;
            return self.build_call(&segments, arguments);
        }

        if segments.len() == 1 {
            let name = &segments[0];
            if self.check(TokenType::LBracket) {
                self.advance();
                let index = self.nested(|p| p.parse_assignment())?;
                self.expect(TokenType::RBracket)?;
                return Ok(Expression::ArrayAccess(Box::new(ArrayAccess { array: self.variable(name), index })));
            }
            return Ok(self.variable(name));
        }

        if segments.len() == 2 && segments[1] == "length" {
            let target = self.variable(&segments[0]);
            return Ok(match target.value_type() {
                ValueType::String => AST::builtin(BuiltinCall::StringLength { value: target }),
                _ => Expression::ArrayLength(Box::new(target)),
            });
        }

        Ok(AST::unknown(segments.join(".")))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(TokenType::LParen)?;
        let mut arguments = Vec::new();
        while !self.check(TokenType::RParen) {
            arguments.push(self.nested(|p| p.parse_assignment())?);
            if !self.check(TokenType::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenType::RParen)?;
        Ok(arguments)
    }

    fn build_call(&mut self, segments: &[String], mut arguments: Vec<Expression>) -> Result<Expression, ParseError> {
        let name = segments.join(".");
        let head = segments[0].as_str();

        // `text.trim()` on a declared string, `items.join(",")` on an array
        if segments.len() == 2 {
            if let Some(t) = self.parser.variable_type(head) {
                let namespace = match t {
                    ValueType::String => Some("string"),
                    t if t.is_array() => Some("array"),
                    _ => None,
                };
                if let Some(namespace) = namespace {
                    let method = format!("{}.{}", namespace, segments[1]);
                    arguments.insert(0, self.variable(head));
                    return builtins::build_builtin(&method, arguments).unwrap_or_else(|| {
                        Err(ParseError::syntax(format!("Unknown method '{}' on {} variable '{}'", segments[1], t, head)))
                    });
                }
            }
        }

        if builtins::is_namespace(head) && self.parser.variable_type(head).is_none() {
            return builtins::build_builtin(&name, arguments)
                .unwrap_or_else(|| Err(ParseError::syntax(format!("Unknown builtin function '{}()'", name))));
        }

        let return_type = self.parser.function_type(&name).unwrap_or(ValueType::Unknown);
        Ok(Expression::Call(FunctionCall { name, arguments, return_type }))
    }

    // =========================================================================
    // LAMBDAS
    // =========================================================================

    /// `(` ident? (`,` ident)* `)` `=>`
    fn is_lambda_start(&self) -> bool {
        let mut i = 1;
        loop {
            match self.peek(i).token_type {
                TokenType::RParen => return self.peek(i + 1).is(TokenType::Arrow),
                TokenType::Identifier | TokenType::Comma => i += 1,
                _ => return false,
            }
        }
    }

    fn parse_lambda(&mut self) -> Result<LambdaExpression, ParseError> {
        let mut parameters = Vec::new();
        if self.check(TokenType::LParen) {
            self.advance();
            while !self.check(TokenType::RParen) {
                parameters.push(self.expect(TokenType::Identifier)?.value);
                if !self.check(TokenType::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenType::RParen)?;
        } else {
            parameters.push(self.expect(TokenType::Identifier)?.value);
        }
        self.expect(TokenType::Arrow)?;

        if !self.check(TokenType::LBrace) {
            return Err(ParseError::syntax("Lambda body must be a block '{ ... }'"));
        }
        let open = self.advance();
        let mut depth = 1usize;
        let close = loop {
            let token = self.advance();
            match token.token_type {
                TokenType::LBrace => depth += 1,
                TokenType::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break token;
                    }
                }
                TokenType::Eof => return Err(ParseError::syntax("Unclosed lambda body")),
                _ => {}
            }
        };

        let source = self.source;
        let body_text = &source[open.end..close.start];
        let body = self.parser.parse_block_text(body_text, &parameters)?;
        Ok(LambdaExpression { parameters, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{InterpolationPart, Statement};

    fn expr(text: &str) -> Expression {
        Parser::new().parse_expression(text).unwrap()
    }

    fn expr_err(text: &str) -> ParseError {
        Parser::new().parse_expression(text).unwrap_err()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            AST::binary(
                AST::number("1"),
                BinaryOperator::Add,
                AST::binary(AST::number("2"), BinaryOperator::Mul, AST::number("3"))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            expr("10 - 4 - 3"),
            AST::binary(
                AST::binary(AST::number("10"), BinaryOperator::Sub, AST::number("4")),
                BinaryOperator::Sub,
                AST::number("3")
            )
        );
    }

    #[test]
    fn test_logical_and_comparison() {
        let e = expr("a > 1 && b === \"x\" || !c");
        match e {
            Expression::Binary(bin) => {
                assert_eq!(bin.operator, BinaryOperator::Or);
                assert!(matches!(bin.right, Expression::Unary(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_ternary_is_right_associative() {
        match expr("a ? 1 : b ? 2 : 3") {
            Expression::Ternary(t) => assert!(matches!(t.when_false, Expression::Ternary(_))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(expr("-5"), AST::number("-5"));
        assert!(matches!(expr("-x"), Expression::Unary(_)));
    }

    #[test]
    fn test_update_expressions() {
        assert_eq!(expr("i++"), Expression::Update(UpdateExpression { name: "i".into(), increment: true, prefix: false }));
        assert_eq!(expr("--i"), Expression::Update(UpdateExpression { name: "i".into(), increment: false, prefix: true }));
    }

    #[test]
    fn test_template_interpolation() {
        match expr("`Hello, ${name}!`") {
            Expression::Interpolation(interp) => assert_eq!(interp.parts.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        match expr("\"sum: ${a + b}\"") {
            Expression::Interpolation(interp) => {
                assert!(matches!(interp.parts[1], InterpolationPart::Expression(Expression::Binary(_))))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_array_literal_type_check() {
        let err = expr_err("[1, \"two\"]");
        assert_eq!(err.message, "Array elements must all be of type number");
        match expr("[\"a\", \"b\"]") {
            Expression::ArrayLiteral(arr) => assert_eq!(arr.element_type, ValueType::String),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_builtin_dispatch() {
        assert_eq!(
            expr("fs.exists(\"/tmp\")"),
            AST::builtin(BuiltinCall::FsExists { path: AST::string("/tmp") })
        );
        assert!(expr_err("fs.copy(\"a\")").message.contains("requires exactly 2 arguments"));
    }

    #[test]
    fn test_method_rewrite_on_declared_string() {
        let mut parser = Parser::new();
        let program = parser.parse("let s: string = \" x \";\nlet t = s.trim();").unwrap();
        match &program.statements[1] {
            Statement::VariableDeclaration(decl) => assert_eq!(
                decl.value,
                AST::builtin(BuiltinCall::StringTrim { value: AST::variable("s", ValueType::String) })
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_length_property() {
        let mut parser = Parser::new();
        let program = parser.parse("let xs = [1, 2];\nlet n = xs.length;").unwrap();
        match &program.statements[1] {
            Statement::VariableDeclaration(decl) => {
                assert!(matches!(decl.value, Expression::ArrayLength(_)));
                assert_eq!(decl.value_type, ValueType::Number);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_generic_call_and_access() {
        assert!(matches!(expr("greet(\"bob\", 2)"), Expression::Call(_)));
        assert!(matches!(expr("items[i + 1]"), Expression::ArrayAccess(_)));
    }

    #[test]
    fn test_lambda_argument() {
        match expr("array.forEach(xs, (item, i) => { console.log(item); })") {
            Expression::Builtin(call) => match *call {
                BuiltinCall::ArrayForEach { callback, .. } => {
                    assert_eq!(callback.parameters, vec!["item".to_string(), "i".to_string()]);
                    assert_eq!(callback.body.len(), 1);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_shapes_degrade() {
        assert_eq!(expr("$HOME"), AST::unknown("$HOME"));
        assert_eq!(expr("process.env"), AST::unknown("process.env"));
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        assert!(Parser::new().parse_expression("a b").is_err());
        assert!(Parser::new().parse_expression("(1 + 2").is_err());
    }

    #[test]
    fn test_assignment_expression_checks_const() {
        let mut parser = Parser::new();
        let err = parser.parse("const k = 1;\nlet y = (k = 2);").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ConstReassignment);
    }
}
