// Filter parser - converts tokens to expression trees

use super::error::{ParseError, ParseResult};
use super::lexer::Lexer;
use super::token::{SpannedToken, Token};
use crate::expression::{
    ArithmeticOperator, ComparisonOperator, Expression, ExpressionKind, Identifier,
    LogicalOperator,
};
use crate::runtime::{builtin_functions, select_overload, FunctionRegistry};
use crate::span::SourceSpan;
use crate::value::Value;
use std::sync::Arc;

pub struct Parser<'r> {
    tokens: Vec<SpannedToken>,
    position: usize,
    functions: &'r FunctionRegistry,
}

impl Parser<'static> {
    /// Parser that resolves calls against the built-in functions
    pub fn new(source: &str) -> ParseResult<Self> {
        Parser::with_functions(source, builtin_functions())
    }
}

impl<'r> Parser<'r> {
    /// Parser that resolves calls against `functions`
    pub fn with_functions(source: &str, functions: &'r FunctionRegistry) -> ParseResult<Self> {
        let mut lexer = Lexer::new(Arc::from(source));
        let tokens = lexer.tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            functions,
        })
    }

    /// Parse a complete filter expression
    pub fn parse(&mut self) -> ParseResult<Expression> {
        let expr = self.parse_expression()?;
        if !self.match_token(&Token::Eof) {
            return Err(self.unexpected("end of input"));
        }
        Ok(expr)
    }

    /// Parse expression
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    /// Parse OR / XOR expression
    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and()?;

        loop {
            let op = match self.current_token() {
                Token::Or => LogicalOperator::Or,
                Token::Xor => LogicalOperator::Xor,
                _ => break,
            };
            self.advance();
            let right = self.parse_and()?;
            left = Expression::logical(op, left, right);
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::and(left, right);
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> ParseResult<Expression> {
        if self.match_token(&Token::Not) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_not()?;
            let span = start.merge(&operand.span);
            Ok(Expression::not_expr(operand).with_span(span))
        } else {
            self.parse_comparison()
        }
    }

    /// Parse comparison, LIKE and IN expressions
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_addition()?;

        // NOT LIKE / NOT IN
        let negated = self.match_token(&Token::Not)
            && matches!(self.peek_token(), Token::Like | Token::In);
        if negated {
            self.advance();
        }

        if self.match_token(&Token::Like) {
            self.advance();
            let expr = self.parse_like(left)?;
            return Ok(negate_if(expr, negated));
        }

        if self.match_token(&Token::In) {
            self.advance();
            let expr = self.parse_in(left)?;
            return Ok(negate_if(expr, negated));
        }

        // Standard comparison operators
        let op = match self.current_token() {
            Token::Equal => ComparisonOperator::Eq,
            Token::NotEqual => ComparisonOperator::Ne,
            Token::Less => ComparisonOperator::Lt,
            Token::Greater => ComparisonOperator::Gt,
            Token::LessEqual => ComparisonOperator::Le,
            Token::GreaterEqual => ComparisonOperator::Ge,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_addition()?;
        Ok(Expression::comparison(op, left, right))
    }

    /// Parse the pattern after LIKE. It must be a string literal.
    fn parse_like(&mut self, value: Expression) -> ParseResult<Expression> {
        let pattern_span = self.current_span();
        let pattern = match self.current_token() {
            Token::String(pattern) => pattern,
            _ => return Err(self.unexpected("string pattern after LIKE")),
        };
        self.advance();

        let span = value.span.merge(&pattern_span);
        let expr = Expression::like(value, &pattern)
            .map_err(|err| ParseError::new(err.to_string(), pattern_span))?;
        Ok(expr.with_span(span))
    }

    /// Parse the parenthesized set after IN
    fn parse_in(&mut self, value: Expression) -> ParseResult<Expression> {
        self.expect_token(Token::LeftParen)?;
        let set = self.parse_expression_list()?;
        let close = self.expect_token(Token::RightParen)?;

        let span = value.span.merge(&close.span);
        Ok(Expression::in_list(value, set).with_span(span))
    }

    /// Parse addition/subtraction expression
    fn parse_addition(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplication()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => ArithmeticOperator::Add,
                Token::Minus => ArithmeticOperator::Sub,
                _ => break,
            };
            self.advance();

            let right = self.parse_multiplication()?;
            left = Expression::arithmetic(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplication/division expression
    fn parse_multiplication(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => ArithmeticOperator::Mul,
                Token::Slash => ArithmeticOperator::Div,
                Token::Percent => ArithmeticOperator::Mod,
                _ => break,
            };
            self.advance();

            let right = self.parse_unary()?;
            left = Expression::arithmetic(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary minus. A minus directly in front of a number is folded
    /// into the literal so `-2147483648` is representable.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if !self.match_token(&Token::Minus) {
            return self.parse_primary();
        }

        let start = self.current_span();
        self.advance();

        if let Token::Number(digits) = self.current_token() {
            let span = start.merge(&self.current_span());
            self.advance();
            let value = parse_integer(&format!("-{}", digits), &span)?;
            return Ok(Expression::literal(value).with_span(span));
        }

        let operand = self.parse_unary()?;
        let span = start.merge(&operand.span);
        Ok(Expression::negate(operand).with_span(span))
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let span = self.current_span();
        match self.current_token() {
            Token::Number(digits) => {
                self.advance();
                let value = parse_integer(&digits, &span)?;
                Ok(Expression::literal(value).with_span(span))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::literal(s).with_span(span))
            }
            Token::True => {
                self.advance();
                Ok(Expression::literal(true).with_span(span))
            }
            Token::False => {
                self.advance();
                Ok(Expression::literal(false).with_span(span))
            }
            Token::Exists => {
                self.advance();
                let identifier = self.expect_identifier()?;
                let span = span.merge(&identifier.span);
                Ok(Expression::exists(identifier).with_span(span))
            }
            Token::Identifier(name) => {
                self.advance();

                // Check for function call
                if self.match_token(&Token::LeftParen) {
                    self.parse_call(name, span)
                } else {
                    Ok(Expression::new(ExpressionKind::Identifier(name), span))
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                let close = self.expect_token(Token::RightParen)?;
                Ok(expr.with_span(span.merge(&close.span)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parse the argument list of a call and check it against the registry
    fn parse_call(&mut self, name: String, name_span: SourceSpan) -> ParseResult<Expression> {
        self.expect_token(Token::LeftParen)?;

        let args = if self.match_token(&Token::RightParen) {
            vec![]
        } else {
            self.parse_expression_list()?
        };
        let close = self.expect_token(Token::RightParen)?;
        let span = name_span.merge(&close.span);

        let overloads = self
            .functions
            .lookup(&name)
            .ok_or_else(|| ParseError::new(format!("unknown function {}", name), span.clone()))?;
        if select_overload(overloads, args.len()).is_none() {
            return Err(ParseError::new(
                format!(
                    "function {} does not accept {} argument(s)",
                    name.to_ascii_uppercase(),
                    args.len()
                ),
                span,
            ));
        }

        Ok(Expression::call(name.to_ascii_uppercase(), args).with_span(span))
    }

    /// Parse a comma separated list of expressions
    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut expressions = vec![];

        loop {
            expressions.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(expressions)
    }

    // Helper methods

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn current_span(&self) -> SourceSpan {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.span.clone())
            .unwrap_or_default()
    }

    /// Token after the current one
    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> ParseResult<SpannedToken> {
        if self.current_token() == token {
            let spanned = self.tokens[self.position].clone();
            self.advance();
            Ok(spanned)
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    /// Expect an identifier
    fn expect_identifier(&mut self) -> ParseResult<Identifier> {
        let span = self.current_span();
        match self.current_token() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Identifier::with_span(name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {}, found {}", expected, self.current_token()),
            self.current_span(),
        )
    }
}

fn parse_integer(digits: &str, span: &SourceSpan) -> ParseResult<Value> {
    digits.parse::<i32>().map(Value::Integer).map_err(|_| {
        ParseError::new(
            format!("integer literal {} is out of range", digits),
            span.clone(),
        )
    })
}

fn negate_if(expr: Expression, negated: bool) -> Expression {
    if negated {
        let span = expr.span.clone();
        Expression::not_expr(expr).with_span(span)
    } else {
        expr
    }
}
