// SQL module - filter expression lexing and parsing

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{ParseError, ParseResult};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{SpannedToken, Token};

use crate::expression::Expression;

/// Parse a filter expression, resolving calls against the built-in functions
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    Parser::new(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        let expr = parse_expression("type = 'order.created' AND amount > 10").unwrap();
        assert_eq!(expr.referenced_attributes(), vec!["type", "amount"]);
        assert_eq!(expr.span.text(), "type = 'order.created' AND amount > 10");

        assert!(parse_expression("type = ").is_err());
    }
}
