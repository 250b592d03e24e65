// Filter lexer - tokenizes filter expressions

use super::error::{ParseError, ParseResult};
use super::token::{SpannedToken, Token};
use crate::span::SourceSpan;
use std::sync::Arc;

pub struct Lexer {
    input: Arc<str>,
    /// Byte offset of `current_char`
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: Arc<str>) -> Self {
        let current_char = input.chars().next();
        Lexer {
            input,
            position: 0,
            current_char,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ParseResult<SpannedToken> {
        self.skip_whitespace();

        let start = self.position;
        let ch = match self.current_char {
            Some(ch) => ch,
            None => return Ok(self.spanned(Token::Eof, start)),
        };

        let token = match ch {
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                Token::Minus
            }
            '*' => {
                self.advance();
                Token::Star
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '=' => {
                self.advance();
                Token::Equal
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessEqual
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    return Err(self.error("unexpected character '!'", start));
                }
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '\'' | '"' => self.read_string(ch)?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c => {
                self.advance();
                return Err(self.error(format!("unexpected character '{}'", c), start));
            }
        };

        Ok(self.spanned(token, start))
    }

    fn spanned(&self, token: Token, start: usize) -> SpannedToken {
        SpannedToken {
            token,
            span: SourceSpan::new(self.input.clone(), start, self.position),
        }
    }

    fn error(&self, message: impl Into<String>, start: usize) -> ParseError {
        ParseError::new(
            message,
            SourceSpan::new(self.input.clone(), start, self.position),
        )
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(ch) = self.current_char {
            self.position += ch.len_utf8();
        }
        self.current_char = self.input[self.position..].chars().next();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        let ch = self.current_char?;
        self.input[self.position + ch.len_utf8()..].chars().next()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Check if it's a keyword
        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read a string literal delimited by `quote`.
    ///
    /// The quote is escaped by doubling it or with a backslash. Other
    /// backslashes are kept so LIKE escapes reach the pattern untouched,
    /// and `\\` stays a pair so it can sit right before the closing quote.
    fn read_string(&mut self, quote: char) -> ParseResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        loop {
            match self.current_char {
                Some(ch) if ch == quote => {
                    if self.peek() == Some(quote) {
                        string.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance(); // Skip closing quote
                        return Ok(Token::String(string));
                    }
                }
                Some('\\') if self.peek() == Some('\\') => {
                    string.push_str("\\\\");
                    self.advance();
                    self.advance();
                }
                Some('\\') if self.peek() == Some(quote) => {
                    string.push(quote);
                    self.advance();
                    self.advance();
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => return Err(self.error("unterminated string literal", start)),
            }
        }
    }

    /// Read an unsigned integer
    fn read_number(&mut self) -> Token {
        let mut number = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(number)
    }

    /// Tokenize the entire input, ending with `Eof`
    pub fn tokenize(&mut self) -> ParseResult<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(Arc::from(input))
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("type = 'x' AND EXISTS subject"),
            vec![
                Token::Identifier("type".to_string()),
                Token::Equal,
                Token::String("x".to_string()),
                Token::And,
                Token::Exists,
                Token::Identifier("subject".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("+ - * / % = < > <= >= <> != ( ) ,"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Equal,
                Token::Less,
                Token::Greater,
                Token::LessEqual,
                Token::GreaterEqual,
                Token::NotEqual,
                Token::NotEqual,
                Token::LeftParen,
                Token::RightParen,
                Token::Comma,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(
            tokens("and Or xOR not like In exists TRUE false"),
            vec![
                Token::And,
                Token::Or,
                Token::Xor,
                Token::Not,
                Token::Like,
                Token::In,
                Token::Exists,
                Token::True,
                Token::False,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens(r#"'hello world' 'it''s' "say ""hi""" 'a\'b' "c\"d" 'x\%y'"#),
            vec![
                Token::String("hello world".to_string()),
                Token::String("it's".to_string()),
                Token::String("say \"hi\"".to_string()),
                Token::String("a'b".to_string()),
                Token::String("c\"d".to_string()),
                Token::String("x\\%y".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escaped_backslash() {
        assert_eq!(
            tokens(r"'c:\\' 'a\\\'b' 'x\\%'"),
            vec![
                Token::String(r"c:\\".to_string()),
                Token::String(r"a\\'b".to_string()),
                Token::String(r"x\\%".to_string()),
                Token::Eof,
            ]
        );

        let err = Lexer::new(Arc::from(r"'c:\'")).tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("123 0 2147483648"),
            vec![
                Token::Number("123".to_string()),
                Token::Number("0".to_string()),
                Token::Number("2147483648".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = Lexer::new(Arc::from("é = 'ü'")).tokenize().unwrap();
        assert_eq!(tokens[0].span.start(), 0);
        assert_eq!(tokens[0].span.end(), 2);
        assert_eq!(tokens[1].span.start(), 3);
        assert_eq!(tokens[2].span.text(), "'ü'");
        assert_eq!(tokens[3].token, Token::Eof);
        assert_eq!(tokens[3].span.start(), 9);
    }

    #[test]
    fn test_lexer_errors() {
        let err = Lexer::new(Arc::from("type = 'abc")).tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.span.text(), "'abc");

        let err = Lexer::new(Arc::from("a # b")).tokenize().unwrap_err();
        assert_eq!(err.span.start(), 2);

        assert!(Lexer::new(Arc::from("!x")).tokenize().is_err());
    }
}
