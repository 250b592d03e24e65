// Filter tokens for lexical analysis

use crate::span::SourceSpan;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Number(String),
    String(String),

    // Keywords
    And,
    Or,
    Xor,
    Not,
    Like,
    In,
    Exists,
    True,
    False,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,

    // Special
    Eof,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::And
                | Token::Or
                | Token::Xor
                | Token::Not
                | Token::Like
                | Token::In
                | Token::Exists
                | Token::True
                | Token::False
        )
    }

    /// Convert a string to a keyword token if it matches, ignoring case
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "XOR" => Some(Token::Xor),
            "NOT" => Some(Token::Not),
            "LIKE" => Some(Token::Like),
            "IN" => Some(Token::In),
            "EXISTS" => Some(Token::Exists),
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Xor => f.write_str("XOR"),
            Token::Not => f.write_str("NOT"),
            Token::Like => f.write_str("LIKE"),
            Token::In => f.write_str("IN"),
            Token::Exists => f.write_str("EXISTS"),
            Token::True => f.write_str("TRUE"),
            Token::False => f.write_str("FALSE"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Percent => f.write_str("'%'"),
            Token::Equal => f.write_str("'='"),
            Token::NotEqual => f.write_str("'<>'"),
            Token::Less => f.write_str("'<'"),
            Token::Greater => f.write_str("'>'"),
            Token::LessEqual => f.write_str("'<='"),
            Token::GreaterEqual => f.write_str("'>='"),
            Token::LeftParen => f.write_str("'('"),
            Token::RightParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// A token together with where it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: SourceSpan,
}
