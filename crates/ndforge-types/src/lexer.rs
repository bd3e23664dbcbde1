//! Tokenizer for type text
//!
//! ```
//! use ndforge_types::lexer::{tokenize, Token};
//!
//! let tokens = tokenize("!2 * 3 * long").unwrap();
//! assert_eq!(tokens[0].token, Token::Bang);
//! assert_eq!(tokens[1].token, Token::Number(2));
//! ```

use crate::error::{Result, TypeError};
use std::fmt;

/// Token types in type text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Name(String), // int64, var, N, T, Any, field names
    Number(usize),

    Star,     // *
    Bang,     // !
    Ellipsis, // ...
    Arrow,    // ->
    Comma,    // ,
    Colon,    // :
    Equals,   // =

    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "`{}`", name),
            Token::Number(n) => write!(f, "`{}`", n),
            Token::Star => write!(f, "`*`"),
            Token::Bang => write!(f, "`!`"),
            Token::Ellipsis => write!(f, "`...`"),
            Token::Arrow => write!(f, "`->`"),
            Token::Comma => write!(f, "`,`"),
            Token::Colon => write!(f, "`:`"),
            Token::Equals => write!(f, "`=`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBrace => write!(f, "`{{`"),
            Token::RBrace => write!(f, "`}}`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
        }
    }
}

/// Token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Lexer state
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.consume();
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.consume();
            } else {
                break;
            }
        }
        self.input[start..self.position].to_string()
    }

    fn read_number(&mut self) -> Result<usize> {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.consume();
            } else {
                break;
            }
        }
        self.input[start..self.position]
            .parse()
            .map_err(|_| TypeError::grammar(start, "integer literal out of range"))
    }

    fn single(&mut self, token: Token) -> Token {
        self.consume();
        token
    }

    /// Get next token, `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Spanned>> {
        self.skip_whitespace();

        let position = self.position;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            '*' => self.single(Token::Star),
            '!' => self.single(Token::Bang),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '=' => self.single(Token::Equals),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '.' => {
                if self.input[position..].starts_with("...") {
                    self.position += 3;
                    Token::Ellipsis
                } else {
                    return Err(TypeError::grammar(position, "expected `...`"));
                }
            }
            '-' => {
                self.consume();
                if self.peek() == Some('>') {
                    self.consume();
                    Token::Arrow
                } else {
                    return Err(TypeError::grammar(position, "expected `->`"));
                }
            }
            '0'..='9' => Token::Number(self.read_number()?),
            c if c.is_ascii_alphabetic() || c == '_' => Token::Name(self.read_name()),
            other => {
                return Err(TypeError::grammar(
                    position,
                    format!("unexpected character `{}`", other),
                ))
            }
        };

        Ok(Some(Spanned { token, position }))
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Convenience function to tokenize a string
pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    Lexer::new(input).tokenize()
}
