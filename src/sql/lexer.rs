//! SQL lexer - converts SQL text into tokens

use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_end = matches!(token.kind, TokenKind::End);
            tokens.push(token);
            if is_end {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;

        if self.is_eof() {
            return Ok(Token::new(TokenKind::End, line, column));
        }

        let ch = self.current_char();
        let kind = match ch {
            '\'' => self.read_string(line, column)?,
            '0'..='9' => self.read_number(line, column)?,
            'a'..='z' | 'A'..='Z' | '_' => self.read_word(),
            '*' => {
                self.advance();
                TokenKind::Star
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '=' => {
                self.advance();
                TokenKind::Eq
            }
            '!' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::Ne
                } else {
                    return Err(Error::Lex {
                        line,
                        column,
                        text: "!".to_string(),
                    });
                }
            }
            '<' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::Le
                } else if self.current_char() == '>' {
                    self.advance();
                    TokenKind::Ne
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            other => {
                return Err(Error::Lex {
                    line,
                    column,
                    text: other.to_string(),
                });
            }
        };

        Ok(Token::new(kind, line, column))
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() {
            match self.current_char() {
                ' ' | '\t' | '\r' | '\n' => self.advance(),
                _ => break,
            }
        }
    }

    /// Single-quoted string. No escape sequences: the first closing quote
    /// ends the literal. A newline before the closing quote is an
    /// unterminated string.
    fn read_string(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        self.advance(); // opening quote
        let mut value = String::new();

        while !self.is_eof() && self.current_char() != '\'' && self.current_char() != '\n' {
            value.push(self.current_char());
            self.advance();
        }

        if self.is_eof() || self.current_char() == '\n' {
            return Err(Error::Lex {
                line,
                column,
                text: format!("'{}", value),
            });
        }

        self.advance(); // closing quote
        Ok(TokenKind::Str(value))
    }

    /// Unsigned integer or decimal literal. A dot is part of the number
    /// only when a digit follows, so `users.id` still lexes as
    /// identifier-dot-identifier.
    fn read_number(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let mut text = String::new();

        while !self.is_eof() && self.current_char().is_ascii_digit() {
            text.push(self.current_char());
            self.advance();
        }

        let mut is_decimal = false;
        if self.current_char() == '.'
            && self.position + 1 < self.input.len()
            && self.input[self.position + 1].is_ascii_digit()
        {
            is_decimal = true;
            text.push('.');
            self.advance();
            while !self.is_eof() && self.current_char().is_ascii_digit() {
                text.push(self.current_char());
                self.advance();
            }
        }

        if is_decimal {
            text.parse::<f64>()
                .map(TokenKind::Decimal)
                .map_err(|_| Error::Lex { line, column, text })
        } else {
            text.parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|_| Error::Lex { line, column, text })
        }
    }

    fn read_word(&mut self) -> TokenKind {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::from_keyword(&value).unwrap_or(TokenKind::Ident(value))
    }
}
