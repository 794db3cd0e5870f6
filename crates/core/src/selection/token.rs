//! Lexer for the selection language.

use crate::selection::error::{SelectionError, Span};

/// A token with its byte span in the input string.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Token types for the selection language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Boolean operators
    And,
    Or,
    Not,
    // Literals
    Ident(String),
    Str(String),
    Number(f64),
    /// `#N`, an explicit reference to the N-th atom of a match
    Variable(usize),
    // Punctuation
    LParen,
    RParen,
    Comma,
    // Comparison operators
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Hat,
    // End
    Eof,
}

impl Token {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge
        )
    }

    /// Whether this token can be the last token of an operand, in which case
    /// a following `+` or `-` is a binary operator rather than a sign.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Ident(_) | Token::Str(_) | Token::Number(_) | Token::Variable(_) | Token::RParen
        )
    }
}

/// Lexer that tokenizes a selection expression string.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn err(&self, msg: impl Into<String>, start: usize) -> SelectionError {
        SelectionError::lexer(msg, (start, self.pos), self.input)
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, SelectionError> {
        let mut tokens: Vec<SpannedToken> = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(ch) = self.peek(0) else {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: (start, start),
                });
                break;
            };
            let after_operand = tokens.last().is_some_and(|t| t.token.ends_operand());
            let token = match ch {
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b',' => self.single(Token::Comma),
                b'*' => self.single(Token::Star),
                b'/' => self.single(Token::Slash),
                b'^' => self.single(Token::Hat),
                b'>' => self.with_optional_eq(Token::Gt, Token::Ge),
                b'<' => self.with_optional_eq(Token::Lt, Token::Le),
                b'=' => {
                    self.pos += 1;
                    if self.peek(0) == Some(b'=') {
                        self.pos += 1;
                        Token::Eq
                    } else {
                        return Err(self.err("Expected '==' operator", start));
                    }
                }
                b'!' => {
                    self.pos += 1;
                    if self.peek(0) == Some(b'=') {
                        self.pos += 1;
                        Token::Ne
                    } else {
                        return Err(self.err("Expected '!=' operator", start));
                    }
                }
                b'+' | b'-' if !after_operand && self.number_follows(1) => self.lex_number()?,
                b'+' => self.single(Token::Plus),
                b'-' => self.single(Token::Minus),
                b'0'..=b'9' => self.lex_number()?,
                b'.' if self.number_follows(0) => self.lex_number()?,
                b'"' => self.lex_string()?,
                b'#' => self.lex_variable()?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),
                _ => {
                    let c = self.input[start..].chars().next().unwrap_or('?');
                    self.pos += c.len_utf8();
                    return Err(self.err(format!("Unexpected character '{}'", c), start));
                }
            };
            tokens.push(SpannedToken {
                token,
                span: (start, self.pos),
            });
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn with_optional_eq(&mut self, bare: Token, with_eq: Token) -> Token {
        self.pos += 1;
        if self.peek(0) == Some(b'=') {
            self.pos += 1;
            with_eq
        } else {
            bare
        }
    }

    /// Does a number start at `pos + offset` (a digit, or a dot then a digit)?
    fn number_follows(&self, offset: usize) -> bool {
        match self.peek(offset) {
            Some(b) if b.is_ascii_digit() => true,
            Some(b'.') => self.peek(offset + 1).is_some_and(|b| b.is_ascii_digit()),
            _ => false,
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn lex_number(&mut self) -> Result<Token, SelectionError> {
        let start = self.pos;
        if matches!(self.peek(0), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        self.eat_digits();
        if self.peek(0) == Some(b'.') {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(0), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.peek(0), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                return Err(self.err(
                    format!("Missing exponent in number '{}'", &self.input[start..self.pos]),
                    start,
                ));
            }
        }
        if self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            while self
                .peek(0)
                .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
            {
                self.pos += 1;
            }
            return Err(self.err(
                format!("Invalid number '{}'", &self.input[start..self.pos]),
                start,
            ));
        }
        let s = &self.input[start..self.pos];
        let val: f64 = s
            .parse()
            .map_err(|_| self.err(format!("Invalid number '{}'", s), start))?;
        if !val.is_finite() {
            return Err(self.err(format!("Number '{}' is too large", s), start));
        }
        Ok(Token::Number(val))
    }

    fn lex_string(&mut self) -> Result<Token, SelectionError> {
        let start = self.pos;
        self.pos += 1;
        match self.input[self.pos..].find('"') {
            Some(len) => {
                let value = self.input[self.pos..self.pos + len].to_string();
                self.pos += len + 1;
                Ok(Token::Str(value))
            }
            None => {
                self.pos = self.bytes.len();
                Err(self.err("Unterminated string literal", start))
            }
        }
    }

    fn lex_variable(&mut self) -> Result<Token, SelectionError> {
        let start = self.pos;
        self.pos += 1;
        if self.eat_digits() == 0 {
            return Err(self.err("Expected a number after '#'", start));
        }
        let s = &self.input[start + 1..self.pos];
        let val: usize = s
            .parse()
            .map_err(|_| self.err(format!("Invalid variable '#{}'", s), start))?;
        Ok(Token::Variable(val))
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            word => Token::Ident(word.to_string()),
        }
    }
}

/// Tokenize `input`, always ending with [`Token::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, SelectionError> {
    Lexer::new(input).tokenize()
}
