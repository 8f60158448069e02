//! Lexer for Lox source text.
//!
//! [`Scanner`] walks the bytes of a `&str` and yields `Result<Token>` items:
//! one per token, one per lexical error, and a single trailing `EOF` token.
//! Scanning carries on past a bad character so one pass reports them all.
//!
//! Recognised input:
//!
//! - punctuation `( ) { } , . - + ; * ? :` and `/`
//! - `!` `=` `<` `>` alone or followed by `=`
//! - double-quoted strings, which may span lines
//! - numbers with an optional fractional part
//! - identifiers, with reserved words looked up in a perfect-hash table
//! - `//` line comments and `/* */` block comments
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static RESERVED: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::AND,
    "break" => TokenType::BREAK,
    "class" => TokenType::CLASS,
    "continue" => TokenType::CONTINUE,
    "else" => TokenType::ELSE,
    "false" => TokenType::FALSE,
    "for" => TokenType::FOR,
    "fun" => TokenType::FUN,
    "if" => TokenType::IF,
    "input" => TokenType::INPUT,
    "nil" => TokenType::NIL,
    "or" => TokenType::OR,
    "print" => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super" => TokenType::SUPER,
    "this" => TokenType::THIS,
    "true" => TokenType::TRUE,
    "val" => TokenType::VAL,
    "var" => TokenType::VAR,
    "while" => TokenType::WHILE,
};

/// Streaming lexer over borrowed source.  Emitted tokens own their lexeme.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next unread byte.
    pos: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }

    /// Byte `offset` places ahead of the cursor, `0` past the end.
    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == expected && self.pos < self.bytes.len() {
            self.pos += 1;
            return true;
        }
        false
    }

    /// `with_eq` when the next byte is `=`, otherwise `alone`.
    fn either(&mut self, with_eq: TokenType, alone: TokenType) -> TokenType {
        if self.eat(b'=') {
            with_eq
        } else {
            alone
        }
    }

    /// Advance `n` bytes, counting the newlines passed over.
    fn skip(&mut self, n: usize) {
        let skipped = &self.rest()[..n];
        self.line += memchr_iter(b'\n', skipped).count();
        self.pos += n;
    }

    /// Skip whitespace and comments up to the next significant byte.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (b' ' | b'\r' | b'\t', _) => self.pos += 1,

                (b'\n', _) => {
                    self.pos += 1;
                    self.line += 1;
                }

                (b'/', b'/') => {
                    let len = memchr(b'\n', self.rest()).unwrap_or(self.rest().len());
                    self.pos += len;
                }

                (b'/', b'*') => {
                    let opened_on = self.line;
                    self.pos += 2;

                    match memmem::find(self.rest(), b"*/") {
                        Some(len) => self.skip(len + 2),
                        None => {
                            self.skip(self.rest().len());
                            return Err(LoxError::lex(
                                opened_on,
                                "Unterminated block comment.",
                            ));
                        }
                    }
                }

                _ => return Ok(()),
            }
        }
    }

    /// Scan the token starting at `self.pos`.  The caller guarantees input
    /// remains.
    fn lex(&mut self) -> Result<Token> {
        self.start = self.pos;

        let Some(b) = self.bump() else {
            return Ok(Token::eof(self.line));
        };

        let kind = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,
            b'?' => TokenType::QUESTION,
            b':' => TokenType::COLON,

            b'!' => self.either(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.word(),

            _ => {
                // Report the whole character, not one byte of it.
                let c = self.source[self.start..].chars().next().unwrap_or('\u{fffd}');
                self.pos = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        let token = Token::new(kind, &self.source[self.start..self.pos], self.line);
        debug!("Scanned {}", token);

        Ok(token)
    }

    fn string(&mut self) -> Result<TokenType> {
        let Some(len) = memchr(b'"', self.rest()) else {
            self.skip(self.rest().len());
            return Err(LoxError::lex(self.line, "Unterminated string."));
        };

        self.skip(len);
        self.pos += 1;

        let text = &self.source[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(text.to_string()))
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }

        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }

        // Only ASCII digits and one dot were consumed.
        let n = self.source[self.start..self.pos].parse::<f64>().unwrap_or(0.0);
        TokenType::NUMBER(n)
    }

    fn word(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        RESERVED
            .get(&self.source[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Err(e) = self.skip_trivia() {
            return Some(Err(e));
        }

        if self.pos >= self.bytes.len() {
            self.finished = true;
            return Some(Ok(Token::eof(self.line)));
        }

        Some(self.lex())
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan `source` to completion, splitting the tokens from the lexical errors.
///
/// The returned token vector always ends with `EOF`.
pub fn scan(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    let (tokens, errors): (Vec<_>, Vec<_>) = Scanner::new(source).partition(|r| r.is_ok());

    let tokens: Vec<Token> = tokens.into_iter().flatten().collect();
    let errors: Vec<LoxError> = errors.into_iter().filter_map(|r| r.err()).collect();

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}
