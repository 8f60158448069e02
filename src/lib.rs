//! **rox**: a tree-walking interpreter for an extended Lox dialect.
//!
//! The pipeline is scanner → parser → resolver → interpreter.  Each stage
//! hands its errors back as values; [`Lox`] forwards them to the caller's
//! [`ErrorReporter`](error::ErrorReporter) and refuses to execute anything
//! that failed to scan, parse or resolve.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod natives;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::{BufRead, Write};

use log::{debug, info};

use error::{ErrorReporter, LoxError};
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use token::{Token, TokenType};

/// One interpreter session.  Globals persist across [`run`](Lox::run),
/// [`run_line`](Lox::run_line) and [`evaluate`](Lox::evaluate) calls.
pub struct Lox<'io> {
    interpreter: Interpreter<'io>,
}

impl Lox<'static> {
    pub fn new() -> Self {
        Lox {
            interpreter: Interpreter::new(),
        }
    }
}

impl Default for Lox<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'io> Lox<'io> {
    pub fn with_io<W, R>(output: W, input: R) -> Self
    where
        W: Write + 'io,
        R: BufRead + 'io,
    {
        Lox {
            interpreter: Interpreter::with_io(output, input),
        }
    }

    /// Run `source` as a program.
    pub fn run(&mut self, source: &str, reporter: &mut dyn ErrorReporter) {
        if let Some(tokens) = scan(source, reporter) {
            self.run_tokens(&tokens, reporter);
        }
    }

    /// Evaluate `source` as a single expression and print its value.
    pub fn evaluate(&mut self, source: &str, reporter: &mut dyn ErrorReporter) {
        if let Some(tokens) = scan(source, reporter) {
            self.evaluate_tokens(&tokens, reporter);
        }
    }

    /// Run one line typed at a prompt.  Everything up to the last `;` or `}`
    /// runs as statements; a trailing expression after it is evaluated and
    /// its value printed.
    pub fn run_line(&mut self, line: &str, reporter: &mut dyn ErrorReporter) {
        let Some(tokens) = scan(line, reporter) else {
            return;
        };

        let boundary = tokens.iter().rposition(|t| {
            matches!(t.token_type, TokenType::SEMICOLON | TokenType::RIGHT_BRACE)
        });

        // Only EOF after the boundary: the line is all statements.
        let tail_start = boundary.map_or(0, |b| b + 1);
        if tail_start + 1 >= tokens.len() {
            self.run_tokens(&tokens, reporter);
            return;
        }

        if let Some(b) = boundary {
            let mut statements: Vec<Token> = tokens[..=b].to_vec();
            statements.push(Token::eof(tokens[b].line));

            if !self.run_tokens(&statements, reporter) {
                return;
            }
        }

        debug!("Evaluating trailing expression of line");
        self.evaluate_tokens(&tokens[tail_start..], reporter);
    }

    /// Parse, resolve and execute.  `false` when any stage failed.
    fn run_tokens(&mut self, tokens: &[Token], reporter: &mut dyn ErrorReporter) -> bool {
        let (statements, syntax_errors) = Parser::new(tokens).parse();
        if !syntax_errors.is_empty() {
            for e in &syntax_errors {
                reporter.syntax_error(e);
            }
            return false;
        }

        let (locals, resolution_errors) = Resolver::new().resolve(&statements);
        if !resolution_errors.is_empty() {
            for e in &resolution_errors {
                reporter.resolution_error(e);
            }
            return false;
        }

        self.interpreter.resolve(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => true,
            Err(e) => {
                reporter.runtime_error(&e);
                false
            }
        }
    }

    fn evaluate_tokens(&mut self, tokens: &[Token], reporter: &mut dyn ErrorReporter) -> bool {
        let (expr, syntax_errors) = Parser::new(tokens).parse_expression();
        let expr = match expr {
            Some(expr) if syntax_errors.is_empty() => expr,
            _ => {
                for e in &syntax_errors {
                    reporter.syntax_error(e);
                }
                return false;
            }
        };

        let (locals, resolution_errors) = Resolver::new().resolve_expression(&expr);
        if !resolution_errors.is_empty() {
            for e in &resolution_errors {
                reporter.resolution_error(e);
            }
            return false;
        }

        self.interpreter.resolve(locals);

        match self.interpreter.interpret_expression(&expr) {
            Ok(value) => {
                info!("Expression evaluated to {}", value);
                true
            }
            Err(e) => {
                reporter.runtime_error(&e);
                false
            }
        }
    }
}

/// Tokens of `source`, or `None` after reporting every lexical error.
fn scan(source: &str, reporter: &mut dyn ErrorReporter) -> Option<Vec<Token>> {
    let (tokens, errors) = scanner::scan(source);

    if errors.is_empty() {
        return Some(tokens);
    }

    for e in &errors {
        match e {
            LoxError::Lex { message, line } => reporter.scan_error(*line, message),
            other => reporter.scan_error(0, &other.to_string()),
        }
    }

    None
}
