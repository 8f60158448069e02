//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Every stage reports through one of the types defined here:
//!
//! * [`LoxError::Lex`]: a bad character or unterminated string from the scanner.
//! * [`SyntaxError`]: tagged with the [`ParseRule`] that rejected the tokens.
//! * [`ResolutionError`]: tagged with a [`ResolutionErrorKind`].
//! * [`RuntimeError`]: raised while evaluating, carries the offending token.
//!
//! The module **does not** decide what an error means for the program run;
//! that is the job of an [`ErrorReporter`] injected by the caller.  The
//! [`StrictReporter`] used by the CLI prints to stderr and keeps sticky flags
//! the driver maps onto exit codes, while [`CollectingReporter`] just keeps
//! the typed errors around for embedding and tests.

use thiserror::Error;

use log::info;

use crate::token::Token;

/// Grammar production that raised a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    // Expression rules.
    AssignExpr,
    CallExpr,
    ConditionalExpr,
    FunctionExpr,
    GroupingExpr,
    PrimaryExpr,
    PropertyExpr,
    SuperExpr,

    // Statement rules.
    BlockStmt,
    BreakStmt,
    ClassStmt,
    ContinueStmt,
    ExpressionStmt,
    FunctionStmt,
    IfStmt,
    InputStmt,
    PrintStmt,
    ReturnStmt,
    ValStmt,
    VarStmt,
    WhileStmt,

    // Sugar.
    ForStmt,
}

/// Static rule violated during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    VarInitSelfRefer,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,
    ThisOutsideClass,
    ReturnFromInit,
    StaticInit,
    SuperOutsideClass,
    SuperWithoutSuperclass,
}

/// Malformed token sequence.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[line {}] Syntax error at {}: {message}", .token.line, .token.location())]
pub struct SyntaxError {
    pub rule: ParseRule,
    pub token: Token,
    pub message: String,
}

impl SyntaxError {
    pub fn new<S: Into<String>>(rule: ParseRule, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Syntax error: rule={:?}, line={}, msg={}",
            rule, token.line, message
        );

        Self {
            rule,
            token: token.clone(),
            message,
        }
    }
}

/// Static scoping rule violation found by the resolver.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[line {}] Resolution error at {}: {message}", .token.line, .token.location())]
pub struct ResolutionError {
    pub kind: ResolutionErrorKind,
    pub token: Token,
    pub message: String,
}

impl ResolutionError {
    pub fn new<S: Into<String>>(kind: ResolutionErrorKind, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: kind={:?}, line={}, msg={}",
            kind, token.line, message
        );

        Self {
            kind,
            token: token.clone(),
            message,
        }
    }
}

/// Failure while executing a program.  Aborts the remaining top‑level
/// statements of the current run.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}\n[line {}]", .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        Self {
            token: token.clone(),
            message,
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Static‑analysis or resolution failure.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Error sink injected into a [`crate::Lox`] session.
///
/// The sink alone decides whether an error is fatal for the caller; the
/// pipeline only asks [`had_error`](ErrorReporter::had_error) between passes.
pub trait ErrorReporter {
    fn scan_error(&mut self, line: usize, message: &str);

    fn syntax_error(&mut self, error: &SyntaxError);

    fn resolution_error(&mut self, error: &ResolutionError);

    fn runtime_error(&mut self, error: &RuntimeError);

    /// A scan, syntax or resolution error was seen since the last reset.
    fn had_error(&self) -> bool;

    /// A runtime error was seen since the last reset.
    fn had_runtime_error(&self) -> bool;

    fn reset(&mut self);
}

/// Prints every diagnostic to stderr and remembers that it happened.
#[derive(Debug, Default)]
pub struct StrictReporter {
    had_error: bool,
    had_runtime_error: bool,
}

impl StrictReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorReporter for StrictReporter {
    fn scan_error(&mut self, line: usize, message: &str) {
        eprintln!("[line {}] Syntax error: {}", line, message);
        self.had_error = true;
    }

    fn syntax_error(&mut self, error: &SyntaxError) {
        eprintln!("{}", error);
        self.had_error = true;
    }

    fn resolution_error(&mut self, error: &ResolutionError) {
        eprintln!("{}", error);
        self.had_error = true;
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}", error);
        self.had_runtime_error = true;
    }

    fn had_error(&self) -> bool {
        self.had_error
    }

    fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

/// Keeps every reported error, grouped by stage.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub scan: Vec<(usize, String)>,
    pub syntax: Vec<SyntaxError>,
    pub resolution: Vec<ResolutionError>,
    pub runtime: Vec<RuntimeError>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every collected error as one list, in pipeline order.
    pub fn into_errors(self) -> Vec<LoxError> {
        let scan = self
            .scan
            .into_iter()
            .map(|(line, message)| LoxError::lex(line, message));

        scan.chain(self.syntax.into_iter().map(LoxError::from))
            .chain(self.resolution.into_iter().map(LoxError::from))
            .chain(self.runtime.into_iter().map(LoxError::from))
            .collect()
    }
}

impl ErrorReporter for CollectingReporter {
    fn scan_error(&mut self, line: usize, message: &str) {
        self.scan.push((line, message.to_string()));
    }

    fn syntax_error(&mut self, error: &SyntaxError) {
        self.syntax.push(error.clone());
    }

    fn resolution_error(&mut self, error: &ResolutionError) {
        self.resolution.push(error.clone());
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        self.runtime.push(error.clone());
    }

    fn had_error(&self) -> bool {
        !(self.scan.is_empty() && self.syntax.is_empty() && self.resolution.is_empty())
    }

    fn had_runtime_error(&self) -> bool {
        !self.runtime.is_empty()
    }

    fn reset(&mut self) {
        self.scan.clear();
        self.syntax.clear();
        self.resolution.clear();
        self.runtime.clear();
    }
}
