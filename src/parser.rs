/*!
Recursive-descent parser for Lox.

[`Parser::parse`] reads a token slice once, front to back, and returns every
statement it could build together with every [`SyntaxError`] it met.  After an
error the parser discards tokens up to the next statement boundary and carries
on, so one pass reports independent mistakes in separate statements.

Lifecycle milestones log at `info`, descent into grammar branches at `debug`.

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | valDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" member* "}" ;
member         → "class" function
               | "get" IDENT ( "(" ")" )? block
               | "set" IDENT "(" IDENT ")" block
               | function ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
valDecl        → "val" IDENT "=" expression ";" ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt | returnStmt
               | whileStmt | inputStmt | breakStmt | continueStmt
               | ";" | block ;
expression     → comma ;
comma          → assignment ( "," assignment )* ;
assignment     → ( call "." )? IDENT "=" assignment | conditional ;
conditional    → logic_or ( "?" expression ":" conditional )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → assignment ( "," assignment )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT
               | "fun" "(" parameters? ")" block ;
```

`for` is sugar: it is rewritten into a block holding the initializer and a
`while` that carries the increment.
*/

use std::rc::Rc;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::{ParseRule, SyntaxError};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Upper bound on parameters and call arguments.
pub const MAX_ARITY: usize = 255;

type PResult<T> = std::result::Result<T, SyntaxError>;

/// Read past the end of the slice, so a stream missing its `EOF` still stops.
static END: Token = Token {
    token_type: TokenType::EOF,
    lexeme: String::new(),
    line: 0,
};

/// What a function body is being parsed as; only changes diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Function,
    Method,
}

impl FunctionKind {
    fn as_str(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
        }
    }
}

/// Top‑level parser over an immutable slice of tokens.
///
/// Errors are collected rather than returned: the parser resynchronises at
/// the next statement boundary so one pass can report several of them.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.  `tokens` normally ends with an `EOF` token;
    /// an empty or unterminated slice parses as if one followed it.
    pub fn new(tokens: &'a [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list together with
    /// every syntax error found.  Statements that failed to parse are dropped.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<SyntaxError>) {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statement(s), {} syntax error(s)",
            statements.len(),
            self.errors.len()
        );

        (statements, self.errors)
    }

    /// Parse a single expression spanning the whole token stream.
    pub fn parse_expression(mut self) -> (Option<Expr>, Vec<SyntaxError>) {
        info!("Beginning expression parse");

        let expr = match self.expression() {
            Ok(expr) => {
                if !self.is_at_end() {
                    let err = self.error(
                        ParseRule::PrimaryExpr,
                        self.peek(),
                        "Expect end of expression.",
                    );
                    self.errors.push(err);
                    None
                } else {
                    Some(expr)
                }
            }
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        };

        (expr, self.errors)
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parses one declaration; on error records it, resynchronises and
    /// yields `None`.
    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FUN) && self.check_next(TokenType::LEFT_PAREN) {
            // `fun (` starts an anonymous function used as a statement.
            self.statement()
        } else if self.matches(TokenType::FUN) {
            self.function(FunctionKind::Function).map(Stmt::Function)
        } else if self.matches(TokenType::VAL) {
            self.val_declaration()
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self
            .consume(ParseRule::ClassStmt, TokenType::IDENTIFIER, "Expect class name.")?
            .clone();

        let superclass = if self.matches(TokenType::LESS) {
            let super_name = self.consume(
                ParseRule::ClassStmt,
                TokenType::IDENTIFIER,
                "Expect superclass name.",
            )?;
            Some(Expr::variable(super_name.clone()))
        } else {
            None
        };

        self.consume(
            ParseRule::ClassStmt,
            TokenType::LEFT_BRACE,
            "Expect '{' before class body.",
        )?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut class_methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut getters: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut setters: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::CLASS) {
                class_methods.push(self.function(FunctionKind::Method)?);
            } else if self.check_marker("get") {
                self.advance();
                getters.push(self.getter()?);
            } else if self.check_marker("set") {
                self.advance();
                setters.push(self.setter()?);
            } else {
                methods.push(self.function(FunctionKind::Method)?);
            }
        }

        self.consume(
            ParseRule::ClassStmt,
            TokenType::RIGHT_BRACE,
            "Expect '}' after class body.",
        )?;

        debug!(
            "Parsed class '{}' ({} methods, {} class methods, {} getters, {} setters)",
            name.lexeme,
            methods.len(),
            class_methods.len(),
            getters.len(),
            setters.len()
        );

        Ok(Stmt::Class(Rc::new(ClassDecl {
            name,
            superclass,
            methods,
            class_methods,
            getters,
            setters,
        })))
    }

    /// `get IDENT ( "(" ")" )? block`, called with the marker already consumed.
    fn getter(&mut self) -> PResult<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(ParseRule::ClassStmt, TokenType::IDENTIFIER, "Expect getter name.")?
            .clone();

        if self.matches(TokenType::LEFT_PAREN) {
            self.consume(
                ParseRule::ClassStmt,
                TokenType::RIGHT_PAREN,
                "Getters take no parameters.",
            )?;
        }

        self.consume(
            ParseRule::ClassStmt,
            TokenType::LEFT_BRACE,
            "Expect '{' before getter body.",
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            keyword: name.clone(),
            name: Some(name),
            params: Vec::new(),
            body,
        }))
    }

    /// `set IDENT "(" IDENT ")" block`, stored under the name `IDENT=`.
    fn setter(&mut self) -> PResult<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(ParseRule::ClassStmt, TokenType::IDENTIFIER, "Expect setter name.")?
            .clone();

        self.consume(
            ParseRule::ClassStmt,
            TokenType::LEFT_PAREN,
            "Expect '(' after setter name.",
        )?;

        let params = if self.check(TokenType::RIGHT_PAREN) {
            Vec::new()
        } else {
            self.parameters()?
        };

        if params.len() != 1 {
            let err = self.error(
                ParseRule::ClassStmt,
                &name,
                "A setter must take exactly one parameter.",
            );
            self.errors.push(err);
        }

        self.consume(
            ParseRule::ClassStmt,
            TokenType::RIGHT_PAREN,
            "Expect ')' after setter parameter.",
        )?;
        self.consume(
            ParseRule::ClassStmt,
            TokenType::LEFT_BRACE,
            "Expect '{' before setter body.",
        )?;
        let body = self.block()?;

        let stored = name.renamed(format!("{}=", name.lexeme));

        Ok(Rc::new(FunctionDecl {
            keyword: name,
            name: Some(stored),
            params,
            body,
        }))
    }

    fn function(&mut self, kind: FunctionKind) -> PResult<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(
                ParseRule::FunctionStmt,
                TokenType::IDENTIFIER,
                &format!("Expect {} name.", kind.as_str()),
            )?
            .clone();

        self.consume(
            ParseRule::FunctionStmt,
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind.as_str()),
        )?;

        let (params, body) = self.function_content(ParseRule::FunctionStmt, kind)?;

        Ok(Rc::new(FunctionDecl {
            keyword: name.clone(),
            name: Some(name),
            params,
            body,
        }))
    }

    /// Parameter list (after the opening paren) followed by the body.
    fn function_content(
        &mut self,
        rule: ParseRule,
        kind: FunctionKind,
    ) -> PResult<(Vec<Token>, Vec<Stmt>)> {
        let params: Vec<Token> = if self.check(TokenType::RIGHT_PAREN) {
            Vec::new()
        } else {
            self.parameters()?
        };

        self.consume(rule, TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            rule,
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind.as_str()),
        )?;

        let body = self.block()?;

        Ok((params, body))
    }

    fn parameters(&mut self) -> PResult<Vec<Token>> {
        let mut params: Vec<Token> = Vec::new();

        loop {
            if params.len() >= MAX_ARITY {
                let err = self.error(
                    ParseRule::FunctionStmt,
                    self.peek(),
                    "Can't have more than 255 parameters.",
                );
                self.errors.push(err);
            }

            params.push(
                self.consume(
                    ParseRule::FunctionStmt,
                    TokenType::IDENTIFIER,
                    "Expect parameter name.",
                )?
                .clone(),
            );

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        Ok(params)
    }

    fn val_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self
            .consume(ParseRule::ValStmt, TokenType::IDENTIFIER, "Expect constant name.")?
            .clone();

        self.consume(
            ParseRule::ValStmt,
            TokenType::EQUAL,
            "Expect '=' after constant name.",
        )?;
        let initializer: Expr = self.expression()?;

        self.consume(
            ParseRule::ValStmt,
            TokenType::SEMICOLON,
            "Expect ';' after constant declaration.",
        )?;

        Ok(Stmt::Val { name, initializer })
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self
            .consume(ParseRule::VarStmt, TokenType::IDENTIFIER, "Expect variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            ParseRule::VarStmt,
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        debug!("Entering statement at line {}", self.peek().line);

        if self.matches(TokenType::CONTINUE) {
            self.continue_statement()
        } else if self.matches(TokenType::BREAK) {
            self.break_statement()
        } else if self.matches(TokenType::SEMICOLON) {
            Ok(Stmt::Empty)
        } else if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::INPUT) {
            self.input_statement()
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn continue_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        self.consume(
            ParseRule::ContinueStmt,
            TokenType::SEMICOLON,
            "Expect ';' after 'continue'.",
        )?;

        Ok(Stmt::Continue { keyword })
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        self.consume(
            ParseRule::BreakStmt,
            TokenType::SEMICOLON,
            "Expect ';' after 'break'.",
        )?;

        Ok(Stmt::Break { keyword })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(
            ParseRule::ForStmt,
            TokenType::LEFT_PAREN,
            "Expect '(' after 'for'.",
        )?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            ParseRule::ForStmt,
            TokenType::SEMICOLON,
            "Expect ';' after loop condition.",
        )?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            ParseRule::ForStmt,
            TokenType::RIGHT_PAREN,
            "Expect ')' after for clauses.",
        )?;

        let body: Stmt = self.statement()?;

        let mut desugared = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::True)),
            body: Box::new(body),
            increment,
        };

        if let Some(init) = initializer {
            desugared = Stmt::Block(vec![init, desugared]);
        }

        Ok(desugared)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(
            ParseRule::IfStmt,
            TokenType::LEFT_PAREN,
            "Expect '(' after 'if'.",
        )?;
        let condition: Expr = self.expression()?;
        self.consume(
            ParseRule::IfStmt,
            TokenType::RIGHT_PAREN,
            "Expect ')' after if condition.",
        )?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn input_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        let name: Token = self
            .consume(
                ParseRule::InputStmt,
                TokenType::IDENTIFIER,
                "Expect variable name after 'input'.",
            )?
            .clone();
        self.consume(
            ParseRule::InputStmt,
            TokenType::SEMICOLON,
            "Expect ';' after input variable.",
        )?;

        Ok(Stmt::Input {
            keyword,
            variable: Expr::variable(name),
        })
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        let expression: Expr = self.expression()?;

        self.consume(
            ParseRule::PrintStmt,
            TokenType::SEMICOLON,
            "Expect ';' after value.",
        )?;

        Ok(Stmt::Print {
            keyword,
            expression,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            ParseRule::ReturnStmt,
            TokenType::SEMICOLON,
            "Expect ';' after return value.",
        )?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(
            ParseRule::WhileStmt,
            TokenType::LEFT_PAREN,
            "Expect '(' after 'while'.",
        )?;
        let condition: Expr = self.expression()?;
        self.consume(
            ParseRule::WhileStmt,
            TokenType::RIGHT_PAREN,
            "Expect ')' after condition.",
        )?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While {
            condition,
            body,
            increment: None,
        })
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(
            ParseRule::ExpressionStmt,
            TokenType::SEMICOLON,
            "Expect ';' after expression.",
        )?;
        Ok(Stmt::Expression(expr))
    }

    /// Declarations up to the closing brace.  A failed declaration inside the
    /// block is recorded and skipped like at top level.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(
            ParseRule::BlockStmt,
            TokenType::RIGHT_BRACE,
            "Expect '}' after block.",
        )?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.assignment()?;

        while self.matches(TokenType::COMMA) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.assignment()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr: Expr = self.conditional()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(Expr::Assign {
                        id: ExprId::fresh(),
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Get { object, name } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                    });
                }

                other => {
                    // Reported, but the parser is not confused: keep going.
                    let err = self.error(
                        ParseRule::AssignExpr,
                        &equals,
                        "Invalid assignment target.",
                    );
                    self.errors.push(err);
                    return Ok(other);
                }
            }
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.logical_or()?;

        if self.matches(TokenType::QUESTION) {
            // The middle operand behaves as if parenthesised.
            let then_branch: Expr = self.expression()?;
            self.consume(
                ParseRule::ConditionalExpr,
                TokenType::COLON,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch: Expr = self.conditional()?;

            expr = Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(
                        ParseRule::PropertyExpr,
                        TokenType::IDENTIFIER,
                        "Expect property name after '.'.",
                    )?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let err = self.error(
                        ParseRule::CallExpr,
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    );
                    self.errors.push(err);
                }

                // One level above `comma`, so separators stay separators.
                arguments.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(
                ParseRule::CallExpr,
                TokenType::RIGHT_PAREN,
                "Expect ')' after arguments.",
            )?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.matches(TokenType::NUMBER(0.0)) || self.matches(TokenType::STRING(String::new()))
        {
            if let Some(literal) = self.previous().literal() {
                return Ok(Expr::Literal(literal));
            }
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: ExprId::fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(
                ParseRule::SuperExpr,
                TokenType::DOT,
                "Expect '.' after 'super'.",
            )?;
            let method: Token = self
                .consume(
                    ParseRule::SuperExpr,
                    TokenType::IDENTIFIER,
                    "Expect superclass method name.",
                )?
                .clone();

            return Ok(Expr::Super {
                id: ExprId::fresh(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::FUN) {
            return self.function_expression();
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(
                ParseRule::GroupingExpr,
                TokenType::RIGHT_PAREN,
                "Expect ')' after expression.",
            )?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(self.error(ParseRule::PrimaryExpr, self.peek(), "Expect expression."))
    }

    /// `fun` has been consumed.
    fn function_expression(&mut self) -> PResult<Expr> {
        let keyword: Token = self.previous().clone();
        self.consume(
            ParseRule::FunctionExpr,
            TokenType::LEFT_PAREN,
            "Expect '(' after 'fun' in expression.",
        )?;

        let (params, body) = self.function_content(ParseRule::FunctionExpr, FunctionKind::Function)?;

        Ok(Expr::Function(Rc::new(FunctionDecl {
            name: None,
            keyword,
            params,
            body,
        })))
    }

    // ────────────────────── utility helpers ───────────────────────

    fn error(&self, rule: ParseRule, token: &Token, message: &str) -> SyntaxError {
        debug!("Syntax error in {:?} at line {}: {}", rule, token.line, message);

        SyntaxError::new(rule, token, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, rule: ParseRule, ttype: TokenType, message: &str) -> PResult<&'a Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error(rule, self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    /// A contextual `get` / `set` marker: the word followed by a member name.
    fn check_marker(&self, marker: &str) -> bool {
        self.check(TokenType::IDENTIFIER)
            && self.peek().lexeme == marker
            && self.check_next(TokenType::IDENTIFIER)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        tokens.get(self.current).unwrap_or(&END)
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        tokens.get(self.current.saturating_sub(1)).unwrap_or(&END)
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                debug!("Resynchronised after ';' at line {}", self.previous().line);
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAL
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::INPUT
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::CONTINUE => {
                    debug!("Resynchronised before {:?}", self.peek().token_type);
                    return;
                }
                _ => {}
            }

            self.advance();
        }
    }
}
