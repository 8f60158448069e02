//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined)
//!    that mirror, frame for frame, the environments the interpreter creates.
//! 2. Report static errors (forward‑read in initializer, misplaced `break`,
//!    `continue`, `return`, `this` or `super`, value returned from `init`).
//! 3. Record, for *each* local variable occurrence, how many frames out its
//!    binding lives.  Names found in no scope are globals and get no entry.
//!
//! Errors never stop the walk, so one pass reports all of them.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{ResolutionError, ResolutionErrorKind};
use crate::token::Token;

/// Binding distances keyed by the expression that reads or writes the name.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of body we are in.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    ClassMethod,
}

/// What kind of class body we are in.  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    locals: Locals,
    errors: Vec<ResolutionError>,
    current_function: FunctionType,
    current_class: ClassType,
    in_class_method: bool,
    loop_depth: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: Locals::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_class_method: false,
            loop_depth: 0,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt]) -> (Locals, Vec<ResolutionError>) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        info!(
            "Resolved {} local reference(s), {} error(s)",
            self.locals.len(),
            self.errors.len()
        );

        (self.locals, self.errors)
    }

    /// Resolve a lone top‑level expression.
    pub fn resolve_expression(mut self, expr: &Expr) -> (Locals, Vec<ResolutionError>) {
        self.resolve_expr(expr);
        (self.locals, self.errors)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    self.error(
                        ResolutionErrorKind::BreakOutsideLoop,
                        keyword,
                        "Can't use 'break' outside of a loop.",
                    );
                }
            }

            Stmt::Continue { keyword } => {
                if self.loop_depth == 0 {
                    self.error(
                        ResolutionErrorKind::ContinueOutsideLoop,
                        keyword,
                        "Can't use 'continue' outside of a loop.",
                    );
                }
            }

            Stmt::Class(decl) => self.resolve_class(decl),

            Stmt::Empty => {}

            Stmt::Expression(expr) => self.resolve_expr(expr),

            Stmt::Function(decl) => {
                // The name is visible inside its own body, for recursion.
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::Input { variable, .. } => self.resolve_expr(variable),

            Stmt::Print { expression, .. } => self.resolve_expr(expression),

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(
                        ResolutionErrorKind::ReturnOutsideFunction,
                        keyword,
                        "Can't return from top-level code.",
                    );
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(
                            ResolutionErrorKind::ReturnFromInit,
                            keyword,
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Val { name, initializer } => {
                self.declare(name);
                self.resolve_expr(initializer);
                self.define(name);
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;

                // Runs in the loop's own scope, after the body's scope is gone.
                if let Some(inc) = increment {
                    self.resolve_expr(inc);
                }
            }
        }
    }

    /// Scopes pushed here match the frames the interpreter builds: a `super`
    /// frame for subclasses, then a `this` frame per bound method.
    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.current_class;
        let enclosing_in_class_method = self.in_class_method;
        self.current_class = ClassType::Class;
        self.in_class_method = false;

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define_name("super");
        }

        let instance_members = decl
            .methods
            .iter()
            .map(|m| (m, is_initializer(m)))
            .chain(decl.getters.iter().map(|m| (m, false)))
            .chain(decl.setters.iter().map(|m| (m, false)));

        for (method, initializer) in instance_members {
            let kind = if initializer {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.begin_scope();
            self.define_name("this");
            self.resolve_function(method, kind);
            self.end_scope();
        }

        self.in_class_method = true;
        for method in &decl.class_methods {
            self.begin_scope();
            self.define_name("this");
            self.resolve_function(method, FunctionType::ClassMethod);
            self.end_scope();
        }

        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        self.in_class_method = enclosing_in_class_method;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                let uninitialised = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    == Some(&false);

                if uninitialised {
                    self.error(
                        ResolutionErrorKind::VarInitSelfRefer,
                        name,
                        "Can't read local variable in its own initializer.",
                    );
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Function(decl) => self.resolve_function(decl, FunctionType::Function),

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => self.error(
                        ResolutionErrorKind::SuperOutsideClass,
                        keyword,
                        "Can't use 'super' outside of a class.",
                    ),
                    ClassType::Class => self.error(
                        ResolutionErrorKind::SuperWithoutSuperclass,
                        keyword,
                        "Can't use 'super' in a class with no superclass.",
                    ),
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(
                        ResolutionErrorKind::ThisOutsideClass,
                        keyword,
                        "Can't use 'this' outside of a class.",
                    );
                } else if self.in_class_method {
                    self.error(
                        ResolutionErrorKind::StaticInit,
                        keyword,
                        "Can't use 'this' in a class method.",
                    );
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.  Loops outside
    /// the function do not count for `break`/`continue` inside it.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop_depth = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loop_depth;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        self.define_name(&name.lexeme);
    }

    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn error(&mut self, kind: ResolutionErrorKind, token: &Token, message: &str) {
        self.errors.push(ResolutionError::new(kind, token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either:
    ///  - a local at depth `d`, or
    ///  - a global if not found in *any* scope.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // 1. check innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        // 2. not found in any local scope ⇒ global
        debug!("Resolved '{}' as global", name.lexeme);
    }
}

fn is_initializer(method: &FunctionDecl) -> bool {
    method.name.as_ref().is_some_and(|name| name.lexeme == "init")
}
