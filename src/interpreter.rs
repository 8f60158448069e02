use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, Read, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, Stmt};
use crate::callable::{Callable, Function, MethodKind};
use crate::class::{Class, MethodTable};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::natives;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.  Anything but `Normal` unwinds enclosing
/// blocks until a loop (`Break`, `Continue`) or a call (`Return`) takes it.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type IResult<T> = Result<T, RuntimeError>;

/// Tree-walking evaluator.
///
/// Program output goes to the injected writer and `input` statements read
/// from the injected line source, so a whole session can run against
/// in-memory buffers.
pub struct Interpreter<'io> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    output: Box<dyn Write + 'io>,
    input: Box<dyn BufRead + 'io>,
}

impl Interpreter<'static> {
    /// An interpreter wired to the process's stdout and stdin.
    pub fn new() -> Self {
        Interpreter::with_io(io::stdout(), StdinLines::default())
    }
}

impl Default for Interpreter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'io> Interpreter<'io> {
    pub fn with_io<W, R>(output: W, input: R) -> Self
    where
        W: Write + 'io,
        R: BufRead + 'io,
    {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        natives::define_all(&mut globals);
        let globals: EnvRef = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output: Box::new(output),
            input: Box::new(input),
        }
    }

    /// Merge binding distances produced by the resolver.  Entries from
    /// earlier runs are kept, so functions declared on a previous REPL line
    /// still find their variables.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved reference(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Execute a program.  The first runtime error aborts the remaining
    /// statements; everything defined before it stays in the globals.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluate one expression and write its value to the output.
    pub fn interpret_expression(&mut self, expr: &Expr) -> IResult<Value> {
        let value = self.evaluate(expr)?;

        if let Err(e) = writeln!(self.output, "{}", value) {
            log::error!("Could not write result: {}", e);
        }

        Ok(value)
    }

    // ─────────────────────────── statements ───────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                debug!("Entering block with {} statement(s)", statements.len());
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Continue { .. } => Ok(Flow::Continue),

            Stmt::Class(decl) => {
                self.class_declaration(decl)?;
                Ok(Flow::Normal)
            }

            Stmt::Empty => Ok(Flow::Normal),

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment));
                let name = function.name().unwrap_or_default().to_string();
                debug!("Defining function '{}'", name);

                self.environment.borrow_mut().define(
                    &name,
                    Value::Function(Rc::new(function)),
                    false,
                );
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Input { keyword, variable } => {
                self.input_statement(keyword, variable)?;
                Ok(Flow::Normal)
            }

            Stmt::Print {
                keyword,
                expression,
            } => {
                let value = self.evaluate(expression)?;
                writeln!(self.output, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword, format!("Could not write output: {}.", e))
                })?;
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Val { name, initializer } => {
                let value = self.evaluate(initializer)?;
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, value, false);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, value, true);
                Ok(Flow::Normal)
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }

                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `env` as the current scope.  The previous scope
    /// is restored on every exit path, errors included.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let previous = std::mem::replace(&mut self.environment, env);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }

        Ok(Flow::Normal)
    }

    fn class_declaration(&mut self, decl: &ClassDecl) -> IResult<()> {
        let superclass: Option<Rc<Class>> = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => &decl.name,
                    };
                    return Err(RuntimeError::new(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        let name: &str = &decl.name.lexeme;
        self.environment.borrow_mut().declare(name, false);

        // Methods of a subclass close over a scope that holds `super`.
        let closure: EnvRef = match &superclass {
            Some(superclass) => {
                let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                env.define("super", Value::Class(Rc::clone(superclass)), false);
                Rc::new(RefCell::new(env))
            }
            None => Rc::clone(&self.environment),
        };

        let mut methods = MethodTable::new();
        let members = decl
            .methods
            .iter()
            .map(|m| (m, MethodKind::Normal))
            .chain(decl.getters.iter().map(|m| (m, MethodKind::Getter)))
            .chain(decl.setters.iter().map(|m| (m, MethodKind::Setter)));

        for (method, kind) in members {
            let function = Function::method(
                Rc::clone(method),
                Rc::clone(&closure),
                kind == MethodKind::Normal && method_name(method) == "init",
                kind,
            );
            methods.insert(method_name(method).to_string(), Rc::new(function));
        }

        let mut class_methods = MethodTable::new();
        for method in &decl.class_methods {
            let function =
                Function::method(Rc::clone(method), Rc::clone(&closure), false, MethodKind::Normal);
            class_methods.insert(method_name(method).to_string(), Rc::new(function));
        }

        let class = Class::new(name, superclass, methods, class_methods);

        self.environment
            .borrow_mut()
            .define(name, Value::Class(class), false);
        Ok(())
    }

    fn input_statement(&mut self, keyword: &Token, variable: &Expr) -> IResult<()> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|_| RuntimeError::new(keyword, "There was an error reading input."))?;

        let value = if read == 0 {
            Value::Nil
        } else {
            parse_input(line.trim_end_matches(|c| c == '\n' || c == '\r'))
        };
        debug!("Read input {:?}", value);

        match variable {
            Expr::Variable { id, name } => self.assign_variable(*id, name, value),
            _ => Err(RuntimeError::new(keyword, "Invalid input target.")),
        }
    }

    // ─────────────────────────── expressions ──────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable = callee.as_callable().ok_or_else(|| {
                    RuntimeError::new(paren, "Can only call functions and classes.")
                })?;

                if values.len() != callable.arity() {
                    return Err(RuntimeError::new(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                callable.call(self, paren, values)
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Function(decl) => Ok(Value::Function(Rc::new(Function::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
            )))),

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(object, name)
            }

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = &object else {
                    return Err(RuntimeError::new(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;

                let class = Rc::clone(instance.borrow().class());
                match class.find_method(&format!("{}=", name.lexeme)) {
                    Some(setter) => {
                        setter
                            .bind(object.clone())
                            .call(self, name, vec![value.clone()])?;
                    }
                    None => instance.borrow_mut().set(&name.lexeme, value.clone()),
                }

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::COMMA => Ok(right),

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or a string and another object.",
                )),
            },

            TokenType::MINUS | TokenType::STAR | TokenType::SLASH => {
                let (a, b) = match (left, right) {
                    (Value::Number(a), Value::Number(b)) => (a, b),
                    _ => return Err(RuntimeError::new(operator, "Operands must be numbers.")),
                };

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    _ if b == 0.0 => Err(RuntimeError::new(operator, "Division by zero.")),
                    _ => Ok(Value::Number(a / b)),
                }
            }

            TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL => {
                let ordering = match (&left, &right) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => {
                        return Err(RuntimeError::new(
                            operator,
                            "Operands must be two numbers or two strings.",
                        ))
                    }
                };

                // NaN compares false under every operator.
                let result = match ordering {
                    Some(ordering) => match operator.token_type {
                        TokenType::GREATER => ordering.is_gt(),
                        TokenType::GREATER_EQUAL => ordering.is_ge(),
                        TokenType::LESS => ordering.is_lt(),
                        _ => ordering.is_le(),
                    },
                    None => false,
                };

                Ok(Value::Bool(result))
            }

            _ => Err(RuntimeError::new(operator, "Invalid binary operator.")),
        }
    }

    /// Property read: fields shadow methods, getters run immediately, and
    /// class-level methods are reachable from both instances and the class.
    fn get_property(&mut self, object: Value, name: &Token) -> IResult<Value> {
        match &object {
            Value::Instance(instance) => {
                let (field, class) = {
                    let instance = instance.borrow();
                    (instance.field(&name.lexeme), Rc::clone(instance.class()))
                };

                if let Some(value) = field {
                    return Ok(value);
                }

                if let Some(method) = class.find_method(&name.lexeme) {
                    let bound = method.bind(object.clone());
                    if bound.kind() == MethodKind::Getter {
                        return bound.call(self, name, Vec::new());
                    }
                    return Ok(Value::Function(bound));
                }

                if let Some(method) = class.find_class_method(&name.lexeme) {
                    return Ok(Value::Function(method.bind(Value::Class(class))));
                }

                Err(undefined_property(name))
            }

            Value::Class(class) => {
                // A class with class-level methods can name itself through its metaclass.
                if let Some(owner) = class.metaclass().and_then(|m| m.owner()) {
                    if owner.name == name.lexeme {
                        return Ok(Value::Class(owner));
                    }
                }

                match class.find_class_method(&name.lexeme) {
                    Some(method) => Ok(Value::Function(method.bind(object.clone()))),
                    None => Err(undefined_property(name)),
                }
            }

            _ => Err(RuntimeError::new(name, "Only instances have properties.")),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .ok_or_else(|| RuntimeError::new(keyword, "Can't use 'super' here."))?;

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(RuntimeError::new(keyword, "Superclass must be a class.")),
        };

        // `this` lives one scope inside the `super` scope.
        let receiver = Environment::get_at(&self.environment, distance.saturating_sub(1), "this")
            .unwrap_or(Value::Nil);

        let found = superclass
            .find_method(&method.lexeme)
            .or_else(|| superclass.find_class_method(&method.lexeme))
            .ok_or_else(|| undefined_property(method))?;

        let bound = found.bind(receiver);
        if bound.kind() == MethodKind::Getter {
            return bound.call(self, method, Vec::new());
        }

        Ok(Value::Function(bound))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => {
                debug!("Reading '{}' at distance {}", name.lexeme, distance);
                Environment::get_at(&self.environment, distance, &name.lexeme).ok_or_else(|| {
                    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
                })
            }
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> IResult<()> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

/// Stdin pulled one line at a time, so a prompt reading the same stdin
/// never loses input buffered ahead by the interpreter.
#[derive(Default)]
struct StdinLines {
    line: Vec<u8>,
    pos: usize,
}

impl Read for StdinLines {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for StdinLines {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.line.len() {
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            self.line = line.into_bytes();
            self.pos = 0;
        }

        Ok(&self.line[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.line.len());
    }
}

fn method_name(decl: &crate::ast::FunctionDecl) -> &str {
    decl.name
        .as_ref()
        .map_or(decl.keyword.lexeme.as_str(), |t| t.lexeme.as_str())
}

fn undefined_property(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined property '{}'.", name.lexeme))
}

/// A line typed at an `input` statement: a keyword literal, a number, or
/// otherwise the raw text.  `NaN` and `Infinity` are numbers; Rust's own
/// spellings such as `inf` are not.
fn parse_input(line: &str) -> Value {
    match line {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        text => match text.trim() {
            "NaN" | "+NaN" | "-NaN" => Value::Number(f64::NAN),
            "Infinity" | "+Infinity" => Value::Number(f64::INFINITY),
            "-Infinity" => Value::Number(f64::NEG_INFINITY),
            _ => parse_plain_number(text),
        },
    }
}

fn parse_plain_number(text: &str) -> Value {
    let numeric = !text
        .chars()
        .any(|c| c.is_alphabetic() && c != 'e' && c != 'E');

    match text.trim().parse::<f64>() {
        Ok(n) if numeric => Value::Number(n),
        _ => Value::String(text.to_string()),
    }
}
