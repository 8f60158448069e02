use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Anything a call expression can invoke.
///
/// `call` receives the receiver as `Rc<Self>` so a class can hand itself to
/// the instance it creates without cloning its method table.
pub trait Callable {
    fn arity(&self) -> usize;

    /// `arguments.len() == self.arity()` has already been checked.
    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter<'_>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A host function bound in the global scope.
pub struct NativeFunction {
    pub name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        _interpreter: &mut Interpreter<'_>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling native '{}'", self.name);

        (self.func)(&arguments).map_err(|message| RuntimeError::new(paren, message))
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// How a method is reached from a property access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Normal,
    /// Invoked as soon as the property is read.
    Getter,
    /// Invoked by assignment to the property; its parameter cannot be reassigned.
    Setter,
}

/// A user function, method or function literal together with the scope it
/// closed over.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
    kind: MethodKind,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self::method(declaration, closure, false, MethodKind::Normal)
    }

    pub fn method(
        declaration: Rc<FunctionDecl>,
        closure: EnvRef,
        is_initializer: bool,
        kind: MethodKind,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
            kind,
        }
    }

    /// A copy of this method whose closure binds `this` to `receiver`.
    pub fn bind(&self, receiver: Value) -> Rc<Function> {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", receiver, false);

        Rc::new(Self::method(
            Rc::clone(&self.declaration),
            Rc::new(RefCell::new(env)),
            self.is_initializer,
            self.kind,
        ))
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_ref().map(|t| t.lexeme.as_str())
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter<'_>,
        _paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling {}", self);

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        let mutable = self.kind != MethodKind::Setter;

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, argument, mutable);
        }

        let flow = interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)))?;

        // `init()` always yields the instance, even on a bare `return;`.
        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, "this").unwrap_or(Value::Nil));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<anon fn>"),
        }
    }
}
