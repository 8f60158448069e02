use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope frame.  Frames live as long as the longest
/// closure or active call that still refers to them.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

/// One frame of the lexical scope chain.
pub struct Environment {
    values: HashMap<String, Binding>,
    enclosing: Option<EnvRef>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// The global frame.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Reserve `name` (holding `nil`) before its value exists.
    pub fn declare(&mut self, name: &str, mutable: bool) {
        debug!("Declaring '{}' (mutable={})", name, mutable);
        self.values.insert(
            name.to_string(),
            Binding {
                value: Value::Nil,
                mutable,
            },
        );
    }

    /// Bind `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value, mutable: bool) {
        debug!("Defining '{}' (mutable={})", name, mutable);
        self.values
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Look `name` up through the whole chain.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(binding) = self.values.get(&name.lexeme) {
            Ok(binding.value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Assign to the nearest frame that binds `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(binding) = self.values.get_mut(&name.lexeme) {
            store(binding, name, value)
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The frame `distance` hops up from `env` (`0` is `env` itself).
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from exactly the frame at `distance`, without searching.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame: EnvRef = Self::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).map(|b| b.value.clone());
        value
    }

    /// Assign `name` in exactly the frame at `distance`.
    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let frame: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(&name.lexeme) {
            Some(binding) => store(binding, name, value),
            None => Err(undefined(name)),
        }
    }
}

fn store(binding: &mut Binding, name: &Token, value: Value) -> Result<(), RuntimeError> {
    if !binding.mutable {
        return Err(RuntimeError::new(
            name,
            format!("Cannot reassign constant '{}'.", name.lexeme),
        ));
    }

    binding.value = value;
    Ok(())
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

// Frames are part of reference cycles (a function stored in the frame that
// is its own closure), so only the names are printed.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvRef, Environment};
    use crate::token::{Token, TokenType};
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn define_and_get() {
        let mut env = Environment::new();
        env.define("foo", Value::from("bar"), true);
        env.define("baz", Value::from(false), false);

        assert_eq!(env.get(&ident("foo")).unwrap(), Value::from("bar"));
        assert_eq!(env.get(&ident("baz")).unwrap(), Value::from(false));
    }

    #[test]
    fn undefined_names_are_errors() {
        let mut env = Environment::new();

        let err = env.assign(&ident("foo"), Value::Nil).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'foo'.");
        assert!(env.get(&ident("foo")).is_err());
    }

    #[test]
    fn immutable_bindings_reject_assignment_on_both_paths() {
        let global: EnvRef = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("k", Value::Number(1.0), false);
        let inner: EnvRef = Rc::new(RefCell::new(Environment::with_enclosing(global.clone())));

        assert!(inner
            .borrow_mut()
            .assign(&ident("k"), Value::Number(2.0))
            .is_err());
        assert!(Environment::assign_at(&inner, 1, &ident("k"), Value::Number(2.0)).is_err());
        assert_eq!(
            Environment::get_at(&inner, 1, "k"),
            Some(Value::Number(1.0))
        );
    }

    #[test]
    fn distance_access_skips_shadowing_frames() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("foo", Value::from("outer"), true);

        let inner: EnvRef = Rc::new(RefCell::new(Environment::with_enclosing(outer.clone())));
        inner.borrow_mut().define("foo", Value::from("inner"), true);

        assert_eq!(Environment::get_at(&inner, 0, "foo"), Some(Value::from("inner")));
        assert_eq!(Environment::get_at(&inner, 1, "foo"), Some(Value::from("outer")));
        assert_eq!(Environment::get_at(&inner, 2, "foo"), None);

        Environment::assign_at(&inner, 1, &ident("foo"), Value::from(false)).unwrap();
        assert_eq!(outer.borrow().get(&ident("foo")).unwrap(), Value::from(false));
        assert_eq!(inner.borrow().get(&ident("foo")).unwrap(), Value::from("inner"));
    }

    #[test]
    fn declared_names_hold_nil_until_defined() {
        let mut env = Environment::new();
        env.declare("Pending", false);
        assert_eq!(env.get(&ident("Pending")).unwrap(), Value::Nil);

        env.define("Pending", Value::Number(7.0), false);
        assert_eq!(env.get(&ident("Pending")).unwrap(), Value::Number(7.0));
    }
}
