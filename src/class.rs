use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

use crate::callable::{Callable, Function};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

pub type MethodTable = HashMap<String, Rc<Function>>;

/// A class value.  Calling it constructs an [`Instance`].
pub struct Class {
    pub name: String,
    superclass: Option<Rc<Class>>,
    methods: MethodTable,
    /// Holds the class-level methods; only present when some were declared.
    metaclass: Option<Rc<Class>>,
    /// Set on a metaclass only.  Weak, so a class and its metaclass do not
    /// keep each other alive.
    owner: RefCell<Weak<Class>>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: MethodTable,
        class_methods: MethodTable,
    ) -> Rc<Class> {
        let metaclass = if class_methods.is_empty() {
            None
        } else {
            Some(Rc::new(Class {
                name: format!("{} metaclass", name),
                superclass: None,
                methods: class_methods,
                metaclass: None,
                owner: RefCell::new(Weak::new()),
            }))
        };

        let class = Rc::new(Class {
            name: name.to_string(),
            superclass,
            methods,
            metaclass,
            owner: RefCell::new(Weak::new()),
        });

        if let Some(metaclass) = &class.metaclass {
            *metaclass.owner.borrow_mut() = Rc::downgrade(&class);
        }

        debug!(
            "Created class '{}' ({} methods, metaclass={})",
            class.name,
            class.methods.len(),
            class.metaclass.is_some()
        );

        class
    }

    pub fn metaclass(&self) -> Option<&Rc<Class>> {
        self.metaclass.as_ref()
    }

    /// The class a metaclass belongs to, while that class is alive.
    pub fn owner(&self) -> Option<Rc<Class>> {
        self.owner.borrow().upgrade()
    }

    /// Instance method lookup through the whole superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }

    /// Class-level method lookup: this class's metaclass first, then the
    /// metaclasses up the superclass chain.
    pub fn find_class_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.metaclass.as_ref().and_then(|m| m.methods.get(name)) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_class_method(name)
    }
}

impl Callable for Class {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter<'_>,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating '{}'", self.name);

        let instance = Value::Instance(Instance::new(Rc::clone(&self)));

        if let Some(init) = self.find_method("init") {
            init.bind(instance.clone())
                .call(interpreter, paren, arguments)?;
        }

        Ok(instance)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<cls {}>", self.name)
    }
}

/// An object created by calling a class.
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<inst {}>", self.class.name)
    }
}
