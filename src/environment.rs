use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

use crate::{
    error::{Error, Result},
    token::Token,
    value::Value,
};

/// One scope frame. Frames are shared: a closure keeps the frame it was
/// defined in alive for as long as the closure itself is reachable.
#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self { enclosing: None, values: HashMap::new() }
    }

    pub fn from(e: &Rc<RefCell<Environment>>) -> Self {
        Self { enclosing: Some(Rc::clone(e)), values: HashMap::new() }
    }

    /// Looks `name` up in this frame, then in each enclosing frame in turn.
    /// `None` means no frame defines it, which is distinct from `Some(Value::Nil)`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name)
            .cloned()
            .or_else(|| {
                self.enclosing.as_ref()
                    .and_then(|e| e.borrow().get(name))
            })
    }

    /// Overwrites the binding in the nearest frame that defines `name`.
    /// Never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        match self.values.get_mut(&name.lexeme) {
            Some(v) => {
                *v = value;
                Ok(())
            },
            None => self.enclosing.as_ref()
                .map(|e| e.borrow_mut().assign(name, value))
                .unwrap_or_else(|| Err(Error::undefined_variable(name))),
        }
    }

    /// Binds `name` in this frame only, shadowing any outer binding.
    pub fn define<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }
}
