use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::lexer::Token;
use crate::runtime::callable::{ClassParents, Function};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

/// One scope of runtime bindings, linked to the scope it was created in.
#[derive(Default)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    pub fn enclosing(&self) -> Option<Rc<Environment>> {
        self.enclosing.clone()
    }

    /// Binds a new name in this scope. Declaring a function over an existing
    /// function adds an overload instead; any other redefinition is an error.
    pub fn define(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut values = self.values.borrow_mut();
        if let Some(existing) = values.get(&name.lexeme) {
            return match (existing, &value) {
                (Value::Function(existing), Value::Function(overload)) => {
                    existing.add_overload(overload.clone());
                    Ok(())
                }
                _ => Err(RuntimeError::new(name, "Variable already exists!")),
            };
        }
        values.insert(name.lexeme.clone(), value);
        Ok(())
    }

    /// Binds or rebinds a name without the redefinition check. Used for receivers,
    /// parameters, handler variables and natives.
    pub fn define_value(&self, name: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// Looks a name up in this scope and then outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(name) {
            return Some(value.clone());
        }
        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.lookup(name))
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.lookup(&name.lexeme)
            .ok_or_else(|| undefined_variable(name))
    }

    pub fn ancestor(self: &Rc<Self>, distance: usize) -> Option<Rc<Environment>> {
        let mut environment = self.clone();
        for _ in 0..distance {
            environment = environment.enclosing.clone()?;
        }
        Some(environment)
    }

    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Option<Value> {
        let environment = self.ancestor(distance)?;
        let value = environment.values.borrow().get(name).cloned();
        value
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.borrow_mut().get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(undefined_variable(name)),
        }
    }

    pub fn assign_at(
        self: &Rc<Self>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let environment = self
            .ancestor(distance)
            .ok_or_else(|| undefined_variable(name))?;
        environment.define_value(name.lexeme.clone(), value);
        Ok(())
    }

    /// Walks outward looking for a function named `name` with an overload that
    /// accepts arguments of the given runtime types.
    pub fn find_function(
        &self,
        name: &str,
        types: &[String],
        parents: &ClassParents,
    ) -> Option<Rc<Function>> {
        let local = match self.values.borrow().get(name) {
            Some(Value::Function(function)) => function.find_overload(types, parents),
            _ => None,
        };
        local.or_else(|| {
            self.enclosing
                .as_ref()
                .and_then(|enclosing| enclosing.find_function(name, types, parents))
        })
    }
}

pub fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}
