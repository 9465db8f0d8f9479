//! Runtime scopes.  Each [`Environment`] maps names to values and points
//! outward to the scope that encloses it; closures keep their defining scope
//! alive by holding an [`EnvRef`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared, mutable handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    /// `None` marks a variable that was declared without an initializer and
    /// has not been assigned yet.
    values: HashMap<String, Option<Value>>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// The outermost (global) scope.
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

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), Some(value));
    }

    /// Bind `name` in this scope without a value.
    pub fn declare(&mut self, name: &str) {
        self.values.insert(name.to_string(), None);
    }

    /// Look `name` up in this scope only.
    pub fn get_here(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned().flatten()
    }

    /// Dynamic lookup walking the whole chain outward.
    pub fn get(&self, name: &Token) -> Result<Value> {
        match self.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(unassigned(name)),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    /// Dynamic assignment walking the whole chain outward.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = Some(value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The scope exactly `distance` links outward from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = Rc::clone(current.borrow().enclosing.as_ref()?);
            current = next;
        }

        Some(current)
    }

    /// Read a variable the resolver located `distance` scopes out.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        debug!("get_at '{}' distance {}", name.lexeme, distance);

        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let scope = scope.borrow();

        match scope.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(unassigned(name)),
            None => Err(undefined(name)),
        }
    }

    /// Assign a variable the resolver located `distance` scopes out.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        debug!("assign_at '{}' distance {}", name.lexeme, distance);

        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn unassigned(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Unassigned variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn inner_scope_shadows_without_touching_outer() {
        let outer: EnvRef = Environment::new().into_ref();
        outer.borrow_mut().define("a", Value::Number(1.0));

        let inner: EnvRef = Environment::with_enclosing(Rc::clone(&outer)).into_ref();
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(outer.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_walks_outward() {
        let outer: EnvRef = Environment::new().into_ref();
        outer.borrow_mut().define("a", Value::Nil);

        let inner: EnvRef = Environment::with_enclosing(Rc::clone(&outer)).into_ref();
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Bool(true))
            .unwrap();

        assert_eq!(outer.borrow().get_here("a"), Some(Value::Bool(true)));
    }

    #[test]
    fn get_at_reads_exact_ancestor() {
        let global: EnvRef = Environment::new().into_ref();
        global.borrow_mut().define("x", Value::Number(0.0));

        let middle: EnvRef = Environment::with_enclosing(Rc::clone(&global)).into_ref();
        middle.borrow_mut().define("x", Value::Number(1.0));

        let inner: EnvRef = Environment::with_enclosing(Rc::clone(&middle)).into_ref();

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("x")).unwrap(),
            Value::Number(1.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 2, &ident("x")).unwrap(),
            Value::Number(0.0)
        );

        Environment::assign_at(&inner, 2, &ident("x"), Value::Number(9.0)).unwrap();
        assert_eq!(global.borrow().get_here("x"), Some(Value::Number(9.0)));
        assert!(Environment::ancestor(&inner, 3).is_none());
    }

    #[test]
    fn unassigned_and_undefined_are_distinct_errors() {
        let env: EnvRef = Environment::new().into_ref();
        env.borrow_mut().declare("a");

        let err = env.borrow().get(&ident("a")).unwrap_err();
        assert_eq!(err.message(), "Unassigned variable 'a'.");

        let err = env.borrow().get(&ident("b")).unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'b'.");

        env.borrow_mut().assign(&ident("a"), Value::Nil).unwrap();
        assert_eq!(env.borrow().get(&ident("a")).unwrap(), Value::Nil);
    }
}
