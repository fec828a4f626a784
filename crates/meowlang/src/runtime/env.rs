use crate::diagnostics::Failure;
use crate::runtime::value::Value;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A linked stack of name→value scopes with lexical lookup.
///
/// Scopes are shared handles: a closure captures its defining scope by
/// reference, so mutations to an outer variable made inside the closure are
/// visible after it returns.
#[derive(Debug, Clone)]
pub struct Environment {
    inner: Rc<RefCell<Scope>>,
}

#[derive(Debug)]
struct Scope {
    vars: HashMap<SmolStr, Value>,
    parent: Option<Environment>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates a new top-level environment.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scope {
                vars: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// Creates a child scope whose lookups fall through to `self`.
    pub fn child(&self) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scope {
                vars: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Binds a name in the innermost scope.
    pub fn define(&self, name: impl Into<SmolStr>, value: Value) {
        self.inner.borrow_mut().vars.insert(name.into(), value);
    }

    /// Updates an existing binding, walking up the scope chain.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Failure> {
        let mut env = self.clone();
        loop {
            {
                let mut scope = env.inner.borrow_mut();
                if let Some(slot) = scope.vars.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
            }
            let parent = env.inner.borrow().parent.clone();
            match parent {
                Some(p) => env = p,
                None => return Err(Failure::hiss(format!("undefined variable {name}"))),
            }
        }
    }

    /// Looks up a name, walking up the scope chain.
    pub fn get(&self, name: &str) -> Result<Value, Failure> {
        let mut env = self.clone();
        loop {
            {
                let scope = env.inner.borrow();
                if let Some(value) = scope.vars.get(name) {
                    return Ok(value.clone());
                }
            }
            let parent = env.inner.borrow().parent.clone();
            match parent {
                Some(p) => env = p,
                None => return Err(Failure::hiss(format!("undefined variable {name}"))),
            }
        }
    }

    /// Reports whether a name is bound anywhere in the chain.
    pub fn has(&self, name: &str) -> bool {
        let mut env = self.clone();
        loop {
            if env.inner.borrow().vars.contains_key(name) {
                return true;
            }
            let parent = env.inner.borrow().parent.clone();
            match parent {
                Some(p) => env = p,
                None => return false,
            }
        }
    }
}
