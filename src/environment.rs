//! Variable bindings.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::object::Object;

/// One scope of name bindings, chained to the scope it is nested in.
///
/// Environments are shared (`Rc`) because every function value keeps the environment it was
/// created in alive for as long as the function itself lives.
pub struct Environment {
    outer: Option<Rc<Environment>>,
    bindings: RefCell<FxHashMap<String, Object>>,
}

impl Environment {
    /// Top-level environment.
    pub fn new() -> Rc<Environment> {
        Self::with_outer(None)
    }

    /// Scope nested in `outer`, e.g. the frame of a function call.
    pub fn enclosed(outer: Rc<Environment>) -> Rc<Environment> {
        Self::with_outer(Some(outer))
    }

    fn with_outer(outer: Option<Rc<Environment>>) -> Rc<Environment> {
        Rc::new(Environment {
            outer,
            bindings: RefCell::new(FxHashMap::default()),
        })
    }

    /// Look `name` up in this scope, then in the enclosing ones.
    pub fn get(&self, name: &str) -> Option<Object> {
        match self.bindings.borrow().get(name) {
            Some(v) => Some(v.clone()),
            None => self.outer.as_ref().and_then(|o| o.get(name)),
        }
    }

    /// Bind `name` in this scope, shadowing any outer binding.  Returns the stored value.
    pub fn set(&self, name: &str, val: Object) -> Object {
        self.bindings
            .borrow_mut()
            .insert(name.to_owned(), val.clone());
        val
    }
}

// Bindings can hold closures capturing this very environment: only show names.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut names: Vec<&String> = bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("outer", &self.outer)
            .finish()
    }
}
