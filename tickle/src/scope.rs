//! Variable storage for a single frame or namespace.
//!
//! A `Scope` is just a table of names to values.  How scopes chain together (frame to
//! frame, and through `upvar`/`global` links) is the interpreter's business; see
//! `Interp::var` and friends.

use crate::types::TickleHasher;
use crate::value::Value;
use alloc::string::String;
use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub(crate) struct Scope {
    vars: IndexMap<String, Value, TickleHasher>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.vars.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.vars.insert(name.into(), value);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.shift_remove(name)
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Variable names in definition order, links included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
