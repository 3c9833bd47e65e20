//! Lexical environments.
//!
//! An environment is a persistent chain of scopes. Extending it never
//! mutates the parent, so any number of closures can share one parent
//! scope through the `Rc`; a scope lives as long as its longest-lived
//! referencing closure. Parent links only point outward, so no cycles form.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

struct Scope<'a> {
    bindings: HashMap<String, Value<'a>>,
    parent: Env<'a>,
}

/// Immutable scope chain mapping names to values.
#[derive(Clone, Default)]
pub struct Env<'a>(Option<Rc<Scope<'a>>>);

impl<'a> Env<'a> {
    /// Empty root environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Child environment with a single binding.
    pub fn bind(&self, name: &str, value: Value<'a>) -> Self {
        self.extend([(name.to_string(), value)])
    }

    /// Child environment holding all of `bindings` in one scope.
    /// Later entries shadow earlier ones with the same name.
    pub fn extend(&self, bindings: impl IntoIterator<Item = (String, Value<'a>)>) -> Self {
        Env(Some(Rc::new(Scope {
            bindings: bindings.into_iter().collect(),
            parent: self.clone(),
        })))
    }

    /// Look up a name, walking from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<&Value<'a>> {
        let mut scope = self.0.as_deref();
        while let Some(s) = scope {
            if let Some(v) = s.bindings.get(name) {
                return Some(v);
            }
            scope = s.parent.0.as_deref();
        }
        None
    }

    /// Number of scopes in the chain.
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut scope = self.0.as_deref();
        while let Some(s) = scope {
            n += 1;
            scope = s.parent.0.as_deref();
        }
        n
    }

    /// Whether both environments are the same scope (not merely equal contents).
    pub fn ptr_eq(&self, other: &Env<'a>) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values can be large closures; names are enough to orient a reader.
        let mut names = Vec::new();
        let mut scope = self.0.as_deref();
        while let Some(s) = scope {
            let mut keys: Vec<_> = s.bindings.keys().map(String::as_str).collect();
            keys.sort_unstable();
            names.push(keys);
            scope = s.parent.0.as_deref();
        }
        f.debug_tuple("Env").field(&names).finish()
    }
}
