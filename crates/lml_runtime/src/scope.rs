//! Scope arena for the interpreter's environments.
//!
//! Scopes form a tree at first and a DAG once closures escape: a lambda
//! holds the id of the scope that was current when it was evaluated, and
//! several closures may share one parent chain. Storing scopes in an arena
//! keyed by integer id keeps that sharing safe (no ownership cycles) while
//! the arena itself lives for the whole invocation; a scope is immutable
//! in identity but mutable in contents.

use std::collections::HashMap;

use crate::value::Value;

/// Index of a scope in its [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    bindings: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope with no parent (a program or module root).
    pub fn push_root(&mut self) -> ScopeId {
        self.scopes.push(Scope::default());
        ScopeId(self.scopes.len() - 1)
    }

    /// Creates a child scope of `parent`.
    pub fn push_child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            bindings: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Declares `name` in `scope`, shadowing any outer binding.
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, value: Value) {
        self.scopes[scope.0].bindings.insert(name.into(), value);
    }

    /// Resolves `name` by walking parent links.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0];
            if let Some(value) = entry.bindings.get(name) {
                return Some(value.clone());
            }
            current = entry.parent;
        }
        None
    }

    /// Writes to the nearest existing binding of `name`.
    ///
    /// Returns false when no scope on the chain declares it.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id.0].bindings.contains_key(name) {
                self.scopes[id.0].bindings.insert(name.to_string(), value);
                return true;
            }
            current = self.scopes[id.0].parent;
        }
        false
    }

    /// The names declared directly in `scope`, without parents.
    pub fn local_names(&self, scope: ScopeId) -> Vec<String> {
        self.scopes[scope.0].bindings.keys().cloned().collect()
    }

    /// A binding declared directly in `scope`, without walking parents.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<Value> {
        self.scopes[scope.0].bindings.get(name).cloned()
    }
}
