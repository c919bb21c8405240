//! Scanner contexts: the static mirror of the interpreter's scopes.
//!
//! A context maps names to type descriptors and, for functions, their
//! signatures. Contexts live in an arena keyed by integer id with parent
//! links, forming the same lexical tree the interpreter's environments
//! will form at runtime. Each context remembers the source range it
//! covers, which is what makes position queries for editor tooling
//! possible.

use std::collections::HashMap;

use lml_language::{Pos, Signature, Span, Type};

/// Index of a context in its [`ContextArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

/// A declared name: its type and, for functions, the known signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub ty: Type,
    pub signature: Option<Signature>,
}

impl SymbolInfo {
    pub fn of(ty: Type) -> Self {
        Self {
            ty,
            signature: None,
        }
    }

    pub fn function(signature: Signature) -> Self {
        Self {
            ty: Type::Func,
            signature: Some(signature),
        }
    }
}

#[derive(Debug)]
struct Context {
    parent: Option<ContextId>,
    span: Span,
    /// Contexts from imported modules carry positions of other files and
    /// are excluded from position queries.
    queryable: bool,
    symbols: HashMap<String, SymbolInfo>,
}

#[derive(Debug, Default)]
pub struct ContextArena {
    contexts: Vec<Context>,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_root(&mut self, span: Span, queryable: bool) -> ContextId {
        self.contexts.push(Context {
            parent: None,
            span,
            queryable,
            symbols: HashMap::new(),
        });
        ContextId(self.contexts.len() - 1)
    }

    pub fn push_child(&mut self, parent: ContextId, span: Span) -> ContextId {
        let queryable = self.contexts[parent.0].queryable;
        self.contexts.push(Context {
            parent: Some(parent),
            span,
            queryable,
            symbols: HashMap::new(),
        });
        ContextId(self.contexts.len() - 1)
    }

    pub fn define(&mut self, ctx: ContextId, name: impl Into<String>, info: SymbolInfo) {
        self.contexts[ctx.0].symbols.insert(name.into(), info);
    }

    /// Resolves a name by walking parent links.
    pub fn lookup(&self, ctx: ContextId, name: &str) -> Option<&SymbolInfo> {
        let mut current = Some(ctx);
        while let Some(id) = current {
            let context = &self.contexts[id.0];
            if let Some(info) = context.symbols.get(name) {
                return Some(info);
            }
            current = context.parent;
        }
        None
    }

    /// Names declared directly in `ctx`.
    pub fn symbols_in(&self, ctx: ContextId) -> impl Iterator<Item = (&String, &SymbolInfo)> {
        self.contexts[ctx.0].symbols.iter()
    }

    pub fn parent(&self, ctx: ContextId) -> Option<ContextId> {
        self.contexts[ctx.0].parent
    }

    /// Innermost queryable context whose range contains `pos`.
    ///
    /// Used by editor tooling for completion and hover.
    pub fn scope_at(&self, pos: Pos) -> Option<ContextId> {
        let mut best: Option<(usize, ContextId)> = None;
        for (index, context) in self.contexts.iter().enumerate() {
            if !context.queryable || !context.span.contains(pos) {
                continue;
            }
            let id = ContextId(index);
            let depth = self.depth(id);
            if best.map(|(d, _)| depth >= d).unwrap_or(true) {
                best = Some((depth, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn depth(&self, ctx: ContextId) -> usize {
        let mut depth = 0;
        let mut current = self.contexts[ctx.0].parent;
        while let Some(id) = current {
            depth += 1;
            current = self.contexts[id.0].parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(l1: u32, c1: u32, l2: u32, c2: u32) -> Span {
        Span::new(Pos::new(l1, c1), Pos::new(l2, c2))
    }

    #[test]
    fn lookup_walks_parents() {
        let mut arena = ContextArena::new();
        let root = arena.push_root(span(1, 1, 9, 1), true);
        let inner = arena.push_child(root, span(2, 1, 4, 1));
        arena.define(root, "x", SymbolInfo::of(Type::Int));

        assert_eq!(arena.lookup(inner, "x").map(|s| &s.ty), Some(&Type::Int));
        assert!(arena.lookup(inner, "y").is_none());
    }

    #[test]
    fn scope_at_picks_innermost() {
        let mut arena = ContextArena::new();
        let root = arena.push_root(span(1, 1, 10, 1), true);
        let block = arena.push_child(root, span(2, 1, 5, 1));
        let nested = arena.push_child(block, span(3, 1, 4, 1));

        assert_eq!(arena.scope_at(Pos::new(3, 5)), Some(nested));
        assert_eq!(arena.scope_at(Pos::new(2, 2)), Some(block));
        assert_eq!(arena.scope_at(Pos::new(8, 1)), Some(root));
        assert_eq!(arena.scope_at(Pos::new(99, 1)), None);
    }

    #[test]
    fn module_contexts_are_not_queryable() {
        let mut arena = ContextArena::new();
        let root = arena.push_root(span(1, 1, 10, 1), true);
        let module_root = arena.push_root(span(1, 1, 50, 1), false);
        let module_block = arena.push_child(module_root, span(2, 1, 5, 1));

        // Positions inside the module's ranges resolve to the entry file.
        assert_eq!(arena.scope_at(Pos::new(2, 2)), Some(root));
        let _ = module_block;
    }
}
