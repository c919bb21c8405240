//! Function signatures: declared parameter lists plus a return type.
//!
//! Signatures drive arity and argument checking. A parameter whose name
//! begins with `...` is rest-typed; at most one may appear and it must be
//! last. Optional parameters may be omitted at the call site.

use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub description: Option<String>,
}

impl Param {
    pub fn required(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
            description: None,
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Rest parameters absorb all remaining arguments.
    pub fn is_rest(&self) -> bool {
        self.name.starts_with("...")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub ret: Type,
}

impl Signature {
    pub fn new(params: Vec<Param>, ret: Type) -> Self {
        Self { params, ret }
    }

    /// Number of arguments a call must supply.
    pub fn min_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.optional && !p.is_rest())
            .count()
    }

    /// Number of arguments a call may supply; `None` with a rest parameter.
    pub fn max_args(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.is_rest()) {
            None
        } else {
            Some(self.params.len())
        }
    }

    /// Declared type for the argument at `index`, accounting for the rest
    /// parameter absorbing the tail.
    pub fn param_type_at(&self, index: usize) -> Option<&Type> {
        if let Some(param) = self.params.get(index) {
            return Some(&param.ty);
        }
        match self.params.last() {
            Some(last) if last.is_rest() => Some(&last.ty),
            _ => None,
        }
    }
}
