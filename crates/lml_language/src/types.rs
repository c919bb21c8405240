//! Type descriptors for the LML value model.
//!
//! A [`Type`] is either a primitive, a homogeneous `array<T>`, or a
//! structural object type with named fields. `unknown` is the top element:
//! it is compatible with every type in both directions, which is what lets
//! foreign-runtime results and partially-typed library calls flow through
//! the checker. `void` only ever appears as a function return type.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::ast::{TypeExpr, TypeExprKind};
use crate::signature::Signature;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Str,
    Int,
    Dbl,
    Bool,
    Obj,
    Nil,
    Func,
    Err,
    Unknown,
    Void,
    Array(Box<Type>),
    Struct {
        fields: IndexMap<String, Type>,
        signatures: HashMap<String, Signature>,
    },
}

impl Type {
    /// Structural object type without member signatures.
    pub fn structure(fields: IndexMap<String, Type>) -> Type {
        Type::Struct {
            fields,
            signatures: HashMap::new(),
        }
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Dbl)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Descriptor for a parsed type annotation.
    pub fn from_expr(expr: &TypeExpr) -> Type {
        match &expr.kind {
            TypeExprKind::Str => Type::Str,
            TypeExprKind::Int => Type::Int,
            TypeExprKind::Dbl => Type::Dbl,
            TypeExprKind::Bool => Type::Bool,
            TypeExprKind::Obj => Type::Obj,
            TypeExprKind::Nil => Type::Nil,
            TypeExprKind::Func => Type::Func,
            TypeExprKind::Void => Type::Void,
            TypeExprKind::Err => Type::Err,
            TypeExprKind::Unknown => Type::Unknown,
            TypeExprKind::Array(element) => Type::array(Type::from_expr(element)),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Str => write!(f, "str"),
            Type::Int => write!(f, "int"),
            Type::Dbl => write!(f, "dbl"),
            Type::Bool => write!(f, "bool"),
            Type::Obj => write!(f, "obj"),
            Type::Nil => write!(f, "nil"),
            Type::Func => write!(f, "func"),
            Type::Err => write!(f, "err"),
            Type::Unknown => write!(f, "unknown"),
            Type::Void => write!(f, "void"),
            Type::Array(element) => write!(f, "array<{}>", element),
            Type::Struct { fields, .. } => {
                write!(f, "{{ ")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, " }}")
            }
        }
    }
}
