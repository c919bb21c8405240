//! Standard library registry and root-scope built-ins.
//!
//! The registry is a read-only mapping `module name → export name →
//! {callable, signature}`, initialized once per process. The scanner reads
//! signatures for arity and type checking; the interpreter wraps the
//! callables into function values. The core never introspects callable
//! bodies.
//!
//! The root scope additionally carries `print` and the casting trio
//! `str` / `int` / `double` regardless of imports.

mod arrays;
mod math;
mod objects;
mod strings;

use std::collections::HashMap;

use indexmap::IndexMap;
use lml_language::{Param, Signature, Type};
use once_cell::sync::Lazy;

use crate::convert::convert_value;
use crate::error::RuntimeError;
use crate::value::{NativeFn, Value};

/// One standard-library export: its callable and declared signature.
pub struct StdExport {
    pub name: &'static str,
    pub func: NativeFn,
    pub signature: Signature,
}

impl StdExport {
    fn new(name: &'static str, func: NativeFn, signature: Signature) -> Self {
        Self {
            name,
            func,
            signature,
        }
    }
}

/// A standard-library module: ordered exports keyed by name.
pub struct StdModule {
    pub exports: IndexMap<&'static str, StdExport>,
}

impl StdModule {
    fn new(exports: Vec<StdExport>) -> Self {
        Self {
            exports: exports.into_iter().map(|e| (e.name, e)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&StdExport> {
        self.exports.get(name)
    }
}

static REGISTRY: Lazy<HashMap<&'static str, StdModule>> = Lazy::new(|| {
    let mut modules = HashMap::new();
    modules.insert("math", StdModule::new(math::exports()));
    modules.insert("strings", StdModule::new(strings::exports()));
    modules.insert("arrays", StdModule::new(arrays::exports()));
    modules.insert("objects", StdModule::new(objects::exports()));
    modules
});

/// The process-wide module registry; read-only after initialization.
pub fn registry() -> &'static HashMap<&'static str, StdModule> {
    &REGISTRY
}

pub fn module(name: &str) -> Option<&'static StdModule> {
    registry().get(name)
}

// ----------------------------------------------------------------------
// Root-scope built-ins
// ----------------------------------------------------------------------

static BUILTINS: Lazy<Vec<StdExport>> = Lazy::new(|| {
    vec![
        StdExport::new(
            "print",
            builtin_print,
            Signature::new(
                vec![Param::required("...values", Type::Unknown)
                    .describe("values to render, one line per call")],
                Type::Void,
            ),
        ),
        StdExport::new(
            "str",
            builtin_str,
            Signature::new(vec![Param::required("value", Type::Unknown)], Type::Str),
        ),
        StdExport::new(
            "int",
            builtin_int,
            Signature::new(vec![Param::required("value", Type::Unknown)], Type::Int),
        ),
        StdExport::new(
            "double",
            builtin_double,
            Signature::new(vec![Param::required("value", Type::Unknown)], Type::Dbl),
        ),
    ]
});

/// Built-ins pre-populated into every root scope.
pub fn builtins() -> &'static [StdExport] {
    &BUILTINS
}

/// Fallback for a detached `print` value; the interpreter intercepts
/// `print` calls to collect output, so this only runs when the function
/// value escapes that path.
fn builtin_print(args: &[Value]) -> Result<Value, RuntimeError> {
    for value in args {
        println!("{}", value.display_string());
    }
    Ok(Value::Nil)
}

fn builtin_str(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = single(args, "str")?;
    convert_value(value, &Type::Str)
}

fn builtin_int(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = single(args, "int")?;
    convert_value(value, &Type::Int)
}

fn builtin_double(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = single(args, "double")?;
    convert_value(value, &Type::Dbl)
}

// ----------------------------------------------------------------------
// Argument helpers for native functions
// ----------------------------------------------------------------------

fn single<'a>(args: &'a [Value], who: &str) -> Result<&'a Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::new(format!(
            "Invalid Argument Count: {}() expects 1 argument, got {}",
            who,
            args.len()
        )));
    }
    Ok(&args[0])
}

pub(crate) fn want_number(args: &[Value], index: usize, who: &str) -> Result<f64, RuntimeError> {
    let value = arg_at(args, index, who)?;
    value.as_number().ok_or_else(|| {
        RuntimeError::new(format!(
            "Invalid Argument: {} expected 'dbl', got '{}'",
            who,
            value.type_name()
        ))
    })
}

pub(crate) fn want_int(args: &[Value], index: usize, who: &str) -> Result<i64, RuntimeError> {
    let value = arg_at(args, index, who)?;
    value.as_int().ok_or_else(|| {
        RuntimeError::new(format!(
            "Invalid Argument: {} expected 'int', got '{}'",
            who,
            value.type_name()
        ))
    })
}

pub(crate) fn want_str(args: &[Value], index: usize, who: &str) -> Result<String, RuntimeError> {
    let value = arg_at(args, index, who)?;
    value.as_str().ok_or_else(|| {
        RuntimeError::new(format!(
            "Invalid Argument: {} expected 'str', got '{}'",
            who,
            value.type_name()
        ))
    })
}

pub(crate) fn want_array(
    args: &[Value],
    index: usize,
    who: &str,
) -> Result<Vec<Value>, RuntimeError> {
    let value = arg_at(args, index, who)?;
    match value.payload() {
        Value::Array(items) => Ok(items.borrow().clone()),
        other => Err(RuntimeError::new(format!(
            "Invalid Argument: {} expected 'array', got '{}'",
            who,
            other.type_name()
        ))),
    }
}

pub(crate) fn want_object(
    args: &[Value],
    index: usize,
    who: &str,
) -> Result<IndexMap<String, Value>, RuntimeError> {
    let value = arg_at(args, index, who)?;
    match value.payload() {
        Value::Object(fields) => Ok(fields.borrow().clone()),
        other => Err(RuntimeError::new(format!(
            "Invalid Argument: {} expected 'obj', got '{}'",
            who,
            other.type_name()
        ))),
    }
}

fn arg_at<'a>(args: &'a [Value], index: usize, who: &str) -> Result<&'a Value, RuntimeError> {
    args.get(index).ok_or_else(|| {
        RuntimeError::new(format!(
            "Invalid Argument Count: {} is missing argument {}",
            who,
            index + 1
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_expected_modules() {
        for name in ["math", "strings", "arrays", "objects"] {
            assert!(module(name).is_some(), "missing module {}", name);
        }
        assert!(module("nope").is_none());
    }

    #[test]
    fn builtin_casts_follow_conversion_rules() {
        let out = builtin_int(&[Value::Dbl(7.9)]).expect("casts");
        assert!(matches!(out, Value::Int(7)));

        let out = builtin_str(&[Value::Int(30)]).expect("casts");
        assert!(matches!(out, Value::Str(s) if s == "30"));

        let out = builtin_double(&[Value::Int(1)]).expect("casts");
        assert!(matches!(out, Value::Dbl(d) if d == 1.0));
    }

    #[test]
    fn builtin_signatures_type_the_casts() {
        let exports = builtins();
        let double = exports.iter().find(|e| e.name == "double").expect("double");
        assert_eq!(double.signature.ret, Type::Dbl);
        let print = exports.iter().find(|e| e.name == "print").expect("print");
        assert_eq!(print.signature.min_args(), 0);
        assert_eq!(print.signature.max_args(), None);
    }
}
