//! Object functions for the `objects` standard-library module.

use indexmap::IndexMap;
use lml_language::{Param, Signature, Type};

use super::{want_object, want_str, StdExport};
use crate::error::RuntimeError;
use crate::value::Value;

pub(super) fn exports() -> Vec<StdExport> {
    vec![
        StdExport::new(
            "keys",
            objects_keys,
            Signature::new(
                vec![Param::required("value", Type::Obj)],
                Type::array(Type::Str),
            ),
        ),
        StdExport::new(
            "values",
            objects_values,
            Signature::new(
                vec![Param::required("value", Type::Obj)],
                Type::array(Type::Unknown),
            ),
        ),
        StdExport::new(
            "has",
            objects_has,
            Signature::new(
                vec![
                    Param::required("value", Type::Obj),
                    Param::required("key", Type::Str),
                ],
                Type::Bool,
            ),
        ),
        StdExport::new(
            "merge",
            objects_merge,
            Signature::new(
                vec![
                    Param::required("a", Type::Obj),
                    Param::required("b", Type::Obj).describe("fields here win on collision"),
                ],
                Type::Obj,
            ),
        ),
        StdExport::new(
            "remove",
            objects_remove,
            Signature::new(
                vec![
                    Param::required("value", Type::Obj),
                    Param::required("key", Type::Str),
                ],
                Type::Obj,
            ),
        ),
    ]
}

/// Field names in insertion order.
fn objects_keys(args: &[Value]) -> Result<Value, RuntimeError> {
    let fields = want_object(args, 0, "objects.keys")?;
    Ok(Value::array(
        fields.keys().map(|k| Value::Str(k.clone())).collect(),
    ))
}

fn objects_values(args: &[Value]) -> Result<Value, RuntimeError> {
    let fields = want_object(args, 0, "objects.values")?;
    Ok(Value::array(fields.values().cloned().collect()))
}

fn objects_has(args: &[Value]) -> Result<Value, RuntimeError> {
    let fields = want_object(args, 0, "objects.has")?;
    let key = want_str(args, 1, "objects.has")?;
    Ok(Value::Bool(fields.contains_key(&key)))
}

fn objects_merge(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut merged = want_object(args, 0, "objects.merge")?;
    let overlay = want_object(args, 1, "objects.merge")?;
    for (key, value) in overlay {
        merged.insert(key, value);
    }
    Ok(Value::object(merged))
}

fn objects_remove(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut fields = want_object(args, 0, "objects.remove")?;
    let key = want_str(args, 1, "objects.remove")?;
    fields.shift_remove(&key);
    Ok(Value::object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Value::Int(1));
        fields.insert("b".to_string(), Value::Int(2));
        Value::object(fields)
    }

    #[test]
    fn keys_preserve_insertion_order() {
        let out = objects_keys(&[sample()]).expect("keys");
        assert_eq!(out.display_string(), "[a, b]");
    }

    #[test]
    fn merge_prefers_overlay_fields() {
        let mut overlay = IndexMap::new();
        overlay.insert("b".to_string(), Value::Int(9));
        let out = objects_merge(&[sample(), Value::object(overlay)]).expect("merges");
        assert_eq!(out.display_string(), "{ a: 1, b: 9 }");
    }

    #[test]
    fn remove_returns_a_new_object() {
        let original = sample();
        let out = objects_remove(&[original.clone(), Value::Str("a".into())]).expect("removes");
        assert_eq!(out.display_string(), "{ b: 2 }");
        assert_eq!(original.display_string(), "{ a: 1, b: 2 }");
    }

    #[test]
    fn has_checks_membership() {
        assert!(matches!(
            objects_has(&[sample(), Value::Str("a".into())]),
            Ok(Value::Bool(true))
        ));
        assert!(matches!(
            objects_has(&[sample(), Value::Str("z".into())]),
            Ok(Value::Bool(false))
        ));
    }
}
