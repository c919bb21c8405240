//! Sequence functions for the `arrays` standard-library module.

use lml_language::{Param, Signature, Type};

use super::{want_array, want_int, want_str, StdExport};
use crate::error::RuntimeError;
use crate::value::Value;

pub(super) fn exports() -> Vec<StdExport> {
    vec![
        StdExport::new(
            "length",
            arrays_length,
            Signature::new(
                vec![Param::required("values", Type::array(Type::Unknown))],
                Type::Int,
            ),
        ),
        StdExport::new(
            "join",
            arrays_join,
            Signature::new(
                vec![
                    Param::required("values", Type::array(Type::Unknown)),
                    Param::required("separator", Type::Str),
                ],
                Type::Str,
            ),
        ),
        StdExport::new(
            "reverse",
            arrays_reverse,
            Signature::new(
                vec![Param::required("values", Type::array(Type::Unknown))],
                Type::array(Type::Unknown),
            ),
        ),
        StdExport::new(
            "range",
            arrays_range,
            Signature::new(
                vec![
                    Param::required("start", Type::Int),
                    Param::required("end", Type::Int).describe("inclusive upper bound"),
                ],
                Type::array(Type::Int),
            ),
        ),
    ]
}

fn arrays_length(args: &[Value]) -> Result<Value, RuntimeError> {
    let values = want_array(args, 0, "arrays.length")?;
    Ok(Value::Int(values.len() as i64))
}

fn arrays_join(args: &[Value]) -> Result<Value, RuntimeError> {
    let values = want_array(args, 0, "arrays.join")?;
    let separator = want_str(args, 1, "arrays.join")?;
    let parts: Vec<String> = values.iter().map(|v| v.display_string()).collect();
    Ok(Value::Str(parts.join(&separator)))
}

fn arrays_reverse(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut values = want_array(args, 0, "arrays.reverse")?;
    values.reverse();
    Ok(Value::array(values))
}

fn arrays_range(args: &[Value]) -> Result<Value, RuntimeError> {
    let start = want_int(args, 0, "arrays.range")?;
    let end = want_int(args, 1, "arrays.range")?;
    let values: Vec<Value> = (start..=end).map(Value::Int).collect();
    Ok(Value::array(values))
}
