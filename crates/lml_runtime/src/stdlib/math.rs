//! Numeric functions for the `math` standard-library module.

use lml_language::{Param, Signature, Type};

use super::{want_number, StdExport};
use crate::error::RuntimeError;
use crate::value::Value;

pub(super) fn exports() -> Vec<StdExport> {
    vec![
        StdExport::new(
            "abs",
            math_abs,
            Signature::new(vec![Param::required("value", Type::Unknown)], Type::Unknown),
        ),
        StdExport::new(
            "floor",
            math_floor,
            Signature::new(vec![Param::required("value", Type::Dbl)], Type::Int),
        ),
        StdExport::new(
            "ceil",
            math_ceil,
            Signature::new(vec![Param::required("value", Type::Dbl)], Type::Int),
        ),
        StdExport::new(
            "round",
            math_round,
            Signature::new(vec![Param::required("value", Type::Dbl)], Type::Int),
        ),
        StdExport::new(
            "sqrt",
            math_sqrt,
            Signature::new(vec![Param::required("value", Type::Dbl)], Type::Dbl),
        ),
        StdExport::new(
            "pow",
            math_pow,
            Signature::new(
                vec![
                    Param::required("base", Type::Dbl),
                    Param::required("exponent", Type::Dbl),
                ],
                Type::Dbl,
            ),
        ),
        StdExport::new(
            "min",
            math_min,
            Signature::new(
                vec![
                    Param::required("a", Type::Unknown),
                    Param::required("b", Type::Unknown),
                ],
                Type::Unknown,
            ),
        ),
        StdExport::new(
            "max",
            math_max,
            Signature::new(
                vec![
                    Param::required("a", Type::Unknown),
                    Param::required("b", Type::Unknown),
                ],
                Type::Unknown,
            ),
        ),
        StdExport::new(
            "random",
            math_random,
            Signature::new(vec![], Type::Dbl),
        ),
    ]
}

/// Keeps the numeric tag of its argument.
fn math_abs(args: &[Value]) -> Result<Value, RuntimeError> {
    match args.first().map(Value::payload) {
        Some(Value::Int(n)) => Ok(Value::Int(n.wrapping_abs())),
        Some(Value::Dbl(d)) => Ok(Value::Dbl(d.abs())),
        Some(other) => Err(RuntimeError::new(format!(
            "Invalid Argument: math.abs expected 'dbl', got '{}'",
            other.type_name()
        ))),
        None => Err(RuntimeError::new(
            "Invalid Argument Count: math.abs is missing argument 1",
        )),
    }
}

fn math_floor(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(want_number(args, 0, "math.floor")?.floor() as i64))
}

fn math_ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(want_number(args, 0, "math.ceil")?.ceil() as i64))
}

fn math_round(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(want_number(args, 0, "math.round")?.round() as i64))
}

fn math_sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Dbl(want_number(args, 0, "math.sqrt")?.sqrt()))
}

fn math_pow(args: &[Value]) -> Result<Value, RuntimeError> {
    let base = want_number(args, 0, "math.pow")?;
    let exponent = want_number(args, 1, "math.pow")?;
    Ok(Value::Dbl(base.powf(exponent)))
}

fn math_min(args: &[Value]) -> Result<Value, RuntimeError> {
    pick(args, "math.min", |a, b| a <= b)
}

fn math_max(args: &[Value]) -> Result<Value, RuntimeError> {
    pick(args, "math.max", |a, b| a >= b)
}

fn pick(args: &[Value], who: &str, keep_first: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    let a = want_number(args, 0, who)?;
    let b = want_number(args, 1, who)?;
    let winner = if keep_first(a, b) { 0 } else { 1 };
    Ok(args[winner].payload())
}

fn math_random(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Dbl(rand::random::<f64>()))
}
