//! Runtime type conversion (`expr ~ T` and the casting built-ins).
//!
//! Conversion reinterprets the payload behind the value's tag: strings via
//! text rendering, `int` via floor of the numeric view, `dbl` via numeric
//! coercion, `bool` via truthiness. Converting to `array<T>` converts each
//! element; non-arrays were already rejected by the scanner but fail here
//! too. All conversions are idempotent: converting a converted value to
//! the same target yields it unchanged.

use lml_language::Type;

use crate::error::RuntimeError;
use crate::value::Value;

pub fn convert_value(value: &Value, target: &Type) -> Result<Value, RuntimeError> {
    let payload = value.payload();
    match target {
        Type::Str => Ok(Value::Str(payload.display_string())),
        Type::Int => to_int(&payload).map(Value::Int),
        Type::Dbl => to_double(&payload).map(Value::Dbl),
        Type::Bool => Ok(Value::Bool(payload.is_truthy())),
        Type::Nil => Ok(Value::Nil),
        Type::Err => Ok(match payload {
            Value::Err(message) => Value::Err(message),
            other => Value::Err(other.display_string()),
        }),
        Type::Obj => match payload {
            Value::Object(_) => Ok(payload),
            other => Err(cannot_convert(&other, target)),
        },
        Type::Func => match payload {
            Value::Func(_) => Ok(payload),
            other => Err(cannot_convert(&other, target)),
        },
        Type::Unknown => Ok(Value::unknown(payload)),
        Type::Void => Err(RuntimeError::new(
            "Invalid Conversion: Cannot convert to 'void'",
        )),
        Type::Array(element) => match payload {
            Value::Array(items) => {
                let converted: Result<Vec<Value>, RuntimeError> = items
                    .borrow()
                    .iter()
                    .map(|item| convert_value(item, element))
                    .collect();
                Ok(Value::array(converted?))
            }
            other => Err(cannot_convert(&other, target)),
        },
        Type::Struct { .. } => match payload {
            Value::Object(_) => Ok(payload),
            other => Err(cannot_convert(&other, target)),
        },
    }
}

fn to_int(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Dbl(d) => Ok(d.floor() as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Nil => Ok(0),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(|d| d.floor() as i64)
            .map_err(|_| cannot_convert(value, &Type::Int)),
        other => Err(cannot_convert(other, &Type::Int)),
    }
}

fn to_double(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Dbl(d) => Ok(*d),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Nil => Ok(0.0),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| cannot_convert(value, &Type::Dbl)),
        other => Err(cannot_convert(other, &Type::Dbl)),
    }
}

fn cannot_convert(value: &Value, target: &Type) -> RuntimeError {
    RuntimeError::new(format!(
        "Invalid Conversion: Cannot convert '{}' to '{}'",
        value.type_name(),
        target
    ))
}
