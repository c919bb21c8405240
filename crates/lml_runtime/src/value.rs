//! Runtime values for LML programs.
//!
//! A [`Value`] is a discriminated union whose tag is authoritative: the
//! interpreter never infers a value's kind from its payload shape. Arrays
//! and objects are shared mutable (`Rc<RefCell<...>>`) so that member and
//! index assignment observe aliasing, and objects keep insertion order.
//!
//! Results returned from foreign containers cross the boundary as decoded
//! JSON payloads wrapped in the `Unknown` tag; operations on them unwrap
//! the payload and proceed permissively.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use lml_language::ast::LambdaExpr;

use crate::error::RuntimeError;
use crate::scope::ScopeId;

/// Native function callable from LML code.
pub type NativeFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// A function value: a user lambda with its captured environment, or a
/// native standard-library function.
#[derive(Debug)]
pub enum FuncValue {
    Lambda { def: Rc<LambdaExpr>, env: ScopeId },
    Native { name: &'static str, func: NativeFn },
}

#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Dbl(f64),
    Bool(bool),
    Nil,
    /// Opaque error value carrying its message.
    Err(String),
    Func(Rc<FuncValue>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<IndexMap<String, Value>>>),
    /// Foreign-runtime result: the payload is a decoded host value, the
    /// tag stays `unknown`.
    Unknown(Rc<Value>),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn object(fields: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    pub fn unknown(payload: Value) -> Value {
        Value::Unknown(Rc::new(payload))
    }

    /// The value's tag name, as reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Dbl(_) => "dbl",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Err(_) => "err",
            Value::Func(_) => "func",
            Value::Array(_) => "array",
            Value::Object(_) => "obj",
            Value::Unknown(_) => "unknown",
        }
    }

    /// The payload behind an `unknown` wrapper, or the value itself.
    pub fn payload(&self) -> Value {
        match self {
            Value::Unknown(inner) => inner.as_ref().clone(),
            other => other.clone(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Dbl(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Nil => false,
            Value::Err(_) => false,
            Value::Func(_) => true,
            Value::Array(_) => true,
            Value::Object(_) => true,
            Value::Unknown(inner) => inner.is_truthy(),
        }
    }

    /// Numeric view accepting `int`, `dbl` and unknown-wrapped numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Dbl(d) => Some(*d),
            Value::Unknown(inner) => inner.as_number(),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Unknown(inner) => inner.as_int(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Unknown(inner) => inner.as_str(),
            _ => None,
        }
    }

    /// Human-readable rendering used by `print` and string conversion.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Dbl(d) => format_double(*d),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Nil => "nil".to_string(),
            Value::Err(message) => format!("error: {}", message),
            Value::Func(_) => "<func>".to_string(),
            Value::Array(elements) => {
                let parts: Vec<String> =
                    elements.borrow().iter().map(|v| v.display_string()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Object(fields) => {
                if fields.borrow().is_empty() {
                    return "{}".to_string();
                }
                let parts: Vec<String> = fields
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.display_string()))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Value::Unknown(inner) => inner.display_string(),
        }
    }

    /// Structural equality; `unknown` wrappers compare by payload and
    /// numbers compare numerically across `int`/`dbl`.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unknown(a), b) => a.equals(b),
            (a, Value::Unknown(b)) => a.equals(b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Err(a), Value::Err(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.equals(w)).unwrap_or(false))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            },
        }
    }

    /// Serializes the payload for the container context envelope.
    ///
    /// Tags are discarded; functions have no JSON form and serialize as
    /// null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Dbl(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Nil => serde_json::Value::Null,
            Value::Err(message) => serde_json::Value::String(message.clone()),
            Value::Func(_) => serde_json::Value::Null,
            Value::Array(elements) => serde_json::Value::Array(
                elements.borrow().iter().map(|v| v.to_json()).collect(),
            ),
            Value::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields.borrow().iter() {
                    map.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
            Value::Unknown(inner) => inner.to_json(),
        }
    }

    /// Decodes a JSON payload into the natural host value shape.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Dbl(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut fields = IndexMap::new();
                for (k, v) in map {
                    fields.insert(k.clone(), Value::from_json(v));
                }
                Value::object(fields)
            }
        }
    }
}

/// Renders a double the way the host prints numbers: six digits of
/// precision with trailing zeros trimmed.
fn format_double(d: f64) -> String {
    if !d.is_finite() {
        return d.to_string();
    }
    format!("{:.6}", d)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_tags() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::unknown(Value::Str("x".into())).type_name(), "unknown");
        assert_eq!(Value::array(vec![]).type_name(), "array");
    }

    #[test]
    fn display_formats_doubles_trimmed() {
        assert_eq!(Value::Dbl(3.14).display_string(), "3.14");
        assert_eq!(Value::Dbl(4.0).display_string(), "4");
        assert_eq!(Value::Dbl(0.5).display_string(), "0.5");
    }

    #[test]
    fn display_renders_collections() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Value::Int(1));
        fields.insert("b".to_string(), Value::Str("two".into()));
        let obj = Value::object(fields);
        assert_eq!(obj.display_string(), "{ a: 1, b: two }");

        let arr = Value::array(vec![Value::Int(1), Value::Dbl(2.5)]);
        assert_eq!(arr.display_string(), "[1, 2.5]");
    }

    #[test]
    fn equality_unwraps_unknown_and_crosses_numerics() {
        assert!(Value::Int(1).equals(&Value::Dbl(1.0)));
        assert!(Value::unknown(Value::Str("ok".into())).equals(&Value::Str("ok".into())));
        assert!(!Value::Nil.equals(&Value::Int(0)));
    }

    #[test]
    fn json_round_trip_preserves_payload_shape() {
        let mut fields = IndexMap::new();
        fields.insert("n".to_string(), Value::Int(3));
        fields.insert("xs".to_string(), Value::array(vec![Value::Bool(true), Value::Nil]));
        let value = Value::object(fields);

        let json = value.to_json();
        let back = Value::from_json(&json);
        assert!(value.equals(&back));
    }

    #[test]
    fn unknown_serializes_as_payload() {
        let value = Value::unknown(Value::Int(7));
        assert_eq!(value.to_json(), serde_json::json!(7));
    }
}
