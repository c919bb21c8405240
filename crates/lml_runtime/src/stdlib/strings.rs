//! Text functions for the `strings` standard-library module.

use lml_language::{Param, Signature, Type};

use super::{want_str, StdExport};
use crate::error::RuntimeError;
use crate::value::Value;

pub(super) fn exports() -> Vec<StdExport> {
    vec![
        StdExport::new(
            "upper",
            strings_upper,
            Signature::new(vec![Param::required("text", Type::Str)], Type::Str),
        ),
        StdExport::new(
            "lower",
            strings_lower,
            Signature::new(vec![Param::required("text", Type::Str)], Type::Str),
        ),
        StdExport::new(
            "trim",
            strings_trim,
            Signature::new(vec![Param::required("text", Type::Str)], Type::Str),
        ),
        StdExport::new(
            "split",
            strings_split,
            Signature::new(
                vec![
                    Param::required("text", Type::Str),
                    Param::required("separator", Type::Str),
                ],
                Type::array(Type::Str),
            ),
        ),
        StdExport::new(
            "contains",
            strings_contains,
            Signature::new(
                vec![
                    Param::required("text", Type::Str),
                    Param::required("search", Type::Str),
                ],
                Type::Bool,
            ),
        ),
        StdExport::new(
            "replace",
            strings_replace,
            Signature::new(
                vec![
                    Param::required("text", Type::Str),
                    Param::required("search", Type::Str),
                    Param::required("replacement", Type::Str),
                ],
                Type::Str,
            ),
        ),
        StdExport::new(
            "length",
            strings_length,
            Signature::new(
                vec![Param::required("text", Type::Str).describe("measured in characters")],
                Type::Int,
            ),
        ),
    ]
}

fn strings_upper(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Str(want_str(args, 0, "strings.upper")?.to_uppercase()))
}

fn strings_lower(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Str(want_str(args, 0, "strings.lower")?.to_lowercase()))
}

fn strings_trim(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Str(want_str(args, 0, "strings.trim")?.trim().to_string()))
}

fn strings_split(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = want_str(args, 0, "strings.split")?;
    let separator = want_str(args, 1, "strings.split")?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        text.split(&separator)
            .map(|p| Value::Str(p.to_string()))
            .collect()
    };
    Ok(Value::array(parts))
}

fn strings_contains(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = want_str(args, 0, "strings.contains")?;
    let search = want_str(args, 1, "strings.contains")?;
    Ok(Value::Bool(text.contains(&search)))
}

fn strings_replace(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = want_str(args, 0, "strings.replace")?;
    let search = want_str(args, 1, "strings.replace")?;
    let replacement = want_str(args, 2, "strings.replace")?;
    Ok(Value::Str(text.replace(&search, &replacement)))
}

fn strings_length(args: &[Value]) -> Result<Value, RuntimeError> {
    let text = want_str(args, 0, "strings.length")?;
    Ok(Value::Int(text.chars().count() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_by_separator_and_by_character() {
        let out = strings_split(&[Value::Str("a,b,c".into()), Value::Str(",".into())])
            .expect("splits");
        assert_eq!(out.display_string(), "[a, b, c]");

        let out = strings_split(&[Value::Str("ab".into()), Value::Str("".into())])
            .expect("splits");
        assert_eq!(out.display_string(), "[a, b]");
    }

    #[test]
    fn length_counts_characters() {
        let out = strings_length(&[Value::Str("héllo".into())]).expect("measures");
        assert!(matches!(out, Value::Int(5)));
    }

    #[test]
    fn replace_replaces_all_occurrences() {
        let out = strings_replace(&[
            Value::Str("a-b-c".into()),
            Value::Str("-".into()),
            Value::Str("+".into()),
        ])
        .expect("replaces");
        assert!(matches!(out, Value::Str(s) if s == "a+b+c"));
    }
}
