//! Type compatibility and conversion validation rules.

use lml_language::Type;

/// Whether a value of type `actual` is acceptable where `expected` is
/// declared.
///
/// `unknown` matches anything in both directions; `obj` accepts any
/// structural object type; arrays match element-wise; structs match on
/// exact field names with matching field types. `int` never silently
/// widens to `dbl`.
pub fn types_match(expected: &Type, actual: &Type) -> bool {
    match (expected, actual) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Obj, Type::Obj)
        | (Type::Obj, Type::Struct { .. })
        | (Type::Struct { .. }, Type::Obj) => true,
        (Type::Array(a), Type::Array(b)) => types_match(a, b),
        (Type::Struct { fields: a, .. }, Type::Struct { fields: b, .. }) => {
            a.len() == b.len()
                && a.iter().all(|(name, ty)| {
                    b.get(name).map(|other| types_match(ty, other)).unwrap_or(false)
                })
        }
        (Type::Str, Type::Str)
        | (Type::Int, Type::Int)
        | (Type::Dbl, Type::Dbl)
        | (Type::Bool, Type::Bool)
        | (Type::Nil, Type::Nil)
        | (Type::Func, Type::Func)
        | (Type::Err, Type::Err)
        | (Type::Void, Type::Void) => true,
        _ => false,
    }
}

/// Static validity of `expr ~ T`.
///
/// Conversion to `void` is never legal; conversion to an array type
/// requires an array (or unknown) source. Everything else reinterprets
/// the payload and is checked at runtime.
pub fn conversion_allowed(from: &Type, to: &Type) -> bool {
    match to {
        Type::Void => false,
        Type::Array(_) => matches!(from, Type::Array(_) | Type::Unknown),
        _ => true,
    }
}
