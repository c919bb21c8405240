//! E2E: value semantics — equality, aliasing, display and conversions.

mod common;

use common::{assert_output, int_of, run_source};
use lml_runtime::Value;

// =============================================================================
// A. Equality
// =============================================================================

#[test]
fn e2e_equality_is_structural() {
    assert_output(
        "print([1, 2] == [1, 2]); print({ a: 1 } == { a: 1 }); print({ a: 1 } == { a: 2 }); print(\"x\" == \"x\"); print(1 != 2);",
        &["true", "true", "false", "true", "true"],
    );
}

#[test]
fn e2e_equality_never_crosses_incompatible_tags() {
    assert_output(
        "print(1 == \"1\"); print(true == 1); print([1] == { a: 1 });",
        &["false", "false", "false"],
    );
}

// =============================================================================
// B. Aliasing
// =============================================================================

#[test]
fn e2e_objects_are_shared_references() {
    let interpreter = run_source(
        "obj a = { n: 1 }; obj b = a; b.n = 9; int r = (a.n) ~ int;",
    );
    assert_eq!(int_of(&interpreter, "r"), 9);
}

#[test]
fn e2e_arrays_are_shared_references() {
    let interpreter = run_source(
        "array<int> xs = [1, 2]; array<int> ys = xs; ys[0] = 7; int r = xs[0];",
    );
    assert_eq!(int_of(&interpreter, "r"), 7);
}

#[test]
fn e2e_concatenation_builds_fresh_collections() {
    let interpreter = run_source(
        "array<int> xs = [1]; array<int> ys = xs + [2]; ys[0] = 9; int r = xs[0];",
    );
    assert_eq!(int_of(&interpreter, "r"), 1);
}

// =============================================================================
// C. Display
// =============================================================================

#[test]
fn e2e_display_of_nested_structures() {
    assert_output(
        "print({ name: \"lml\", tags: [1, 2], meta: { ok: true } });",
        &["{ name: lml, tags: [1, 2], meta: { ok: true } }"],
    );
}

#[test]
fn e2e_double_display_trims_trailing_zeros() {
    assert_output(
        "print(1.0); print(1.5); print(0.25); print(100.0 / 8.0);",
        &["1", "1.5", "0.25", "12.5"],
    );
}

// =============================================================================
// D. Conversions
// =============================================================================

#[test]
fn e2e_string_to_number_conversions() {
    let interpreter = run_source(
        "int a = \"42\" ~ int; int b = \" 7.9 \" ~ int; dbl c = \"2.5\" ~ dbl;",
    );
    assert_eq!(int_of(&interpreter, "a"), 42);
    assert_eq!(int_of(&interpreter, "b"), 7);
    assert!(matches!(
        interpreter.root_value("c"),
        Some(Value::Dbl(d)) if d == 2.5
    ));
}

#[test]
fn e2e_array_conversion_converts_elements() {
    assert_output(
        "array<str> out = [1, 2, 3] ~ array<str>; print(out); print(typeof out[0]);",
        &["[1, 2, 3]", "str"],
    );
}

#[test]
fn e2e_bool_conversion_uses_truthiness() {
    assert_output(
        "print(0 ~ bool); print(3 ~ bool); print(\"\" ~ bool); print(\"x\" ~ bool);",
        &["false", "true", "false", "true"],
    );
}

#[test]
fn e2e_failed_conversion_is_a_runtime_error() {
    let program = lml_language::parse("int n = \"abc\" ~ int;").expect("parses");
    let mut interpreter = lml_runtime::Interpreter::new();
    let err = interpreter.run(&program).expect_err("should fail");
    assert!(err.message.contains("Invalid Conversion"));
    assert!(err.span.is_some());
}

// =============================================================================
// E. Objects module
// =============================================================================

#[test]
fn e2e_objects_module_round_trip() {
    assert_output(
        "import { keys, has, merge, remove } from \"objects\";\nobj a = { x: 1, y: 2 };\nprint(keys(a));\nprint(has(a, \"x\"));\nprint(merge(a, { y: 9 }));\nprint(remove(a, \"x\"));",
        &["[x, y]", "true", "{ x: 1, y: 9 }", "{ y: 2 }"],
    );
}

#[test]
fn e2e_math_round_and_friends() {
    assert_output(
        "import math from \"math\";\nprint(math.round(2.5));\nprint(math.round(2.4));\nprint(math.abs(0 - 7));",
        &["3", "2", "7"],
    );
}
