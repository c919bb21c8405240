//! Shared helpers for the end-to-end suites.

#![allow(dead_code)]

use lml_language::parse;
use lml_runtime::{Interpreter, ScanResult, Scanner, Value};

/// Scans a source string with no module loader.
pub fn scan_source(source: &str) -> ScanResult {
    let program = parse(source).expect("source should parse");
    Scanner::new().scan(&program)
}

/// Runs a source string through the full scan-then-interpret pipeline.
///
/// Panics when scanning reports errors, mirroring the host's rule that
/// the interpreter never runs on a dirty scan.
pub fn run_source(source: &str) -> Interpreter<'static> {
    let program = parse(source).expect("source should parse");
    let scan = Scanner::new().scan(&program);
    assert!(
        scan.is_clean(),
        "scan errors in test source: {:?}",
        scan.errors
    );
    let mut interpreter = Interpreter::new();
    interpreter.run(&program).expect("program should run");
    interpreter
}

/// Runs the source and asserts the exact `print` output lines.
pub fn assert_output(source: &str, expected: &[&str]) {
    let interpreter = run_source(source);
    assert_eq!(interpreter.output, expected, "source: {}", source);
}

pub fn int_of(interpreter: &Interpreter<'_>, name: &str) -> i64 {
    match interpreter.root_value(name) {
        Some(Value::Int(n)) => n,
        other => panic!("expected int binding '{}', got {:?}", name, other),
    }
}

pub fn dbl_of(interpreter: &Interpreter<'_>, name: &str) -> f64 {
    match interpreter.root_value(name) {
        Some(Value::Dbl(d)) => d,
        other => panic!("expected dbl binding '{}', got {:?}", name, other),
    }
}

pub fn str_of(interpreter: &Interpreter<'_>, name: &str) -> String {
    match interpreter.root_value(name) {
        Some(Value::Str(s)) => s,
        other => panic!("expected str binding '{}', got {:?}", name, other),
    }
}
