//! E2E: relative module imports through both pipeline stages.

mod common;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use common::int_of;
use lml_language::parse;
use lml_runtime::{fs_module_loader, Interpreter, Scanner, Value};

/// Loader over a fixed in-memory module table that records every load.
struct FakeModules {
    modules: Vec<(&'static str, &'static str)>,
    loads: RefCell<Vec<String>>,
}

impl FakeModules {
    fn new(modules: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            modules,
            loads: RefCell::new(Vec::new()),
        }
    }

    fn load(&self, path: &str, _base: &Path) -> Option<String> {
        self.loads.borrow_mut().push(path.to_string());
        self.modules
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, source)| source.to_string())
    }

    fn load_count(&self, path: &str) -> usize {
        self.loads.borrow().iter().filter(|p| *p == path).count()
    }
}

#[test]
fn e2e_import_binds_exports_and_parses_module_once() {
    let modules = Rc::new(FakeModules::new(vec![("./a", "export int x = 5;")]));
    let loader = {
        let modules = modules.clone();
        move |path: &str, base: &Path| modules.load(path, base)
    };

    let source = "import { x } from \"./a\"; int y = x + 1;";
    let program = parse(source).expect("parses");

    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);
    assert_eq!(modules.load_count("./a"), 1);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "y"), 6);
    // One load per pipeline stage: the scanner's and the interpreter's.
    assert_eq!(modules.load_count("./a"), 2);
}

#[test]
fn e2e_module_cache_is_idempotent_within_a_stage() {
    let modules = Rc::new(FakeModules::new(vec![(
        "./counter",
        "export int value = 1;\nexport int twice = 2;",
    )]));
    let loader = {
        let modules = modules.clone();
        move |path: &str, base: &Path| modules.load(path, base)
    };

    let source = "import { value } from \"./counter\";\nimport { twice } from \"./counter\";\nint r = value + twice;";
    let program = parse(source).expect("parses");

    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);
    assert_eq!(modules.load_count("./counter"), 1);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(modules.load_count("./counter"), 2);
    assert_eq!(int_of(&interpreter, "r"), 3);
}

#[test]
fn e2e_import_aliases_and_default_form() {
    let modules = FakeModules::new(vec![(
        "./geo",
        "export int width = 3; export int height = 4;",
    )]);
    let loader = move |path: &str, base: &Path| modules.load(path, base);

    let source = "import { width as w, height } from \"./geo\";\nimport geo from \"./geo\";\nint area = w * height;\nint other = (geo.width + geo.height) ~ int;";
    let program = parse(source).expect("parses");

    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "area"), 12);
    assert_eq!(int_of(&interpreter, "other"), 7);
}

#[test]
fn e2e_exported_functions_travel_with_their_environment() {
    let modules = FakeModules::new(vec![(
        "./lib",
        "int base = 100;\nexport func shifted = (int v): int => v + base;",
    )]);
    let loader = move |path: &str, base: &Path| modules.load(path, base);

    let source = "import { shifted } from \"./lib\"; int r = shifted(1);";
    let program = parse(source).expect("parses");

    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "r"), 101);
}

#[test]
fn e2e_missing_export_is_an_error() {
    let modules = FakeModules::new(vec![("./a", "export int x = 5;")]);
    let loader = move |path: &str, base: &Path| modules.load(path, base);

    let program = parse("import { nope } from \"./a\";").expect("parses");
    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert_eq!(scan.errors.len(), 1);
    assert!(scan.errors[0]
        .message
        .contains("'nope' is not exported by './a'"));
}

#[test]
fn e2e_unexported_names_stay_private() {
    let modules = FakeModules::new(vec![("./a", "int secret = 1; export int shown = 2;")]);
    let loader = move |path: &str, base: &Path| modules.load(path, base);

    let program = parse("import { secret } from \"./a\";").expect("parses");
    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert_eq!(scan.errors.len(), 1);
    assert!(scan.errors[0].message.contains("not exported"));
}

#[test]
fn e2e_module_errors_are_reported_at_the_import() {
    let modules = FakeModules::new(vec![("./broken", "int x = \"not an int\";")]);
    let loader = move |path: &str, base: &Path| modules.load(path, base);

    let program = parse("import { x } from \"./broken\";").expect("parses");
    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert_eq!(scan.errors.len(), 1);
    let message = &scan.errors[0].message;
    assert!(message.contains("Module './broken' has 1 error(s)"));
    assert!(message.contains("Type Mismatch"));
    assert_eq!(scan.errors[0].span.start.line, 1);
}

#[test]
fn e2e_import_cycles_terminate() {
    let modules = Rc::new(FakeModules::new(vec![
        ("./a", "export int early = 1;\nimport { b } from \"./b\";\nexport int late = 2;"),
        ("./b", "import { early } from \"./a\";\nexport int b = 10;"),
    ]));
    let loader = {
        let modules = modules.clone();
        move |path: &str, base: &Path| modules.load(path, base)
    };

    let program = parse("import { early, late } from \"./a\"; int r = early + late;")
        .expect("parses");
    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);
    // Each module is scanned once despite the cycle.
    assert_eq!(modules.load_count("./a"), 1);
    assert_eq!(modules.load_count("./b"), 1);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "r"), 3);
}

#[test]
fn e2e_nested_relative_imports_resolve_against_the_module() {
    let modules = FakeModules::new(vec![
        ("./sub/outer", "import { inner } from \"./inner\";\nexport int outer = inner + 1;"),
        ("./inner", "export int inner = 41;"),
    ]);
    // Nested resolution happens lexically: ./inner inside ./sub/outer is
    // /proj/sub/inner.
    let loader = move |path: &str, base: &Path| {
        if base.ends_with("sub") && path == "./inner" {
            Some("export int inner = 41;".to_string())
        } else {
            modules.load(path, base)
        }
    };

    let program =
        parse("import { outer } from \"./sub/outer\"; int r = outer;").expect("parses");
    let scan = Scanner::with_loader(&loader, "/proj").scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);

    let mut interpreter = Interpreter::new().with_loader(&loader, "/proj");
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "r"), 42);
}

#[test]
fn e2e_filesystem_loader_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.lml"), "export int x = 5;").expect("write a");
    std::fs::write(
        dir.path().join("b.lml"),
        "import { x } from \"./a\"; int y = x + 1;",
    )
    .expect("write b");

    let source = std::fs::read_to_string(dir.path().join("b.lml")).expect("read");
    let program = parse(&source).expect("parses");

    let loader: &lml_runtime::ModuleLoader = &fs_module_loader;
    let scan = Scanner::with_loader(loader, dir.path()).scan(&program);
    assert!(scan.is_clean(), "errors: {:?}", scan.errors);

    let mut interpreter = Interpreter::new().with_loader(loader, dir.path());
    interpreter.run(&program).expect("runs");
    assert_eq!(int_of(&interpreter, "y"), 6);
    assert!(matches!(interpreter.root_value("x"), Some(Value::Int(5))));
}
