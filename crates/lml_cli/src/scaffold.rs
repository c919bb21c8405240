//! `lml init` — project skeleton scaffolding.

use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;

const CONFIG_TEMPLATE: &str = "entrypoint: main.lml

containers:
  py:
    runtime: python
";

const MAIN_TEMPLATE: &str = "int a = 10;
int b = 20;
print(a + b);

str hello = <py>return \"hello from python\"</py>;
print(hello);
";

pub fn init_project(name: &str) -> ExitCode {
    let dir = Path::new(name);
    if dir.exists() {
        eprintln!("'{}' already exists", name);
        return ExitCode::FAILURE;
    }
    match scaffold(dir) {
        Ok(()) => {
            println!("Created project '{}'", name);
            println!("  cd {} && lml run .", name);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Cannot scaffold '{}': {}", name, err);
            ExitCode::FAILURE
        }
    }
}

fn scaffold(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("config.yml"), CONFIG_TEMPLATE)?;
    fs::write(dir.join("main.lml"), MAIN_TEMPLATE)?;
    Ok(())
}
