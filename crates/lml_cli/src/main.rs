//! `lml` — run LML projects and scaffold new ones.
//!
//! `lml run <path>` reads the project config, parses the entrypoint, scans
//! it, and on a clean scan starts the configured containers and
//! interprets the program. Scan failures render one diagnostic block per
//! error and are also written, ANSI-stripped, to `.lml/logs/latest.txt`.
//! Exit code is 0 on success and 1 on any reported error.

mod config;
mod scaffold;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use lml_language::{parse, strip_ansi};
use lml_runtime::loader::ModuleLoader;
use lml_runtime::{fs_module_loader, Interpreter, Orchestrator, Scanner};

#[derive(Parser)]
#[command(name = "lml", version, about = "Interpreter for the LML language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the project in the given directory
    Run {
        /// Project directory containing config.yml
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Scaffold a new project skeleton
    Init {
        /// Name of the project directory to create
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path } => run_project(&path),
        Commands::Init { name } => scaffold::init_project(&name),
    }
}

fn run_project(project_dir: &Path) -> ExitCode {
    let config = match config::load(project_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let entry_path = project_dir.join(&config.entrypoint);
    let source = match fs::read_to_string(&entry_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read entrypoint '{}': {}", entry_path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let program = match parse(&source) {
        Ok(program) => program,
        Err(diag) => {
            eprint!("{}", diag.render(&source));
            return ExitCode::FAILURE;
        }
    };

    let base_dir = entry_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let loader: &ModuleLoader = &fs_module_loader;

    let scan = Scanner::with_loader(loader, &base_dir).scan(&program);
    if !scan.is_clean() {
        let mut report = String::new();
        for diag in &scan.errors {
            let block = diag.render(&source);
            eprint!("{}", block);
            report.push_str(&block);
            report.push('\n');
        }
        write_scan_log(project_dir, &report);
        return ExitCode::FAILURE;
    }

    let specs = match config.container_specs() {
        Ok(specs) => specs,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut orchestrator = Orchestrator::new(project_dir);
    if let Err(err) = orchestrator.init(&specs) {
        eprintln!("{}", err);
        orchestrator.destroy();
        return ExitCode::FAILURE;
    }

    let outcome = {
        let mut interpreter = Interpreter::new()
            .with_echo(true)
            .with_loader(loader, &base_dir)
            .with_orchestrator(&mut orchestrator);
        interpreter.run(&program)
    };
    orchestrator.destroy();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.into_diagnostic().render(&source));
            ExitCode::FAILURE
        }
    }
}

/// Plain-text scan report under `<project>/.lml/logs/latest.txt`.
fn write_scan_log(project_dir: &Path, report: &str) {
    let log_dir = project_dir.join(".lml").join("logs");
    if let Err(err) = fs::create_dir_all(&log_dir) {
        eprintln!("Cannot create log directory: {}", err);
        return;
    }
    if let Err(err) = fs::write(log_dir.join("latest.txt"), strip_ansi(report)) {
        eprintln!("Cannot write scan log: {}", err);
    }
}
