//! Static analysis, interpretation and container orchestration for LML.
//!
//! The pipeline runs strictly leaves-first:
//!
//! ```text
//! source ──► lml-language (lexer + parser) ──► AST
//!                                    │
//!                                    ├──► analysis::Scanner ──► diagnostics + scope tables
//!                                    │
//!                                    └──► Interpreter ◄──► Orchestrator ◄──► Container{N}
//! ```
//!
//! The [`analysis::Scanner`] runs first and collects every error it can
//! find; the [`Interpreter`] only runs on a clean scan. Both resolve
//! imports through the same [`loader::ModuleLoader`] callback, and the
//! [`orchestrator::Orchestrator`] owns the persistent foreign-runtime
//! workers that evaluate embedded code blocks.

pub mod analysis;
pub mod convert;
pub mod error;
pub mod interpreter;
pub mod loader;
pub mod orchestrator;
pub mod scope;
pub mod stdlib;
pub mod value;

pub use analysis::{ScanResult, Scanner};
pub use convert::convert_value;
pub use error::RuntimeError;
pub use interpreter::Interpreter;
pub use loader::{fs_module_loader, ModuleLoader};
pub use orchestrator::{ContainerError, ContainerSpec, Dependency, Orchestrator, RuntimeKind};
pub use value::{FuncValue, Value};
