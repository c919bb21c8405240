//! Static analysis for LML: scope construction, type checking, signature
//! validation and recursive module scanning.
//!
//! The entry point is [`Scanner`]; a successful scan guarantees that every
//! variable reference resolves, every call target is callable, and every
//! declaration's value matches its declared type.

mod compat;
mod context;
mod scanner;

pub use compat::{conversion_allowed, types_match};
pub use context::{ContextArena, ContextId, SymbolInfo};
pub use scanner::{ScanResult, Scanner};
