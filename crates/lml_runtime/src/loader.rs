//! Module loading callback shared by the scanner and the interpreter.
//!
//! The embedder supplies a function `(import_path, base_dir) -> source`;
//! returning `None` signals "not found". Both pipeline stages resolve the
//! same import through the same loader, so a module seen by the scanner is
//! the module the interpreter executes.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Loader callback: import path and importing module's directory to source.
pub type ModuleLoader = dyn Fn(&str, &Path) -> Option<String>;

/// Filesystem loader: resolves `import_path` relative to `base_dir`,
/// appending the `.lml` extension when the path has none.
pub fn fs_module_loader(import_path: &str, base_dir: &Path) -> Option<String> {
    let mut path = base_dir.join(import_path);
    if path.extension().is_none() {
        path.set_extension("lml");
    }
    fs::read_to_string(path).ok()
}

/// Cache key for a module: the lexically-normalized join of the importing
/// directory and the import path. Normalization resolves `.` and `..`
/// without touching the filesystem, so the scanner and interpreter agree
/// on identity even under a non-filesystem loader.
pub fn module_key(import_path: &str, base_dir: &Path) -> String {
    normalize(&base_dir.join(import_path)).display().to_string()
}

/// Directory future relative imports of this module resolve against.
pub fn module_base_dir(import_path: &str, base_dir: &Path) -> PathBuf {
    let joined = normalize(&base_dir.join(import_path));
    joined.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match parts.last() {
                    Some(Component::Normal(_)) => {
                        parts.pop();
                    }
                    _ => parts.push(component),
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}
