//! Container specifications: runtime kinds, dependencies and manifests.
//!
//! Each configured container names one of the supported foreign runtimes.
//! A runtime knows its worker command, the embedded worker script, its
//! default package manager and how to render a dependency manifest into
//! the runtime's workspace.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    NodeJs,
    Python,
    Bash,
}

impl RuntimeKind {
    pub fn from_name(name: &str) -> Option<RuntimeKind> {
        match name {
            "nodejs" => Some(RuntimeKind::NodeJs),
            "python" => Some(RuntimeKind::Python),
            "bash" => Some(RuntimeKind::Bash),
            _ => None,
        }
    }

    /// Workspace directory name under `<project>/.lml/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => "nodejs",
            RuntimeKind::Python => "python",
            RuntimeKind::Bash => "bash",
        }
    }

    /// Interpreter binary the worker runs under.
    pub fn command(self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => "node",
            RuntimeKind::Python => "python3",
            RuntimeKind::Bash => "bash",
        }
    }

    pub fn worker_file(self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => "worker.js",
            RuntimeKind::Python => "worker.py",
            RuntimeKind::Bash => "worker.sh",
        }
    }

    pub fn worker_source(self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => include_str!("../../workers/worker.js"),
            RuntimeKind::Python => include_str!("../../workers/worker.py"),
            RuntimeKind::Bash => include_str!("../../workers/worker.sh"),
        }
    }

    pub fn default_package_manager(self) -> Option<&'static str> {
        match self {
            RuntimeKind::NodeJs => Some("npm"),
            RuntimeKind::Python => Some("pip"),
            RuntimeKind::Bash => None,
        }
    }

    /// Quiet install invocation for the given manager, run inside the
    /// runtime workspace after the manifest is written.
    pub fn install_args(self) -> &'static [&'static str] {
        match self {
            RuntimeKind::NodeJs => &["install", "--silent"],
            RuntimeKind::Python => &["install", "-q", "-r", "requirements.txt"],
            RuntimeKind::Bash => &[],
        }
    }

    /// Dependency manifest file and contents, or `None` for runtimes
    /// without one.
    pub fn manifest(self, dependencies: &IndexMap<String, Option<String>>) -> Option<(&'static str, String)> {
        match self {
            RuntimeKind::NodeJs => {
                let mut deps = serde_json::Map::new();
                for (name, version) in dependencies {
                    let version = version.clone().unwrap_or_else(|| "latest".to_string());
                    deps.insert(name.clone(), serde_json::Value::String(version));
                }
                let manifest = serde_json::json!({
                    "name": "lml-workspace",
                    "private": true,
                    "dependencies": deps,
                });
                let contents = serde_json::to_string_pretty(&manifest).unwrap_or_default();
                Some(("package.json", contents))
            }
            RuntimeKind::Python => {
                let mut lines: Vec<String> = Vec::new();
                for (name, version) in dependencies {
                    match version {
                        Some(version) => lines.push(format!("{}=={}", name, version)),
                        None => lines.push(name.clone()),
                    }
                }
                let mut contents = lines.join("\n");
                contents.push('\n');
                Some(("requirements.txt", contents))
            }
            RuntimeKind::Bash => None,
        }
    }
}

/// One declared dependency; versionless entries install the latest.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// A configured container: a named worker of one runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub runtime: RuntimeKind,
    pub package_manager: Option<String>,
    pub dependencies: Vec<Dependency>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, runtime: RuntimeKind) -> Self {
        Self {
            name: name.into(),
            runtime,
            package_manager: None,
            dependencies: Vec::new(),
        }
    }

    pub fn package_manager(&self) -> Option<&str> {
        self.package_manager
            .as_deref()
            .or_else(|| self.runtime.default_package_manager())
    }
}
