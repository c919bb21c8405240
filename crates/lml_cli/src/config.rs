//! Project configuration: `config.yml` / `config.yaml` in the project
//! root.
//!
//! ```yaml
//! entrypoint: main.lml
//!
//! containers:
//!   py:
//!     runtime: python
//!     dependencies:
//!       requests: "2.31.0"
//!   sh:
//!     runtime: bash
//! ```
//!
//! `dependencies` accepts either a version table (as above) or a plain
//! list of names; `packageManager` overrides the runtime's default.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use lml_runtime::{ContainerSpec, Dependency, RuntimeKind};

#[derive(Debug)]
pub enum ConfigError {
    NotFound(PathBuf),
    Io(String),
    Parse(String),
    UnknownRuntime { container: String, runtime: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(dir) => write!(
                f,
                "No config.yml or config.yaml found in '{}'",
                dir.display()
            ),
            ConfigError::Io(message) => write!(f, "Cannot read project config: {}", message),
            ConfigError::Parse(message) => write!(f, "Invalid project config: {}", message),
            ConfigError::UnknownRuntime { container, runtime } => write!(
                f,
                "Container '{}' names unknown runtime '{}' (expected nodejs, python or bash)",
                container, runtime
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    pub entrypoint: PathBuf,
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ContainerConfig {
    pub runtime: String,
    #[serde(default, rename = "packageManager", alias = "package_manager")]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub dependencies: Option<DependencySpec>,
}

/// Dependencies as either a bare name list or a name→version table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    List(Vec<String>),
    Table(BTreeMap<String, String>),
}

impl DependencySpec {
    fn to_dependencies(&self) -> Vec<Dependency> {
        match self {
            DependencySpec::List(names) => names
                .iter()
                .map(|name| Dependency::new(name.clone(), None))
                .collect(),
            DependencySpec::Table(entries) => entries
                .iter()
                .map(|(name, version)| Dependency::new(name.clone(), Some(version.clone())))
                .collect(),
        }
    }
}

impl ProjectConfig {
    /// Container specifications in name order.
    pub fn container_specs(&self) -> Result<Vec<ContainerSpec>, ConfigError> {
        let mut specs = Vec::new();
        for (name, container) in &self.containers {
            let runtime = RuntimeKind::from_name(&container.runtime).ok_or_else(|| {
                ConfigError::UnknownRuntime {
                    container: name.clone(),
                    runtime: container.runtime.clone(),
                }
            })?;
            let mut spec = ContainerSpec::new(name.clone(), runtime);
            spec.package_manager = container.package_manager.clone();
            spec.dependencies = container
                .dependencies
                .as_ref()
                .map(DependencySpec::to_dependencies)
                .unwrap_or_default();
            specs.push(spec);
        }
        Ok(specs)
    }
}

/// Loads `config.yml` (or `config.yaml`) from the project root.
pub fn load(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = ["config.yml", "config.yaml"]
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| ConfigError::NotFound(project_dir.to_path_buf()))?;

    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
    serde_yml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dependency_table() {
        let config: ProjectConfig = serde_yml::from_str(
            "entrypoint: main.lml\ncontainers:\n  py:\n    runtime: python\n    dependencies:\n      requests: \"2.31.0\"\n",
        )
        .expect("parses");
        let specs = config.container_specs().expect("specs");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].runtime, RuntimeKind::Python);
        assert_eq!(
            specs[0].dependencies,
            vec![Dependency::new("requests", Some("2.31.0".to_string()))]
        );
    }

    #[test]
    fn parses_dependency_list_and_manager_override() {
        let config: ProjectConfig = serde_yml::from_str(
            "entrypoint: main.lml\ncontainers:\n  js:\n    runtime: nodejs\n    packageManager: yarn\n    dependencies:\n      - left-pad\n      - lodash\n",
        )
        .expect("parses");
        let specs = config.container_specs().expect("specs");
        assert_eq!(specs[0].package_manager.as_deref(), Some("yarn"));
        assert_eq!(
            specs[0].dependencies,
            vec![
                Dependency::new("left-pad", None),
                Dependency::new("lodash", None),
            ]
        );
    }

    #[test]
    fn containers_are_optional() {
        let config: ProjectConfig =
            serde_yml::from_str("entrypoint: main.lml\n").expect("parses");
        assert!(config.containers.is_empty());
        assert!(config.container_specs().expect("specs").is_empty());
    }

    #[test]
    fn unknown_runtime_is_an_error() {
        let config: ProjectConfig = serde_yml::from_str(
            "entrypoint: main.lml\ncontainers:\n  rb:\n    runtime: ruby\n",
        )
        .expect("parses");
        let err = config.container_specs().expect_err("should fail");
        assert!(err.to_string().contains("unknown runtime 'ruby'"));
    }

    #[test]
    fn load_finds_both_spellings() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            load(dir.path()),
            Err(ConfigError::NotFound(_))
        ));

        fs::write(dir.path().join("config.yaml"), "entrypoint: app.lml\n").expect("write");
        let config = load(dir.path()).expect("loads");
        assert_eq!(config.entrypoint, PathBuf::from("app.lml"));
    }
}
