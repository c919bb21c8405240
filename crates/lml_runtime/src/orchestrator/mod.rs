//! Container orchestration: persistent foreign-runtime workers.
//!
//! The orchestrator owns one child process per configured container. Each
//! worker is a single-threaded request/reply loop speaking
//! newline-delimited JSON over its stdin, replying on stdout with
//! sentinel-prefixed lines:
//!
//! ```text
//! __READY__            once, when the worker can accept requests
//! __RESULT__<json>     after each successful request
//! __ERROR__<text>      after each failed request
//! ```
//!
//! Any other stdout line is informational and forwarded to the host's
//! stdout. At most one request is in flight per container; the evaluator
//! blocks on the reply, so host program order is preserved across
//! container calls.
//!
//! `init` prepares one workspace per runtime under `<project>/.lml/`
//! (dependency manifest, quiet package-manager install, worker script)
//! and then spawns and handshakes every configured worker; a failure
//! destroys whatever was already started.

mod spec;

pub use spec::{ContainerSpec, Dependency, RuntimeKind};

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;

/// How long `destroy` waits for a worker to exit before force-killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum ContainerError {
    /// `execute` against a name that was never configured.
    Unknown { container: String },
    Spawn { container: String, message: String },
    /// The worker exited or misbehaved before emitting `__READY__`.
    Ready { container: String, message: String },
    Install { runtime: String, message: String },
    /// The worker replied with `__ERROR__`.
    Execute { container: String, message: String },
    /// Malformed reply payload.
    Protocol { container: String, message: String },
    Io(String),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Unknown { container } => {
                write!(f, "Unknown Container: '{}' is not configured", container)
            }
            ContainerError::Spawn { container, message } => {
                write!(f, "Container '{}' failed to start: {}", container, message)
            }
            ContainerError::Ready { container, message } => {
                write!(f, "Container '{}' never became ready: {}", container, message)
            }
            ContainerError::Install { runtime, message } => {
                write!(f, "Dependency install for '{}' failed: {}", runtime, message)
            }
            ContainerError::Execute { container, message } => {
                write!(f, "Container '{}' reported an error: {}", container, message)
            }
            ContainerError::Protocol { container, message } => {
                write!(f, "Container '{}' broke protocol: {}", container, message)
            }
            ContainerError::Io(message) => write!(f, "Container I/O failed: {}", message),
        }
    }
}

impl std::error::Error for ContainerError {}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
    context: &'a serde_json::Map<String, serde_json::Value>,
}

/// Classification of one worker stdout line.
#[derive(Debug, PartialEq)]
enum Reply<'a> {
    Ready,
    Result(&'a str),
    Error(&'a str),
    Log(&'a str),
}

fn classify_reply(line: &str) -> Reply<'_> {
    if let Some(rest) = line.strip_prefix("__RESULT__") {
        Reply::Result(rest)
    } else if let Some(rest) = line.strip_prefix("__ERROR__") {
        Reply::Error(rest)
    } else if line == "__READY__" {
        Reply::Ready
    } else {
        Reply::Log(line)
    }
}

struct Container {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Owns the configured containers and their worker processes.
pub struct Orchestrator {
    project_root: PathBuf,
    containers: HashMap<String, Container>,
}

impl Orchestrator {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            containers: HashMap::new(),
        }
    }

    /// Prepares runtime workspaces and spawns every configured worker.
    ///
    /// Partially-initialized containers are destroyed when any container
    /// fails to become ready.
    pub fn init(&mut self, specs: &[ContainerSpec]) -> Result<(), ContainerError> {
        let mut grouped: IndexMap<RuntimeKind, Vec<&ContainerSpec>> = IndexMap::new();
        for spec in specs {
            grouped.entry(spec.runtime).or_default().push(spec);
        }
        for (runtime, group) in &grouped {
            self.prepare_workspace(*runtime, group)?;
        }

        for spec in specs {
            match self.spawn_worker(spec) {
                Ok(container) => {
                    self.containers.insert(spec.name.clone(), container);
                }
                Err(err) => {
                    self.destroy();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Sends one request to the named container and blocks for its reply.
    pub fn execute(
        &mut self,
        name: &str,
        code: &str,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ContainerError> {
        let container = self
            .containers
            .get_mut(name)
            .ok_or_else(|| ContainerError::Unknown {
                container: name.to_string(),
            })?;

        let request = ExecuteRequest {
            code,
            context: &context,
        };
        let mut line =
            serde_json::to_string(&request).map_err(|e| ContainerError::Io(e.to_string()))?;
        line.push('\n');
        container
            .stdin
            .write_all(line.as_bytes())
            .and_then(|_| container.stdin.flush())
            .map_err(|e| ContainerError::Io(e.to_string()))?;

        loop {
            let mut reply = String::new();
            let read = container
                .stdout
                .read_line(&mut reply)
                .map_err(|e| ContainerError::Io(e.to_string()))?;
            if read == 0 {
                return Err(ContainerError::Protocol {
                    container: name.to_string(),
                    message: "worker exited mid-request".to_string(),
                });
            }
            match classify_reply(reply.trim_end_matches(['\r', '\n'])) {
                Reply::Result(payload) => {
                    return serde_json::from_str(payload).map_err(|e| {
                        ContainerError::Protocol {
                            container: name.to_string(),
                            message: format!("bad result payload: {}", e),
                        }
                    });
                }
                Reply::Error(message) => {
                    return Err(ContainerError::Execute {
                        container: name.to_string(),
                        message: message.to_string(),
                    });
                }
                Reply::Ready => {}
                Reply::Log(text) => {
                    if !text.is_empty() {
                        println!("[{}] {}", container.name, text);
                    }
                }
            }
        }
    }

    /// Asks every worker to shut down, then force-kills stragglers after
    /// a grace period.
    pub fn destroy(&mut self) {
        for (_, container) in self.containers.drain() {
            let Container {
                mut child, stdin, ..
            } = container;
            {
                let mut stdin = stdin;
                let _ = stdin.write_all(b"{\"shutdown\": true}\n");
                let _ = stdin.flush();
                // Dropping stdin closes the pipe; workers also exit on EOF.
            }
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => break,
                    Ok(None) if Instant::now() >= deadline => {
                        let _ = child.kill();
                        let _ = child.wait();
                        break;
                    }
                    Ok(None) => std::thread::sleep(Duration::from_millis(25)),
                    Err(_) => break,
                }
            }
        }
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    fn workspace_dir(&self, runtime: RuntimeKind) -> PathBuf {
        self.project_root.join(".lml").join(runtime.dir_name())
    }

    fn prepare_workspace(
        &self,
        runtime: RuntimeKind,
        group: &[&ContainerSpec],
    ) -> Result<(), ContainerError> {
        let dir = self.workspace_dir(runtime);
        std::fs::create_dir_all(&dir).map_err(|e| ContainerError::Io(e.to_string()))?;

        // Containers sharing a runtime share its workspace; their
        // dependency declarations merge into one manifest.
        let mut dependencies: IndexMap<String, Option<String>> = IndexMap::new();
        for spec in group {
            for dep in &spec.dependencies {
                dependencies.insert(dep.name.clone(), dep.version.clone());
            }
        }

        if let Some((file, contents)) = runtime.manifest(&dependencies) {
            std::fs::write(dir.join(file), contents)
                .map_err(|e| ContainerError::Io(e.to_string()))?;
        }

        if !dependencies.is_empty() {
            if let Some(manager) = group.iter().find_map(|s| s.package_manager()) {
                install_dependencies(runtime, manager, &dir)?;
            }
        }

        std::fs::write(dir.join(runtime.worker_file()), runtime.worker_source())
            .map_err(|e| ContainerError::Io(e.to_string()))?;
        Ok(())
    }

    fn spawn_worker(&self, spec: &ContainerSpec) -> Result<Container, ContainerError> {
        let dir = self.workspace_dir(spec.runtime);
        let mut child = Command::new(spec.runtime.command())
            .arg(spec.runtime.worker_file())
            .current_dir(&dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ContainerError::Spawn {
                container: spec.name.clone(),
                message: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ContainerError::Spawn {
            container: spec.name.clone(),
            message: "no stdin pipe".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ContainerError::Spawn {
            container: spec.name.clone(),
            message: "no stdout pipe".to_string(),
        })?;
        let mut container = Container {
            name: spec.name.clone(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        wait_for_ready(&mut container)?;
        Ok(container)
    }
}

/// Blocks until the worker prints its `__READY__` marker.
fn wait_for_ready(container: &mut Container) -> Result<(), ContainerError> {
    loop {
        let mut line = String::new();
        let read = container
            .stdout
            .read_line(&mut line)
            .map_err(|e| ContainerError::Io(e.to_string()))?;
        if read == 0 {
            return Err(ContainerError::Ready {
                container: container.name.clone(),
                message: "worker exited before becoming ready".to_string(),
            });
        }
        match classify_reply(line.trim_end_matches(['\r', '\n'])) {
            Reply::Ready => return Ok(()),
            Reply::Log(text) => {
                if !text.is_empty() {
                    println!("[{}] {}", container.name, text);
                }
            }
            Reply::Error(message) => {
                return Err(ContainerError::Ready {
                    container: container.name.clone(),
                    message: message.to_string(),
                });
            }
            Reply::Result(_) => {
                return Err(ContainerError::Ready {
                    container: container.name.clone(),
                    message: "result before ready".to_string(),
                });
            }
        }
    }
}

fn install_dependencies(
    runtime: RuntimeKind,
    manager: &str,
    dir: &Path,
) -> Result<(), ContainerError> {
    let output = Command::new(manager)
        .args(runtime.install_args())
        .current_dir(dir)
        .output()
        .map_err(|e| ContainerError::Install {
            runtime: runtime.dir_name().to_string(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(ContainerError::Install {
            runtime: runtime.dir_name().to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_available() -> bool {
        Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn classify_reply_recognizes_sentinels() {
        assert_eq!(classify_reply("__READY__"), Reply::Ready);
        assert_eq!(classify_reply("__RESULT__{\"a\":1}"), Reply::Result("{\"a\":1}"));
        assert_eq!(classify_reply("__ERROR__boom"), Reply::Error("boom"));
        assert_eq!(classify_reply("plain output"), Reply::Log("plain output"));
    }

    #[test]
    fn execute_on_unknown_container_fails() {
        let mut orchestrator = Orchestrator::new("/tmp");
        let err = orchestrator
            .execute("nope", "1", serde_json::Map::new())
            .expect_err("should fail");
        assert!(matches!(err, ContainerError::Unknown { .. }));
    }

    #[test]
    fn workspace_layout_is_written_per_runtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let orchestrator = Orchestrator::new(dir.path());
        let mut spec = ContainerSpec::new("py", RuntimeKind::Python);
        spec.dependencies = vec![Dependency::new("requests", Some("2.31.0".to_string()))];

        // Manifest and worker script land without installing (no manager
        // invoked when we strip it).
        spec.package_manager = Some("true".to_string());
        orchestrator
            .prepare_workspace(RuntimeKind::Python, &[&spec])
            .expect("prepares");

        let workspace = dir.path().join(".lml").join("python");
        assert!(workspace.join("worker.py").exists());
        let manifest =
            std::fs::read_to_string(workspace.join("requirements.txt")).expect("manifest");
        assert_eq!(manifest, "requests==2.31.0\n");
    }

    #[test]
    fn python_container_round_trip_and_ordering() {
        if !python_available() {
            eprintln!("python3 not available, skipping");
            return;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        let mut orchestrator = Orchestrator::new(dir.path());
        orchestrator
            .init(&[ContainerSpec::new("py", RuntimeKind::Python)])
            .expect("init");

        let result = orchestrator
            .execute("py", "return \"ok\"", serde_json::Map::new())
            .expect("executes");
        assert_eq!(result, serde_json::json!("ok"));

        // Replies arrive in request order.
        for i in 0..5 {
            let mut context = serde_json::Map::new();
            context.insert("n".to_string(), serde_json::json!(i));
            let result = orchestrator
                .execute("py", "return n * 2", context)
                .expect("executes");
            assert_eq!(result, serde_json::json!(i * 2));
        }

        // Context values arrive as plain payloads.
        let mut context = serde_json::Map::new();
        context.insert("items".to_string(), serde_json::json!([1, 2, 3]));
        let result = orchestrator
            .execute("py", "return sum(items)", context)
            .expect("executes");
        assert_eq!(result, serde_json::json!(6));

        // Worker errors surface as execute errors, not protocol failures.
        let err = orchestrator
            .execute("py", "raise ValueError(\"nope\")", serde_json::Map::new())
            .expect_err("should fail");
        assert!(matches!(err, ContainerError::Execute { .. }));

        orchestrator.destroy();
        assert!(!orchestrator.has_container("py"));
    }
}
