//! External command port and the kubectl implementation
//!
//! All control-plane verbs (apply, list, delete) go through
//! [`CommandRunner`], so targets can be exercised against
//! [`MockCommandRunner`] without a cluster.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use appdeploy_core::Manifest;

use crate::connection::ConnectionConfig;
use crate::error::{KubeError, Result};

/// Environment variable overriding the kubectl binary
pub const KUBECTL_ENV: &str = "KUBECTL";

/// Runs one external command invocation
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with `args`, feeding `stdin` if given; returns captured stdout
    async fn run(&self, stdin: Option<&[u8]>, args: &[String]) -> Result<String>;
}

/// kubectl invoked as a child process
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    connection: ConnectionConfig,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

impl Kubectl {
    /// kubectl from `$KUBECTL` or `PATH`
    pub fn new(connection: ConnectionConfig) -> Self {
        let binary = std::env::var_os(KUBECTL_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("kubectl"));
        Self { binary, connection }
    }

    /// Use a specific kubectl binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    fn command_error(&self, args: &[String], message: impl Into<String>) -> KubeError {
        KubeError::Command {
            program: self.binary.display().to_string(),
            command: args.join(" "),
            message: message.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for Kubectl {
    async fn run(&self, stdin: Option<&[u8]>, args: &[String]) -> Result<String> {
        tracing::debug!(command = %args.join(" "), "running kubectl");

        let mut child = Command::new(&self.binary)
            .args(self.connection.kubectl_args())
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.command_error(args, e.to_string()))?;

        // Feed stdin concurrently so a chatty child cannot block on a full pipe
        let writer = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => {
                let data = data.to_vec();
                Some(tokio::spawn(async move {
                    pipe.write_all(&data).await?;
                    pipe.shutdown().await
                }))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.command_error(args, e.to_string()))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if output.status.success() => {
                    return Err(self.command_error(args, format!("writing stdin: {}", e)));
                }
                Ok(Err(_)) => {}
                Err(e) => return Err(KubeError::TaskPanicked(e.to_string())),
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.command_error(
                args,
                format!("{}, {}{}", output.status, stdout, stderr).trim_end(),
            ));
        }

        Ok(stdout)
    }
}

/// A recorded invocation of [`MockCommandRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct MockState {
    /// Live objects as `(lowercase kind, name)`
    resources: BTreeSet<(String, String)>,
    calls: Vec<RecordedCall>,
    /// Verbs or args substrings that fail
    failures: Vec<String>,
}

/// In-memory stand-in for kubectl
///
/// Understands `apply -f -`, `get <kind> -o name`, `get <kind>/<name> -o name`
/// and `delete <ref>`, ignoring a leading `--namespace <ns>`. Listing prints
/// group-qualified names for kinds that have a group (`deployment.apps/web`),
/// like the real thing.
#[derive(Debug, Clone, Default)]
pub struct MockCommandRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate live objects
    pub fn with_resources(self, resources: &[Manifest]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for m in resources {
                state.resources.insert((m.kind_key(), m.name.clone()));
            }
        }
        self
    }

    /// Fail every invocation whose joined args contain `pattern`
    pub fn fail_on(self, pattern: impl Into<String>) -> Self {
        self.state.lock().unwrap().failures.push(pattern.into());
        self
    }

    /// Live objects, sorted
    pub fn resources(&self) -> Vec<Manifest> {
        self.state
            .lock()
            .unwrap()
            .resources
            .iter()
            .map(|(kind, name)| Manifest::new(kind.clone(), name.clone()))
            .collect()
    }

    /// Every invocation so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn group_suffix(kind: &str) -> &'static str {
        match kind {
            "deployment" | "statefulset" | "daemonset" | "replicaset" => ".apps",
            "cronjob" | "job" => ".batch",
            _ => "",
        }
    }

    fn failure(args: &[String], message: &str) -> KubeError {
        KubeError::Command {
            program: "kubectl".to_string(),
            command: args.join(" "),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, stdin: Option<&[u8]>, args: &[String]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            args: args.to_vec(),
            stdin: stdin.map(<[u8]>::to_vec),
        });

        let joined = args.join(" ");
        if state.failures.iter().any(|f| joined.contains(f.as_str())) {
            return Err(Self::failure(args, "exit status: 1, injected failure"));
        }

        let verb: Vec<&str> = match args {
            [flag, _, rest @ ..] if flag == "--namespace" => {
                rest.iter().map(String::as_str).collect()
            }
            _ => args.iter().map(String::as_str).collect(),
        };

        match verb.as_slice() {
            ["apply", "-f", "-"] => {
                let data = stdin.ok_or_else(|| Self::failure(args, "no objects passed to apply"))?;
                let manifest = appdeploy_engine::identify("stdin", data)
                    .map_err(|e| Self::failure(args, &e.to_string()))?;
                let created = state
                    .resources
                    .insert((manifest.kind_key(), manifest.name.clone()));
                let action = if created { "created" } else { "configured" };
                Ok(format!("{} {}\n", manifest.cluster_ref(), action))
            }
            ["get", what, "-o", "name", flags @ ..] => {
                if let Some(wanted) = Manifest::from_cluster_ref(what) {
                    let key = (wanted.kind_key(), wanted.name.clone());
                    if state.resources.contains(&key) {
                        return Ok(format!("{}\n", wanted.cluster_ref()));
                    }
                    if flags.contains(&"--ignore-not-found") {
                        return Ok(String::new());
                    }
                    return Err(Self::failure(args, "exit status: 1, NotFound"));
                }

                let kind = what.to_lowercase();
                let suffix = Self::group_suffix(&kind);
                Ok(state
                    .resources
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(k, name)| format!("{}{}/{}\n", k, suffix, name))
                    .collect())
            }
            ["delete", what, ..] => {
                let target = Manifest::from_cluster_ref(what)
                    .ok_or_else(|| Self::failure(args, "invalid resource reference"))?;
                if state
                    .resources
                    .remove(&(target.kind_key(), target.name.clone()))
                {
                    Ok(format!("{} deleted\n", target.cluster_ref()))
                } else {
                    Err(Self::failure(args, "exit status: 1, NotFound"))
                }
            }
            _ => Err(Self::failure(args, "unsupported command")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mock_apply_get_delete() {
        let runner = MockCommandRunner::new();
        let doc = b"kind: Deployment\nmetadata:\n  name: web\n";

        let out = runner
            .run(Some(doc), &args(&["--namespace", "ns", "apply", "-f", "-"]))
            .await
            .unwrap();
        assert_eq!(out, "deployment/web created\n");

        let listed = runner
            .run(None, &args(&["--namespace", "ns", "get", "deployment", "-o", "name"]))
            .await
            .unwrap();
        assert_eq!(listed, "deployment.apps/web\n");

        runner
            .run(None, &args(&["--namespace", "ns", "delete", "deployment.apps/web"]))
            .await
            .unwrap();
        assert!(runner.resources().is_empty());
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_get_single() {
        let runner = MockCommandRunner::new().with_resources(&[Manifest::new("CronJob", "nightly")]);

        let found = runner
            .run(None, &args(&["get", "cronjob/nightly", "-o", "name", "--ignore-not-found"]))
            .await
            .unwrap();
        assert_eq!(found, "cronjob/nightly\n");

        let missing = runner
            .run(None, &args(&["get", "cronjob/other", "-o", "name", "--ignore-not-found"]))
            .await
            .unwrap();
        assert!(missing.is_empty());

        assert!(runner
            .run(None, &args(&["get", "cronjob/other", "-o", "name"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let runner = MockCommandRunner::new().fail_on("delete");
        let err = runner
            .run(None, &args(&["delete", "service/x"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("injected failure"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kubectl_captures_output() {
        let kubectl = Kubectl::default().with_binary("cat");
        let out = kubectl.run(Some(b"hello"), &[]).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kubectl_failure_carries_output() {
        let kubectl = Kubectl::default().with_binary("sh");
        let err = kubectl
            .run(None, &args(&["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();

        match err {
            KubeError::Command { program, message, .. } => {
                assert_eq!(program, "sh");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_kubectl_missing_binary() {
        let kubectl = Kubectl::default().with_binary("/nonexistent/kubectl");
        let err = kubectl.run(None, &args(&["version"])).await.unwrap_err();
        assert!(matches!(err, KubeError::Command { .. }));
    }
}
