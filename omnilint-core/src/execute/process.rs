//! Controlled subprocess execution.
//!
//! Commands run as argv lists, never through a shell. Relative
//! executables resolve via `which`, stdin comes from the null device by
//! default, and a timeout synthesizes return code 124 instead of
//! raising.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::outcome::TIMEOUT_RETURNCODE;

#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub cwd: Option<PathBuf>,
    /// Overrides applied on top of the inherited parent environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub discard_stdin: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
            discard_stdin: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lines(&self) -> Vec<String> {
        to_lines(&self.stdout)
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        to_lines(&self.stderr)
    }
}

fn to_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().map(str::to_string).collect()
}

/// Seam between the orchestrator and the operating system; tests inject
/// scripted implementations.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String], options: &CommandOptions) -> Result<CommandOutput>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

#[async_trait]
impl CommandRunner for SystemProcessRunner {
    async fn run(&self, argv: &[String], options: &CommandOptions) -> Result<CommandOutput> {
        let Some((head, rest)) = argv.split_first() else {
            bail!("subprocess command requires at least one argument");
        };
        let program = resolve_executable(head)?;

        let mut command = Command::new(&program);
        let _ = command
            .args(rest)
            .envs(&options.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            let _ = command.current_dir(cwd);
        }
        if options.discard_stdin {
            let _ = command.stdin(Stdio::null());
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", program.display()))?;

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let mut timed_out = false;
        let status = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    timed_out = true;
                    let _ = child.start_kill();
                    child.wait().await?
                }
            },
            None => child.wait().await?,
        };

        let stdout = String::from_utf8_lossy(&stdout_task.await??).into_owned();
        let mut stderr = String::from_utf8_lossy(&stderr_task.await??).into_owned();

        let returncode = if timed_out {
            let notice = match options.timeout {
                Some(limit) => format!("Command timed out after {:.1}s", limit.as_secs_f64()),
                None => "Command timed out".to_string(),
            };
            if stderr.is_empty() {
                stderr = notice;
            } else {
                stderr = format!("{}\n{}", stderr.trim_end_matches('\n'), notice);
            }
            TIMEOUT_RETURNCODE
        } else {
            status.code().unwrap_or(-1)
        };

        Ok(CommandOutput {
            returncode,
            stdout,
            stderr,
            timed_out,
        })
    }
}

fn drain(
    stream: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>,
) -> tokio::task::JoinHandle<std::io::Result<Vec<u8>>> {
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buffer).await?;
        }
        Ok(buffer)
    })
}

/// Absolute paths and explicit relative paths pass through; bare names
/// must resolve on PATH.
fn resolve_executable(head: &str) -> Result<PathBuf> {
    let path = Path::new(head);
    if path.is_absolute() || head.contains(std::path::MAIN_SEPARATOR) || head.contains('/') {
        return Ok(path.to_path_buf());
    }
    which::which(head).with_context(|| format!("Executable '{head}' was not found on PATH"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let runner = SystemProcessRunner;
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let output = runner
            .run(&argv, &CommandOptions::default())
            .await
            .expect("run");
        assert_eq!(output.returncode, 0);
        assert_eq!(output.stdout.trim(), "hello");
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn environment_overrides_reach_the_child() {
        let runner = SystemProcessRunner;
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf %s \"$PROBE_VALUE\"".to_string(),
        ];
        let mut options = CommandOptions::default();
        let _ = options
            .env
            .insert("PROBE_VALUE".to_string(), "injected".to_string());
        let output = runner.run(&argv, &options).await.expect("run");
        assert_eq!(output.stdout, "injected");
    }

    #[tokio::test]
    async fn stdin_defaults_to_the_null_device() {
        let runner = SystemProcessRunner;
        let argv = vec!["cat".to_string()];
        let output = runner
            .run(&argv, &CommandOptions::default())
            .await
            .expect("run");
        assert_eq!(output.returncode, 0);
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn timeout_synthesizes_return_code_124() {
        let runner = SystemProcessRunner;
        let argv = vec!["sleep".to_string(), "5".to_string()];
        let options = CommandOptions {
            timeout: Some(Duration::from_millis(100)),
            ..CommandOptions::default()
        };
        let output = runner.run(&argv, &options).await.expect("run");
        assert_eq!(output.returncode, TIMEOUT_RETURNCODE);
        assert!(output.timed_out);
        assert!(output.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_executables_are_an_error() {
        let runner = SystemProcessRunner;
        let argv = vec!["definitely-not-a-real-binary-name".to_string()];
        assert!(runner.run(&argv, &CommandOptions::default()).await.is_err());
    }
}
