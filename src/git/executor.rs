//! Async git command executor
//!
//! Runs the `git` binary as a subprocess with:
//! - Piped stdout/stderr and a null stdin
//! - Optional timeout handling
//! - Structured output so callers can inspect exit codes and stderr

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::{GitError, Result};

/// Captured result of a git invocation
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Exit code (`None` when killed by a signal)
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Async git command executor
#[derive(Debug, Clone, Default)]
pub struct GitExecutor {
    /// Directory commands run in (process cwd if unset)
    cwd: Option<PathBuf>,
    /// Per-command timeout
    timeout: Option<Duration>,
    /// `-c key=value` pairs prepended to every command
    config: Vec<(String, String)>,
}

impl GitExecutor {
    /// Create an executor running in the process working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands inside `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set the command timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a `-c key=value` override
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Check if git is installed and accessible
    pub async fn check_installed(&self) -> Result<()> {
        let output = Command::new("git")
            .arg("--version")
            .output()
            .await
            .map_err(|_| GitError::NotInstalled)?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            debug!("git version: {}", version.trim());
            Ok(())
        } else {
            Err(GitError::NotInstalled.into())
        }
    }

    /// Run a git command and capture its output regardless of exit status
    ///
    /// Only spawn failures and timeouts are errors here.
    #[instrument(skip(self), fields(args = ?args))]
    pub async fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let mut cmd = Command::new("git");
        for (key, value) in &self.config {
            cmd.arg("-c").arg(format!("{}={}", key, value));
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = match self.timeout {
            Some(limit) => timeout(limit, cmd.output())
                .await
                .map_err(|_| GitError::Timeout(limit))?,
            None => cmd.output().await,
        };

        let output = output.map_err(|e| {
            warn!("git command failed to start: {}", e);
            GitError::SpawnFailed {
                command: render(args),
                reason: e.to_string(),
            }
        })?;

        let result = GitOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(exit_code = ?result.exit_code, "git finished");
        Ok(result)
    }

    /// Run a git command and return stdout, failing on non-zero exit
    pub async fn execute(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(GitError::CommandFailed {
                command: render(args),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }
            .into())
        }
    }
}

/// Human-readable command line for error messages
pub fn render(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_builder() {
        let executor = GitExecutor::new()
            .in_dir("/tmp/scratch")
            .with_timeout(Some(Duration::from_secs(10)))
            .with_config("user.name", "Bot");

        assert_eq!(executor.cwd(), Some(Path::new("/tmp/scratch")));
        assert_eq!(executor.timeout, Some(Duration::from_secs(10)));
        assert_eq!(executor.config, vec![("user.name".to_string(), "Bot".to_string())]);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&["apply", "--3way", "x.patch"]), "git apply --3way x.patch");
    }

    #[tokio::test]
    async fn test_failed_command_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let executor = GitExecutor::new().in_dir(dir.path());

        // Not a repository, so rev-parse fails
        let err = executor.execute(&["rev-parse", "HEAD"]).await.unwrap_err();
        match err {
            crate::error::Error::Git(GitError::CommandFailed { exit_code, .. }) => {
                assert_ne!(exit_code, Some(0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let executor = GitExecutor::new();
        let output = executor.run(&["--version"]).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.starts_with("git version"));
    }
}
