//! Scratch working copy of the fork
//!
//! The whole run reuses one clone: each chapter gets a fresh update branch
//! checked out from its remote tip, the patch is applied, committed and
//! force-pushed, and the next chapter starts from there.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::executor::{GitExecutor, GitOutput, render};
use crate::error::{GitError, Result};

/// Result of applying a patch to the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Patch applied without conflicts
    Clean,
    /// Patch applied with conflict markers left in these paths
    Conflicted { paths: Vec<String> },
}

/// Operations the propagator needs from a working copy
#[async_trait]
pub trait WorkingCopy: Send {
    /// Discard any previous scratch state and clone `url` afresh
    async fn prepare(&mut self, url: &str) -> Result<()>;

    /// Create and check out `head` from the remote tip of `base`
    async fn create_branch(&mut self, base: &str, head: &str) -> Result<()>;

    /// Apply a patch with three-way merge semantics
    async fn apply_patch(&mut self, patch: &Path) -> Result<ApplyOutcome>;

    /// Stage everything, conflict markers included, and commit
    async fn commit_all(&mut self, message: &str) -> Result<()>;

    /// Force-push `head` to origin
    async fn force_push(&mut self, head: &str) -> Result<()>;

    /// Remove the scratch directory
    async fn discard(&mut self) -> Result<()>;
}

/// Working copy backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    dir: PathBuf,
    git: GitExecutor,
    prepared: bool,
}

impl GitWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            git: GitExecutor::new().in_dir(&dir),
            dir,
            prepared: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.git = self.git.with_timeout(timeout);
        self
    }

    /// Commit as this identity instead of git's configured one
    pub fn with_identity(mut self, name: Option<&str>, email: Option<&str>) -> Self {
        if let Some(name) = name {
            self.git = self.git.with_config("user.name", name);
        }
        if let Some(email) = email {
            self.git = self.git.with_config("user.email", email);
        }
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_prepared(&self) -> Result<()> {
        if self.prepared {
            Ok(())
        } else {
            Err(GitError::NotPrepared(self.dir.clone()).into())
        }
    }

    async fn unmerged_paths(&self) -> Result<Vec<String>> {
        let stdout = self
            .git
            .execute(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        let mut paths: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        paths.dedup();
        Ok(paths)
    }
}

/// Decide whether a failed `git apply --3way` left a genuine conflict
///
/// Both signals must agree: git reporting conflicts on stderr and the index
/// holding unmerged entries. Anything else is a hard failure.
pub fn classify_apply(
    output: &GitOutput,
    unmerged: Vec<String>,
) -> std::result::Result<ApplyOutcome, GitError> {
    if output.success() {
        return Ok(ApplyOutcome::Clean);
    }

    let reports_conflict = output.stderr.to_lowercase().contains("conflict");
    if reports_conflict && !unmerged.is_empty() {
        Ok(ApplyOutcome::Conflicted { paths: unmerged })
    } else {
        Err(GitError::ApplyFailed(output.stderr.trim().to_string()))
    }
}

#[async_trait]
impl WorkingCopy for GitWorkspace {
    #[instrument(skip(self))]
    async fn prepare(&mut self, url: &str) -> Result<()> {
        info!("Cloning repository ...");
        self.discard().await?;

        if let Some(parent) = self.dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let dir = self.dir.to_string_lossy().to_string();
        let args = ["clone", "--depth=1", "--no-single-branch", url, dir.as_str()];
        // The clone target does not exist yet, so run from the process cwd
        let output = GitExecutor::new()
            .with_timeout(self.git.timeout())
            .run(&args)
            .await?;

        if !output.success() {
            return Err(GitError::CloneFailed {
                url: url.to_string(),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }

        self.prepared = true;
        debug!("clone completed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_branch(&mut self, base: &str, head: &str) -> Result<()> {
        self.ensure_prepared()?;
        info!("Creating branch {} ...", head);

        let start = format!("origin/{}", base);
        let output = self.git.run(&["checkout", "-b", head, &start]).await?;
        if !output.success() {
            return Err(GitError::BranchCreationFailed {
                branch: head.to_string(),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(patch = %patch.display()))]
    async fn apply_patch(&mut self, patch: &Path) -> Result<ApplyOutcome> {
        self.ensure_prepared()?;
        info!("Applying patch ...");

        let patch = std::path::absolute(patch)?;
        let patch = patch.to_string_lossy().to_string();
        let output = self.git.run(&["apply", "--3way", &patch]).await?;
        if output.success() {
            return Ok(ApplyOutcome::Clean);
        }

        let unmerged = self.unmerged_paths().await?;
        let outcome = classify_apply(&output, unmerged)?;
        if let ApplyOutcome::Conflicted { paths } = &outcome {
            warn!(?paths, "patch applied with conflicts");
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn commit_all(&mut self, message: &str) -> Result<()> {
        self.ensure_prepared()?;
        info!("Committing changes ...");

        self.git.execute(&["add", "."]).await?;
        self.git.execute(&["commit", "-m", message]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn force_push(&mut self, head: &str) -> Result<()> {
        self.ensure_prepared()?;
        info!("Pushing changes ...");

        let args = ["push", "-f", "origin", head];
        let output = self.git.run(&args).await?;
        if !output.success() {
            warn!("{} failed", render(&args));
            return Err(GitError::PushFailed {
                branch: head.to_string(),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn discard(&mut self) -> Result<()> {
        self.prepared = false;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!("Removed scratch directory {:?}", self.dir);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
