//! The propagation run
//!
//! Fetches the source pull request's diff, clones the fork, works out the
//! downstream chapters and walks them in order. Every step is awaited before
//! the next one starts: all chapters share one scratch clone and one patch
//! file.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::request::ReviewRequest;
use super::stage::{BranchOutcome, BranchResult, BranchRun, BranchStage};
use crate::config::RunOptions;
use crate::error::{PropagationError, Result};
use crate::git::{ApplyOutcome, BranchSelector, WorkingCopy};
use crate::github::ReviewPlatform;

/// What happened during one run
#[derive(Debug, Clone, Serialize)]
pub struct PropagationReport {
    pub source_pr: u64,
    pub base_branch: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<BranchResult>,
    /// Branch whose conflict stopped the run
    pub halted_on: Option<String>,
}

impl PropagationReport {
    fn new(source_pr: u64, base_branch: String, started_at: DateTime<Utc>) -> Self {
        Self {
            source_pr,
            base_branch,
            started_at,
            finished_at: None,
            results: Vec::new(),
            halted_on: None,
        }
    }

    pub fn count(&self, outcome: BranchOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Numbers of the pull requests opened by this run
    pub fn opened(&self) -> Vec<u64> {
        self.results
            .iter()
            .filter_map(|r| r.review_request.as_ref().map(|pr| pr.number))
            .collect()
    }
}

impl fmt::Display for PropagationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PR #{} (base {}): {} downstream branch(es)",
            self.source_pr,
            self.base_branch,
            self.results.len()
        )?;
        for result in &self.results {
            write!(f, "  {} -> {}", result.branch, result.outcome)?;
            match &result.review_request {
                Some(pr) if pr.html_url.is_empty() => write!(f, " (PR #{})", pr.number)?,
                Some(pr) => write!(f, " (PR #{} {})", pr.number, pr.html_url)?,
                None if result.outcome == BranchOutcome::MergeWithConflict => {
                    write!(f, " (not pushed)")?
                }
                None => {}
            }
            writeln!(f)?;
        }
        if let Some(branch) = &self.halted_on {
            writeln!(f, "Stopped at conflict in {}", branch)?;
        }
        Ok(())
    }
}

/// Replays one pull request's diff onto every downstream chapter
pub struct Propagator<'a, P: ReviewPlatform + ?Sized, W: WorkingCopy> {
    platform: &'a P,
    workspace: W,
    options: RunOptions,
    selector: BranchSelector,
    clone_url: String,
}

impl<'a, P: ReviewPlatform + ?Sized, W: WorkingCopy> Propagator<'a, P, W> {
    pub fn new(
        platform: &'a P,
        workspace: W,
        options: RunOptions,
        clone_url: impl Into<String>,
    ) -> Result<Self> {
        let selector = BranchSelector::new(&options.branch_pattern, options.branch_order)?;
        Ok(Self {
            platform,
            workspace,
            options,
            selector,
            clone_url: clone_url.into(),
        })
    }

    /// Run the whole propagation, then clean up scratch state
    ///
    /// Cleanup also runs after a fatal error, but its own failures are only
    /// logged so the original error is what the caller sees.
    pub async fn run(mut self) -> Result<PropagationReport> {
        let outcome = self.propagate().await;

        if self.options.keep_tmp {
            info!(
                diff_file = %self.options.diff_file.display(),
                "Keeping scratch directory and diff file"
            );
        } else if let Err(e) = self.cleanup().await {
            if outcome.is_ok() {
                return Err(e);
            }
            warn!("Cleanup after failed run also failed: {}", e);
        }

        if outcome.is_ok() {
            info!("Done!");
        }
        outcome
    }

    #[instrument(skip(self), fields(pr = self.options.pull_request, upstream = %self.options.upstream))]
    async fn propagate(&mut self) -> Result<PropagationReport> {
        let started_at = Utc::now();
        let upstream = &self.options.upstream;
        let number = self.options.pull_request;

        let diff = self.platform.pull_request_diff(upstream, number).await?;
        if diff.trim().is_empty() {
            return Err(PropagationError::EmptyDiff(number).into());
        }
        write_diff(&self.options.diff_file, &diff).await?;

        self.workspace.prepare(&self.clone_url).await?;

        let source = self.platform.pull_request(upstream, number).await?;
        let base = source.base.ref_name;
        let branches = self.platform.list_branches(upstream).await?;
        let targets = self.selector.downstream_of(branches, &base);
        info!(
            base = %base,
            order = ?self.selector.order(),
            "Propagating to {} branch(es): {:?}",
            targets.len(),
            targets
        );

        let mut report = PropagationReport::new(number, base, started_at);
        let mut remaining = targets.into_iter();

        while let Some(branch) = remaining.next() {
            let result = self.propagate_branch(&branch).await?;
            let halted = result.stage == Some(BranchStage::Conflicted);
            report.results.push(result);

            if halted {
                error!(
                    "Conflict merging diff into branch {}, aborting this PR and following PRs.",
                    branch
                );
                report.halted_on = Some(branch);
                for rest in remaining.by_ref() {
                    let head = self.options.head_branch(&rest);
                    report.results.push(BranchResult::skipped(rest, head));
                }
            }
        }

        report.finished_at = Some(Utc::now());
        Ok(report)
    }

    async fn propagate_branch(&mut self, branch: &str) -> Result<BranchResult> {
        info!("=== Working on branch {} ===", branch);
        let mut run = BranchRun::new(branch, self.options.head_branch(branch));

        match self.drive(&mut run).await {
            Ok(()) => Ok(run.into_result()),
            Err(e) => {
                error!(branch, stage = %run.stage(), "Branch failed: {}", e);
                run.fail();
                Err(e)
            }
        }
    }

    async fn drive(&mut self, run: &mut BranchRun) -> Result<()> {
        self.workspace.create_branch(run.branch(), run.head()).await?;

        match self.workspace.apply_patch(&self.options.diff_file).await? {
            ApplyOutcome::Clean => run.advance(BranchStage::Applied)?,
            ApplyOutcome::Conflicted { paths } => {
                run.conflict(paths)?;
                if !self.options.ignore_conflicts {
                    return Ok(());
                }
            }
        }

        self.workspace.commit_all(&self.options.commit_message).await?;
        run.advance(BranchStage::Committed)?;

        self.workspace.force_push(run.head()).await?;
        run.advance(BranchStage::Pushed)?;

        let request = ReviewRequest::new(
            self.options.pull_request,
            run.branch(),
            self.options.head_ref(run.head()),
            run.conflicted(),
        );
        let pr = self
            .platform
            .create_pull_request(&self.options.upstream, &request.to_payload())
            .await?;
        run.requested(pr)
    }

    async fn cleanup(&mut self) -> Result<()> {
        info!("Cleaning up ...");
        match tokio::fs::remove_file(&self.options.diff_file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.workspace.discard().await
    }
}

async fn write_diff(path: &Path, diff: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, diff).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{PullRequest, PullRequestRef};

    fn report() -> PropagationReport {
        let mut report = PropagationReport::new(9, "2_ch".to_string(), Utc::now());
        report.results.push(BranchResult {
            branch: "3_ch".to_string(),
            head: "3_ch-update".to_string(),
            stage: Some(BranchStage::Requested),
            outcome: BranchOutcome::CleanMerge,
            conflict_paths: vec![],
            review_request: Some(PullRequest {
                number: 31,
                title: String::new(),
                html_url: "https://github.com/o/r/pull/31".to_string(),
                draft: false,
                base: PullRequestRef {
                    ref_name: "3_ch".to_string(),
                    sha: String::new(),
                },
            }),
        });
        report.results.push(BranchResult {
            branch: "4_ch".to_string(),
            head: "4_ch-update".to_string(),
            stage: Some(BranchStage::Conflicted),
            outcome: BranchOutcome::MergeWithConflict,
            conflict_paths: vec!["README.md".to_string()],
            review_request: None,
        });
        report.results.push(BranchResult::skipped("10_ch", "10_ch-update"));
        report.halted_on = Some("4_ch".to_string());
        report
    }

    #[test]
    fn test_report_counts() {
        let report = report();
        assert_eq!(report.count(BranchOutcome::CleanMerge), 1);
        assert_eq!(report.count(BranchOutcome::MergeWithConflict), 1);
        assert_eq!(report.count(BranchOutcome::Skipped), 1);
        assert_eq!(report.opened(), vec![31]);
    }

    #[test]
    fn test_report_display() {
        let text = report().to_string();
        assert!(text.starts_with("PR #9 (base 2_ch): 3 downstream branch(es)"));
        assert!(text.contains("3_ch -> clean merge (PR #31 https://github.com/o/r/pull/31)"));
        assert!(text.contains("4_ch -> merge with conflict (not pushed)"));
        assert!(text.contains("10_ch -> skipped"));
        assert!(text.contains("Stopped at conflict in 4_ch"));
    }

    #[tokio::test]
    async fn test_write_diff_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch").join("diff.patch");
        write_diff(&path, "diff --git a/x b/x\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "diff --git a/x b/x\n");
    }
}
