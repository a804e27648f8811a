//! Per-branch pipeline state
//!
//! Each chapter moves through `Started → Applied|Conflicted → Committed →
//! Pushed → Requested`, or ends in `Failed`. A conflicted branch stops at
//! `Conflicted` when the run is not allowed to continue past conflicts.

use std::fmt;

use serde::Serialize;

use crate::error::{PropagationError, Result};
use crate::github::PullRequest;

/// Where a branch is in its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStage {
    Started,
    Applied,
    Conflicted,
    Committed,
    Pushed,
    Requested,
    Failed,
}

impl BranchStage {
    /// Whether `next` is a legal successor of this stage
    pub fn can_advance_to(self, next: BranchStage) -> bool {
        use BranchStage::*;
        match (self, next) {
            (Requested | Failed, _) => false,
            (_, Failed) => true,
            (Started, Applied | Conflicted) => true,
            (Applied | Conflicted, Committed) => true,
            (Committed, Pushed) => true,
            (Pushed, Requested) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BranchStage::Requested | BranchStage::Failed)
    }
}

impl fmt::Display for BranchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchStage::Started => "started",
            BranchStage::Applied => "applied",
            BranchStage::Conflicted => "conflicted",
            BranchStage::Committed => "committed",
            BranchStage::Pushed => "pushed",
            BranchStage::Requested => "requested",
            BranchStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final result for one downstream branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOutcome {
    CleanMerge,
    MergeWithConflict,
    Skipped,
}

impl fmt::Display for BranchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchOutcome::CleanMerge => f.write_str("clean merge"),
            BranchOutcome::MergeWithConflict => f.write_str("merge with conflict"),
            BranchOutcome::Skipped => f.write_str("skipped"),
        }
    }
}

/// Recorded result for one downstream branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchResult {
    pub branch: String,
    pub head: String,
    pub stage: Option<BranchStage>,
    pub outcome: BranchOutcome,
    pub conflict_paths: Vec<String>,
    pub review_request: Option<PullRequest>,
}

impl BranchResult {
    /// A branch never reached because the run halted earlier
    pub fn skipped(branch: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            head: head.into(),
            stage: None,
            outcome: BranchOutcome::Skipped,
            conflict_paths: Vec::new(),
            review_request: None,
        }
    }
}

/// Tracks one branch through its pipeline
#[derive(Debug, Clone)]
pub struct BranchRun {
    branch: String,
    head: String,
    stage: BranchStage,
    conflicted: bool,
    conflict_paths: Vec<String>,
    review_request: Option<PullRequest>,
}

impl BranchRun {
    pub fn new(branch: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            head: head.into(),
            stage: BranchStage::Started,
            conflicted: false,
            conflict_paths: Vec::new(),
            review_request: None,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn stage(&self) -> BranchStage {
        self.stage
    }

    /// Whether the patch left conflict markers on this branch
    pub fn conflicted(&self) -> bool {
        self.conflicted
    }

    /// Move to `next`, rejecting transitions the pipeline never makes
    pub fn advance(&mut self, next: BranchStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(PropagationError::InvalidTransition {
                branch: self.branch.clone(),
                from: self.stage.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        self.stage = next;
        Ok(())
    }

    /// Record the conflicted paths and enter `Conflicted`
    pub fn conflict(&mut self, paths: Vec<String>) -> Result<()> {
        self.advance(BranchStage::Conflicted)?;
        self.conflicted = true;
        self.conflict_paths = paths;
        Ok(())
    }

    /// Record the opened pull request and enter `Requested`
    pub fn requested(&mut self, pr: PullRequest) -> Result<()> {
        self.advance(BranchStage::Requested)?;
        self.review_request = Some(pr);
        Ok(())
    }

    /// Mark the branch failed; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = BranchStage::Failed;
        }
    }

    pub fn into_result(self) -> BranchResult {
        let outcome = if self.conflicted() {
            BranchOutcome::MergeWithConflict
        } else {
            BranchOutcome::CleanMerge
        };
        BranchResult {
            branch: self.branch,
            head: self.head,
            stage: Some(self.stage),
            outcome,
            conflict_paths: self.conflict_paths,
            review_request: self.review_request,
        }
    }
}
