//! Review platform abstraction
//!
//! The propagator only needs four calls from the hosting platform. Keeping
//! them behind a trait lets tests drive a full run against an in-memory fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RepoSlug;
use crate::error::GitHubError;

/// Pull request as returned by the API (fields we use)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    pub base: PullRequestRef,
}

/// One side of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
}

/// Payload for opening a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// `owner:branch` for cross-repository pull requests
    pub head: String,
    pub base: String,
    pub draft: bool,
}

/// Calls the propagator makes against the hosting platform
#[async_trait]
pub trait ReviewPlatform: Send + Sync {
    /// Fetch a pull request
    async fn pull_request(&self, repo: &RepoSlug, number: u64) -> Result<PullRequest, GitHubError>;

    /// Fetch a pull request's changes as a unified diff
    async fn pull_request_diff(&self, repo: &RepoSlug, number: u64) -> Result<String, GitHubError>;

    /// Names of every branch in the repository
    async fn list_branches(&self, repo: &RepoSlug) -> Result<Vec<String>, GitHubError>;

    /// Open a pull request
    async fn create_pull_request(
        &self,
        repo: &RepoSlug,
        request: &NewPullRequest,
    ) -> Result<PullRequest, GitHubError>;
}
