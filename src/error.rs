//! Error types for patch-propagator
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.
//! A merge conflict is deliberately absent here: it is an outcome, not an error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for patch-propagator
#[derive(Error, Debug)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Propagation error: {0}")]
    Propagation(#[from] PropagationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from `git` subprocess invocations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git is not installed or not in PATH")]
    NotInstalled,

    #[error("Git command failed (exit {exit_code:?}): {command} - {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to spawn {command}: {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Git command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to clone {url}: {stderr}")]
    CloneFailed { url: String, stderr: String },

    #[error("Failed to create branch '{branch}': {stderr}")]
    BranchCreationFailed { branch: String, stderr: String },

    #[error("Failed to apply patch: {0}")]
    ApplyFailed(String),

    #[error("Push rejected for branch '{branch}': {stderr}")]
    PushFailed { branch: String, stderr: String },

    #[error("Working copy not prepared at {0}")]
    NotPrepared(PathBuf),
}

/// Errors from the GitHub REST API
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Failed to parse GitHub response: {0}")]
    ParseError(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Environment variable {0} not set")]
    MissingToken(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid repository '{0}', expected owner/name")]
    InvalidRepo(String),
}

/// Errors raised by the propagation pipeline itself
#[derive(Error, Debug)]
pub enum PropagationError {
    #[error("Invalid stage transition for branch '{branch}': {from} -> {to}")]
    InvalidTransition {
        branch: String,
        from: String,
        to: String,
    },

    #[error("Pull request #{0} has an empty diff")]
    EmptyDiff(u64),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GitError::NotInstalled;
        assert!(err.to_string().contains("not installed"));

        let err = GitError::CommandFailed {
            command: "git push -f origin 3_ch-update".to_string(),
            exit_code: Some(128),
            stderr: "fatal: repository not found".to_string(),
        };
        assert!(err.to_string().contains("3_ch-update"));
        assert!(err.to_string().contains("128"));

        let err = ConfigError::MissingToken("GITHUB_TOKEN".to_string());
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let err = GitHubError::RateLimited {
            reset_at: "1700000000".to_string(),
        };
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_error_conversion() {
        let git_err = GitError::ApplyFailed("corrupt patch at line 4".to_string());
        let top: Error = git_err.into();
        assert!(matches!(top, Error::Git(GitError::ApplyFailed(_))));

        let prop_err = PropagationError::EmptyDiff(7);
        let top: Error = prop_err.into();
        assert!(top.to_string().contains("#7"));
    }
}
