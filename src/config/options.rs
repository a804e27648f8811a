//! Per-run options resolved from configuration and CLI

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::git::BranchOrder;

use super::Config;

/// A GitHub repository in `owner/name` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        let valid = |s: &str| !s.is_empty() && !s.contains('/') && !s.contains(char::is_whitespace);
        if !valid(&owner) || !valid(&name) {
            return Err(ConfigError::InvalidRepo(format!("{}/{}", owner, name)).into());
        }
        Ok(Self { owner, name })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(ConfigError::InvalidRepo(s.to_string()).into()),
        }
    }
}

/// Everything a single propagation run needs to know
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repository the source pull request lives in and new PRs target
    pub upstream: RepoSlug,
    /// Repository the update branches are pushed to
    pub fork: RepoSlug,
    /// Source pull request number
    pub pull_request: u64,
    /// Keep going after a conflicted branch
    pub ignore_conflicts: bool,
    /// Leave the scratch directory and patch file in place
    pub keep_tmp: bool,
    /// Scratch file the diff is written to
    pub diff_file: PathBuf,
    /// Regex a chapter branch must match
    pub branch_pattern: String,
    /// Ordering applied to chapter branches
    pub branch_order: BranchOrder,
    /// Suffix for update branches
    pub head_suffix: String,
    /// Commit message for the merged diff
    pub commit_message: String,
}

impl RunOptions {
    /// Resolve run options; the fork owner must come from config or CLI
    pub fn resolve(
        config: &Config,
        pull_request: u64,
        ignore_conflicts: bool,
        keep_tmp: bool,
    ) -> Result<Self> {
        let fork_owner = config
            .fork_owner
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "fork_owner".to_string(),
                reason: "required, normally your own GitHub user name".to_string(),
            })?;

        if pull_request == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pull_request_number".to_string(),
                reason: "must be a positive integer".to_string(),
            }
            .into());
        }

        Ok(Self {
            upstream: RepoSlug::new(&config.upstream_owner, &config.upstream_repo_name)?,
            fork: RepoSlug::new(fork_owner, &config.fork_repo_name)?,
            pull_request,
            ignore_conflicts,
            keep_tmp,
            diff_file: config.diff_file.clone(),
            branch_pattern: config.branch_pattern.clone(),
            branch_order: config.branch_order,
            head_suffix: config.head_suffix.clone(),
            commit_message: config.commit_message.clone(),
        })
    }

    /// Name of the update branch created for a chapter branch
    pub fn head_branch(&self, branch: &str) -> String {
        format!("{}{}", branch, self.head_suffix)
    }

    /// Cross-repository head reference used when opening a pull request
    pub fn head_ref(&self, head: &str) -> String {
        format!("{}:{}", self.fork.owner, head)
    }
}

/// Git command timeout from config
pub fn git_timeout(config: &Config) -> Option<Duration> {
    config.git_timeout_secs.map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::ConfigOverrides;

    fn config_with_fork(owner: &str) -> Config {
        Config {
            fork_owner: Some(owner.to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_repo_slug_parse_and_display() {
        let slug: RepoSlug = "canonical/juju-sdk-tutorial-k8s".parse().unwrap();
        assert_eq!(slug.owner, "canonical");
        assert_eq!(slug.name, "juju-sdk-tutorial-k8s");
        assert_eq!(slug.to_string(), "canonical/juju-sdk-tutorial-k8s");
    }

    #[test]
    fn test_repo_slug_rejects_malformed() {
        assert!("no-slash".parse::<RepoSlug>().is_err());
        assert!("/name".parse::<RepoSlug>().is_err());
        assert!("a/b/c".parse::<RepoSlug>().is_err());
        assert!(RepoSlug::new("own er", "repo").is_err());
    }

    #[test]
    fn test_resolve_requires_fork_owner() {
        let err = RunOptions::resolve(&Config::default(), 12, false, false).unwrap_err();
        assert!(err.to_string().contains("fork_owner"));
    }

    #[test]
    fn test_fork_owner_from_config_file_when_flag_absent() {
        figment::Jail::expect_with(|jail| {
            let overrides = ConfigOverrides::default();

            let config = Config::layered(Path::new("config.toml"), &overrides).unwrap();
            let err = RunOptions::resolve(&config, 12, false, false).unwrap_err();
            assert!(err.to_string().contains("fork_owner"));

            jail.create_file("config.toml", "fork_owner = \"bob\"\n")?;
            let config = Config::layered(Path::new("config.toml"), &overrides).unwrap();
            let opts = RunOptions::resolve(&config, 12, false, false).unwrap();
            assert_eq!(opts.fork.to_string(), "bob/juju-sdk-tutorial-k8s");
            Ok(())
        });
    }

    #[test]
    fn test_resolve_rejects_zero_pull_request() {
        assert!(RunOptions::resolve(&config_with_fork("alice"), 0, false, false).is_err());
    }

    #[test]
    fn test_resolve_builds_slugs_and_heads() {
        let opts = RunOptions::resolve(&config_with_fork("alice"), 12, true, false).unwrap();
        assert_eq!(opts.upstream.to_string(), "canonical/juju-sdk-tutorial-k8s");
        assert_eq!(opts.fork.to_string(), "alice/juju-sdk-tutorial-k8s");
        assert!(opts.ignore_conflicts);
        assert_eq!(opts.head_branch("3_ch"), "3_ch-update");
        assert_eq!(opts.head_ref("3_ch-update"), "alice:3_ch-update");
    }

    #[test]
    fn test_git_timeout() {
        assert_eq!(git_timeout(&Config::default()), None);
        let config = Config {
            git_timeout_secs: Some(30),
            ..Config::default()
        };
        assert_eq!(git_timeout(&config), Some(Duration::from_secs(30)));
    }
}
