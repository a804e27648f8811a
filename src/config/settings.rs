//! User configuration settings
//!
//! Layered configuration: defaults → config file → environment variables → CLI args

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::git::BranchOrder;

/// Prefix for environment overrides (`PATCH_PROPAGATOR_WORKING_DIR`, ...)
pub const ENV_PREFIX: &str = "PATCH_PROPAGATOR_";

/// Environment variable holding the GitHub access token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Tutorial repository the tool was written for
pub const DEFAULT_REPO_NAME: &str = "juju-sdk-tutorial-k8s";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner of the upstream repository
    pub upstream_owner: String,

    /// Name of the upstream repository
    pub upstream_repo_name: String,

    /// Owner of the fork that receives the new branches
    pub fork_owner: Option<String>,

    /// Name of the fork repository
    pub fork_repo_name: String,

    /// GitHub REST API base URL
    pub api_url: String,

    /// Clone URL template; `{repo}` is replaced with `owner/name`
    pub clone_url_template: String,

    /// Scratch directory for the working copy
    pub working_dir: PathBuf,

    /// Scratch file the pull request diff is written to
    pub diff_file: PathBuf,

    /// Regex a branch name must match to be considered a chapter
    pub branch_pattern: String,

    /// How chapter branches are ordered
    pub branch_order: BranchOrder,

    /// Suffix appended to a chapter branch to name its update branch
    pub head_suffix: String,

    /// Commit message for the merged diff
    pub commit_message: String,

    /// Committer name passed to git (falls back to git's own config)
    pub git_user_name: Option<String>,

    /// Committer email passed to git (falls back to git's own config)
    pub git_user_email: Option<String>,

    /// Timeout for each git command in seconds (unset = no timeout)
    pub git_timeout_secs: Option<u64>,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_owner: "canonical".to_string(),
            upstream_repo_name: DEFAULT_REPO_NAME.to_string(),
            fork_owner: None,
            fork_repo_name: DEFAULT_REPO_NAME.to_string(),
            api_url: "https://api.github.com".to_string(),
            clone_url_template: "git@github.com:{repo}.git".to_string(),
            working_dir: PathBuf::from("./tmp"),
            diff_file: PathBuf::from("./diff.patch"),
            branch_pattern: r"\d+_".to_string(),
            branch_order: BranchOrder::Numeric,
            head_suffix: "-update".to_string(),
            commit_message: "chore: merging diff".to_string(),
            git_user_name: None,
            git_user_email: None,
            git_timeout_secs: None,
            debug: false,
        }
    }
}

/// Command-line values layered on top of file and environment settings
///
/// Unset fields leave the lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fork_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_repo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fork_repo_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
}

/// Read the GitHub token through `lookup`, rejecting unset or blank values
pub fn github_token<F>(lookup: F) -> Result<String>
where
    F: FnOnce(&str) -> Option<String>,
{
    match lookup(TOKEN_ENV) {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ConfigError::MissingToken(TOKEN_ENV.to_string()).into()),
    }
}

impl Config {
    /// Load defaults, `config_path`, environment and `overrides`, in rising precedence
    pub fn layered(config_path: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        Self::from_figment(Self::figment(config_path).merge(Serialized::defaults(overrides)))
    }

    /// Build the layered figment without extracting it
    ///
    /// Callers merge CLI overrides on top before extracting.
    pub fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Layer config file if it exists
            .merge(Toml::file(config_path))
            // Layer environment variables (PATCH_PROPAGATOR_WORKING_DIR, etc.)
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract a config from a figment that may carry extra layers
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().map_err(load_failed)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Render the clone URL for a repository
    pub fn clone_url(&self, repo: &str) -> String {
        self.clone_url_template.replace("{repo}", repo)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if regex::Regex::new(&self.branch_pattern).is_err() {
            return Err(invalid("branch_pattern", "not a valid regular expression"));
        }
        if !self.clone_url_template.contains("{repo}") {
            return Err(invalid("clone_url_template", "must contain {repo}"));
        }
        if self.head_suffix.is_empty() {
            return Err(invalid(
                "head_suffix",
                "must not be empty, the update branch would shadow the chapter branch",
            ));
        }
        if self.commit_message.trim().is_empty() {
            return Err(invalid("commit_message", "must not be empty"));
        }
        if self.working_dir.as_os_str().is_empty() {
            return Err(invalid("working_dir", "must not be empty"));
        }
        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "patch-propagator", "patch-propagator").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}

fn load_failed(e: figment::Error) -> Error {
    ConfigError::LoadFailed(e.to_string()).into()
}

fn invalid(key: &str, reason: &str) -> Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
