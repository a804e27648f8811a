//! Patch Propagator - replay one pull request's diff across ordered tutorial branches
//!
//! Tutorial repositories keep one branch per chapter (`2_create_charm`,
//! `3_add_config`, ...), each a continuation of the one before. A fix made in
//! one chapter usually belongs in every later chapter too. This crate takes
//! the diff of a single pull request and, for each later chapter, creates an
//! update branch in a fork, applies the diff with a three-way merge, pushes it
//! and opens a pull request back to the upstream.
//!
//! # Modules
//!
//! - [`config`] - Layered configuration and per-run options
//! - [`git`] - `git` subprocess execution, scratch working copy, branch ordering
//! - [`github`] - GitHub REST client behind the [`github::ReviewPlatform`] trait
//! - [`propagate`] - The per-branch state machine and the run pipeline
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod propagate;

pub use config::{Config, RepoSlug, RunOptions};
pub use error::{Error, Result};
pub use propagate::{BranchOutcome, BranchStage, PropagationReport, Propagator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
