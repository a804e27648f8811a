//! Configuration module
//!
//! Handles:
//! - User configuration (`config.toml` in the platform config dir, or `--config`)
//! - Environment overrides (`PATCH_PROPAGATOR_*`) and the `GITHUB_TOKEN` secret
//! - Per-run options resolved from config and CLI arguments

mod options;
mod settings;

pub use options::*;
pub use settings::*;
