//! Git operations driven through the `git` binary
//!
//! - `GitExecutor` - Async subprocess execution with structured output
//! - `GitWorkspace` - Scratch clone of the fork (clone, branch, apply, commit, push)
//! - `BranchSelector` - Chapter branch filtering and ordering

mod branches;
mod executor;
mod workspace;

pub use branches::*;
pub use executor::*;
pub use workspace::*;
