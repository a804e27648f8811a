//! Patch propagation across chapter branches
//!
//! - `Propagator` - Runs the whole diff → branch → apply → commit → push → PR pipeline
//! - `BranchRun` / `BranchStage` - Per-branch state machine
//! - `ReviewRequest` - Title/body/draft rules for the opened pull requests

mod pipeline;
mod request;
mod stage;

pub use pipeline::*;
pub use request::*;
pub use stage::*;
