//! Hosted review platform integration
//!
//! - `ReviewPlatform` - The calls a propagation run makes
//! - `GitHubClient` - `reqwest` implementation against the GitHub REST API

mod client;
mod platform;

pub use client::*;
pub use platform::*;
