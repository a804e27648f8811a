//! Pull request text for propagated diffs

use crate::github::NewPullRequest;

const CONFLICT_TITLE_SUFFIX: &str = " CONFLICTS!";
const CONFLICT_BODY_BANNER: &str = "**Conflicts! Need human intervention!**";

/// Review request opened for one update branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub source_pr: u64,
    pub base: String,
    /// `owner:branch` head reference
    pub head: String,
    pub conflict: bool,
}

impl ReviewRequest {
    pub fn new(
        source_pr: u64,
        base: impl Into<String>,
        head: impl Into<String>,
        conflict: bool,
    ) -> Self {
        Self {
            source_pr,
            base: base.into(),
            head: head.into(),
            conflict,
        }
    }

    pub fn title(&self) -> String {
        let title = format!(
            "chore: merging diff from PR #{} into branch {}",
            self.source_pr, self.base
        );
        if self.conflict {
            title + CONFLICT_TITLE_SUFFIX
        } else {
            title
        }
    }

    pub fn body(&self) -> String {
        let body = format!(
            "Automated change: merging diff from PR #{} into branch {}",
            self.source_pr, self.base
        );
        if self.conflict {
            format!("{}\n\n{}", CONFLICT_BODY_BANNER, body)
        } else {
            body
        }
    }

    /// API payload; conflicted requests open as drafts
    pub fn to_payload(&self) -> NewPullRequest {
        NewPullRequest {
            title: self.title(),
            body: self.body(),
            head: self.head.clone(),
            base: self.base.clone(),
            draft: self.conflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_clean_request() {
        let request = ReviewRequest::new(17, "3_ch", "alice:3_ch-update", false);
        assert_snapshot!(request.title(), @"chore: merging diff from PR #17 into branch 3_ch");
        assert_snapshot!(request.body(), @"Automated change: merging diff from PR #17 into branch 3_ch");

        let payload = request.to_payload();
        assert!(!payload.draft);
        assert!(!payload.title.contains("CONFLICTS"));
        assert_eq!(payload.head, "alice:3_ch-update");
        assert_eq!(payload.base, "3_ch");
    }

    #[test]
    fn test_conflict_request() {
        let request = ReviewRequest::new(17, "3_ch", "alice:3_ch-update", true);
        assert_snapshot!(request.title(), @"chore: merging diff from PR #17 into branch 3_ch CONFLICTS!");
        assert!(request.body().starts_with("**Conflicts! Need human intervention!**\n\n"));
        assert!(request.body().ends_with("into branch 3_ch"));
        assert!(request.to_payload().draft);
    }
}
