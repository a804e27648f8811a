//! Chapter branch selection and ordering
//!
//! Tutorial chapters live on branches such as `2_create_charm`, `3_add_config`,
//! `10_observability`. A pull request against one chapter has to be replayed
//! onto every chapter after it, so the order between branch names matters.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// How chapter branch names are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOrder {
    /// Digit runs compare as numbers: `3_ch < 10_ch`
    #[default]
    Numeric,
    /// Plain string order: `10_ch < 3_ch`
    Lexicographic,
}

impl BranchOrder {
    /// Compare two branch names
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            BranchOrder::Lexicographic => a.cmp(b),
            BranchOrder::Numeric => natural_key(a)
                .cmp(&natural_key(b))
                .then_with(|| a.cmp(b)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    // Variant order is significant: numbers sort before text
    Number(u128),
    Text(&'a str),
}

fn natural_key(name: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let bytes = name.as_bytes();

    while start < bytes.len() {
        let digit = bytes[start].is_ascii_digit();
        let end = bytes[start..]
            .iter()
            .position(|b| b.is_ascii_digit() != digit)
            .map_or(bytes.len(), |offset| start + offset);
        let run = &name[start..end];

        segments.push(match run.parse::<u128>() {
            Ok(n) if digit => Segment::Number(n),
            _ => Segment::Text(run),
        });
        start = end;
    }

    segments
}

/// Picks the chapter branches downstream of a base branch
#[derive(Debug, Clone)]
pub struct BranchSelector {
    pattern: Regex,
    order: BranchOrder,
}

impl BranchSelector {
    pub fn new(pattern: &str, order: BranchOrder) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            key: "branch_pattern".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern, order })
    }

    pub fn order(&self) -> BranchOrder {
        self.order
    }

    /// Chapter branches in the configured order
    pub fn chapters<I, S>(&self, branches: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chapters: Vec<String> = branches
            .into_iter()
            .map(Into::into)
            .filter(|name| self.pattern.is_match(name))
            .collect();
        chapters.sort_by(|a, b| self.order.compare(a, b));
        chapters.dedup();
        chapters
    }

    /// Chapter branches strictly after `base`, in processing order
    pub fn downstream_of<I, S>(&self, branches: I, base: &str) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chapters(branches)
            .into_iter()
            .filter(|name| self.order.compare(name, base) == Ordering::Greater)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn selector(order: BranchOrder) -> BranchSelector {
        BranchSelector::new(r"\d+_", order).unwrap()
    }

    #[test]
    fn test_lexicographic_drops_ten_after_two() {
        // "10_ch" < "2_ch" as strings, so only 3_ch follows the base
        let picked = selector(BranchOrder::Lexicographic).downstream_of(["2_ch", "3_ch", "10_ch"], "2_ch");
        assert_eq!(picked, vec!["3_ch"]);
    }

    #[test]
    fn test_lexicographic_puts_ten_before_two() {
        let branches = ["0_intro", "2_ch", "3_ch", "10_ch"];
        let lexicographic = selector(BranchOrder::Lexicographic).downstream_of(branches, "0_intro");
        assert_eq!(lexicographic, vec!["10_ch", "2_ch", "3_ch"]);

        let numeric = selector(BranchOrder::Numeric).downstream_of(branches, "0_intro");
        assert_eq!(numeric, vec!["2_ch", "3_ch", "10_ch"]);
    }

    #[test]
    fn test_numeric_follows_chapter_numbers() {
        let picked = selector(BranchOrder::Numeric).downstream_of(["10_ch", "2_ch", "3_ch"], "2_ch");
        assert_eq!(picked, vec!["3_ch", "10_ch"]);
    }

    #[test]
    fn test_lexicographic_filter_uses_string_order() {
        // "10_ch" < "2_ch" as strings, so it is not downstream of 2_ch
        let picked = selector(BranchOrder::Lexicographic).downstream_of(["1_ch", "10_ch", "3_ch"], "2_ch");
        assert_eq!(picked, vec!["3_ch"]);
    }

    #[test]
    fn test_non_chapter_branches_ignored() {
        let picked = selector(BranchOrder::Numeric).downstream_of(
            ["main", "1_intro", "2_ch", "3_ch", "release-2024", "docs"],
            "1_intro",
        );
        assert_eq!(picked, vec!["2_ch", "3_ch"]);
    }

    #[test]
    fn test_base_without_chapter_number() {
        // Numbers sort before text, so nothing follows a non-chapter base
        let picked = selector(BranchOrder::Numeric).downstream_of(["1_intro", "2_ch"], "main");
        assert!(picked.is_empty());
    }

    #[test]
    fn test_base_is_last_chapter() {
        let picked = selector(BranchOrder::Numeric).downstream_of(["1_a", "2_b"], "2_b");
        assert!(picked.is_empty());
    }

    #[test]
    fn test_natural_key_segments() {
        assert_eq!(
            natural_key("10_ch2"),
            vec![Segment::Number(10), Segment::Text("_ch"), Segment::Number(2)]
        );
    }

    #[test]
    fn test_leading_zeros_tie_break() {
        let order = BranchOrder::Numeric;
        assert_eq!(order.compare("01_a", "1_a"), Ordering::Less);
        assert_eq!(order.compare("1_a", "01_a"), Ordering::Greater);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(BranchSelector::new("[", BranchOrder::Numeric).is_err());
    }

    proptest! {
        #[test]
        fn prop_numeric_matches_chapter_number(a in 0u32..5000, b in 0u32..5000) {
            let left = format!("{}_chapter", a);
            let right = format!("{}_chapter", b);
            prop_assert_eq!(BranchOrder::Numeric.compare(&left, &right), a.cmp(&b));
        }

        #[test]
        fn prop_downstream_is_sorted_and_after_base(
            nums in proptest::collection::vec(0u32..200, 0..20),
            base in 0u32..200,
        ) {
            let names: Vec<String> = nums.iter().map(|n| format!("{}_ch", n)).collect();
            let base = format!("{}_ch", base);
            for order in [BranchOrder::Numeric, BranchOrder::Lexicographic] {
                let picked = selector(order).downstream_of(names.clone(), &base);
                for pair in picked.windows(2) {
                    prop_assert_eq!(order.compare(&pair[0], &pair[1]), Ordering::Less);
                }
                for name in &picked {
                    prop_assert_eq!(order.compare(name, &base), Ordering::Greater);
                }
            }
        }
    }
}
