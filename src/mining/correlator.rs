use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::records::{BugFixAssociation, CommitRecord, IssueId, IssueRecord};

/// Case-insensitive substrings that mark a commit as bug-fixing.
pub const BUG_FIX_KEYWORDS: [&str; 3] = ["fix", "bug", "error"];

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#([A-Za-z][A-Za-z0-9]*-[0-9]+|[0-9]+)\b").expect("reference pattern is valid")
    })
}

pub fn is_bug_fix(message: &str) -> bool {
    let message = message.to_lowercase();
    BUG_FIX_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

/// Links commit messages to known issues through `#<id>` tokens.
pub struct CommitIssueCorrelator {
    known: HashMap<String, IssueId>,
}

impl CommitIssueCorrelator {
    pub fn new(issues: &[IssueRecord]) -> Self {
        let known = issues
            .iter()
            .map(|issue| (issue.number_or_key.to_string(), issue.number_or_key.clone()))
            .collect();

        Self { known }
    }

    /// First `#<id>` token in the message that names a known issue.
    pub fn matched_issue(&self, message: &str) -> Option<IssueId> {
        reference_pattern()
            .captures_iter(message)
            .filter_map(|caps| caps.get(1))
            .find_map(|token| self.known.get(token.as_str()).cloned())
    }

    /// Classifies one commit; `None` when it is not bug-fixing.
    pub fn classify(&self, commit: &CommitRecord) -> Option<BugFixAssociation> {
        if !is_bug_fix(&commit.message) {
            return None;
        }

        Some(BugFixAssociation {
            commit_hash: commit.hash.clone(),
            commit_message: commit.message.clone(),
            matched_issue_id: self.matched_issue(&commit.message),
        })
    }

    /// Bug-fixing commits in input order, linked where possible.
    pub fn correlate(&self, commits: &[CommitRecord]) -> Vec<BugFixAssociation> {
        commits.iter().filter_map(|c| self.classify(c)).collect()
    }
}
