use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue tracker that answered for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSource {
    GitHubIssues,
    Jira,
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHubIssues => f.write_str("GitHubIssues"),
            Self::Jira => f.write_str("Jira"),
        }
    }
}

/// GitHub issue number or Jira issue key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueId {
    Number(u64),
    Key(String),
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub source: IssueSource,
    #[serde(rename = "number")]
    pub number_or_key: IssueId,
    pub title: String,
    pub body: String,
    /// Lowercase lifecycle token ("open", "closed", "resolved", ...)
    pub state: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<ChangelogEntry>,
}

/// Lowercases and trims a tracker state name.
pub fn normalize_state(state: &str) -> String {
    state.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    /// First parent; `None` only for a root commit
    pub parent_hash: Option<String>,
    pub author: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugFixAssociation {
    pub commit_hash: String,
    pub commit_message: String,
    pub matched_issue_id: Option<IssueId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub filename: String,
    pub added_lines: u64,
    pub deleted_lines: u64,
    #[serde(rename = "diff")]
    pub diff_text: String,
}

/// A commit together with every file it modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDiff {
    #[serde(flatten)]
    pub commit: CommitRecord,
    pub modified_files: Vec<FileDiff>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortSample {
    pub commit_hash: String,
    pub previous_hash: String,
    pub author: String,
    pub touched_loc: u64,
}

/// Persisted bug-fix document for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugFixReport {
    pub project: String,
    pub using_issue_tracker: IssueSource,
    pub bug_fixing_commits: Vec<BugFixAssociation>,
    pub issues: Vec<IssueRecord>,
}

/// Per-project status recorded by the run coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub project: String,
    pub diff_ok: bool,
    pub effort_ok: bool,
    pub bugfix_ok: bool,
    pub refactoring_ok: bool,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            diff_ok: false,
            effort_ok: false,
            bugfix_ok: false,
            refactoring_ok: false,
            error: None,
        }
    }

    /// Appends a stage failure to the error text.
    pub fn record_error(&mut self, stage: &str, error: impl fmt::Display) {
        let entry = format!("{stage}: {error}");
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}; {entry}"),
            None => entry,
        });
    }
}
