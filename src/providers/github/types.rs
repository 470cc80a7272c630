use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::records::{normalize_state, CommitRecord, IssueId, IssueRecord, IssueSource};

/// Issue as returned by `GET /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    /// Present when the entry is a pull request
    pub pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<GitHubIssue> for IssueRecord {
    fn from(issue: GitHubIssue) -> Self {
        Self {
            source: IssueSource::GitHubIssues,
            number_or_key: IssueId::Number(issue.number),
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            state: normalize_state(&issue.state),
            changelog: Vec::new(),
        }
    }
}

/// Commit as returned by `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: GitHubCommitDetail,
    #[serde(default)]
    pub parents: Vec<GitHubParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    pub message: String,
    pub author: Option<GitHubSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSignature {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubParent {
    pub sha: String,
}

impl From<GitHubCommit> for CommitRecord {
    fn from(commit: GitHubCommit) -> Self {
        let (author, timestamp) = commit
            .commit
            .author
            .map_or_else(|| (String::new(), DateTime::default()), |a| (a.name, a.date));

        Self {
            hash: commit.sha,
            parent_hash: commit.parents.into_iter().next().map(|p| p.sha),
            author,
            timestamp,
            message: commit.commit.message,
        }
    }
}
