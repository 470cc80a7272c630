use serde::Deserialize;

use crate::records::{normalize_state, ChangelogEntry, IssueId, IssueRecord, IssueSource};

/// Response of `GET /rest/api/2/search`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub fields: JiraFields,
    pub changelog: Option<JiraChangelog>,
}

#[derive(Debug, Deserialize)]
pub struct JiraFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub status: Option<JiraStatus>,
}

#[derive(Debug, Deserialize)]
pub struct JiraStatus {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JiraChangelog {
    #[serde(default)]
    pub histories: Vec<JiraHistory>,
}

#[derive(Debug, Deserialize)]
pub struct JiraHistory {
    #[serde(default)]
    pub items: Vec<JiraHistoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct JiraHistoryItem {
    pub field: String,
    #[serde(rename = "fromString")]
    pub from: Option<String>,
    #[serde(rename = "toString")]
    pub to: Option<String>,
}

impl From<JiraIssue> for IssueRecord {
    fn from(issue: JiraIssue) -> Self {
        let changelog = issue
            .changelog
            .map(|changelog| {
                changelog
                    .histories
                    .into_iter()
                    .flat_map(|history| history.items)
                    .map(|item| ChangelogEntry {
                        field: item.field,
                        from: item.from,
                        to: item.to,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            source: IssueSource::Jira,
            number_or_key: IssueId::Key(issue.key),
            title: issue.fields.summary.unwrap_or_default(),
            body: issue.fields.description.unwrap_or_default(),
            state: issue
                .fields
                .status
                .map(|status| normalize_state(&status.name))
                .unwrap_or_default(),
            changelog,
        }
    }
}
