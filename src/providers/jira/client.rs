use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::error::{MinerError, Result};
use crate::records::IssueRecord;

use super::types::SearchResponse;

const SEARCH_FIELDS: &str = "summary,description,status";

/// Jira REST client for project issue search.
pub struct JiraClient {
    client: Client,
    base_url: String,
    page_size: usize,
    include_changelog: bool,
    page_delay: Duration,
}

impl JiraClient {
    pub fn new(
        base_url: &str,
        page_size: usize,
        include_changelog: bool,
        page_delay: Duration,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(MinerError::Config("Jira page size must be positive".into()));
        }

        let client = Client::builder()
            .user_agent("repominer/0.3")
            .build()
            .map_err(|e| MinerError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            include_changelog,
            page_delay,
        })
    }

    /// Fetch every issue of a Jira project via JQL search.
    ///
    /// Pages are requested with `startAt`/`maxResults`; the loop ends on the
    /// first page shorter than the requested page size.
    pub async fn fetch_issues(&self, project_key: &str) -> Result<Vec<IssueRecord>> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let jql = format!("project = \"{project_key}\" ORDER BY key ASC");
        let max_results = self.page_size.to_string();

        let mut all_issues = Vec::new();
        let mut start_at = 0;

        loop {
            let start = start_at.to_string();
            let mut request = self.client.get(&url).query(&[
                ("jql", jql.as_str()),
                ("startAt", start.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", SEARCH_FIELDS),
            ]);

            if self.include_changelog {
                request = request.query(&[("expand", "changelog")]);
            }

            let response = request.send().await?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(MinerError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: SearchResponse = response.json().await?;
            let fetched = page.issues.len();

            debug!(
                "Fetched Jira issues {start_at}..{} of {} for {project_key}",
                start_at + fetched,
                page.total
            );

            all_issues.extend(page.issues.into_iter().map(IssueRecord::from));

            if fetched < self.page_size {
                break;
            }

            start_at += fetched;
            tokio::time::sleep(self.page_delay).await;
        }

        Ok(all_issues)
    }
}
