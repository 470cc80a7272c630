use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::auth::Token;
use crate::error::{MinerError, Result};
use crate::records::{CommitRecord, IssueRecord};

use super::types::{GitHubCommit, GitHubIssue};

pub(crate) const PER_PAGE: usize = 100;

/// GitHub REST client for issue and commit history.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for GitHub API
    base_url: String,
    /// Pause between page requests
    page_delay: Duration,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `token` - Optional GitHub personal access token, sent as a bearer token
    /// * `page_delay` - Fixed pause between paginated requests
    pub fn new(base_url: &str, token: Option<Token>, page_delay: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repominer/0.3"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|e| MinerError::Config(format!("Invalid GitHub token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| MinerError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_delay,
        })
    }

    /// Fetch every issue of a repository (`state=all`), excluding pull requests.
    pub async fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<IssueRecord>> {
        let url = format!("{}/repos/{owner}/{repo}/issues", self.base_url);
        let issues: Vec<GitHubIssue> = self.fetch_all_pages(&url, &[("state", "all")]).await?;

        Ok(issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(IssueRecord::from)
            .collect())
    }

    /// Fetch the commit history of the default branch, oldest first.
    pub async fn fetch_commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRecord>> {
        let url = format!("{}/repos/{owner}/{repo}/commits", self.base_url);
        let commits: Vec<GitHubCommit> = self.fetch_all_pages(&url, &[]).await?;

        // API returns newest first
        Ok(commits.into_iter().rev().map(CommitRecord::from).collect())
    }

    async fn fetch_all_pages<T>(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let per_page = PER_PAGE.to_string();
            let page_param = page.to_string();

            let response = self
                .client
                .get(url)
                .query(params)
                .query(&[("per_page", per_page.as_str()), ("page", page_param.as_str())])
                .send()
                .await?;

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

            let items: Vec<T> = response.json().await?;
            let fetched = items.len();
            all_items.extend(items);

            debug!("Fetched page {page} of {url} ({fetched} items)");

            if fetched < PER_PAGE {
                break;
            }

            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        Ok(all_items)
    }
}
