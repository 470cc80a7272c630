use log::{info, warn};

use crate::error::{MinerError, Result};
use crate::records::{IssueRecord, IssueSource};

use super::{GitHubClient, JiraClient};

/// Result of querying one issue source.
///
/// `Empty` and `Unavailable` both lead to fallback; they are kept apart so the
/// reason can be logged.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Vec<IssueRecord>),
    Empty,
    Unavailable(MinerError),
}

impl From<Result<Vec<IssueRecord>>> for FetchOutcome {
    fn from(result: Result<Vec<IssueRecord>>) -> Self {
        match result {
            Ok(issues) if issues.is_empty() => Self::Empty,
            Ok(issues) => Self::Found(issues),
            Err(e) => Self::Unavailable(e),
        }
    }
}

/// Issues of a project together with the tracker that supplied them.
#[derive(Debug, Clone)]
pub struct ResolvedIssues {
    pub source: IssueSource,
    pub issues: Vec<IssueRecord>,
}

/// Picks GitHub Issues or Jira as the authoritative tracker for a project.
pub struct IssueSourceResolver {
    github: GitHubClient,
    jira: JiraClient,
}

impl IssueSourceResolver {
    pub fn new(github: GitHubClient, jira: JiraClient) -> Self {
        Self { github, jira }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Resolves the issue set for a project.
    ///
    /// GitHub is queried first. When it errors or returns nothing, Jira is
    /// queried with `jira_key`, and its answer is final for this project.
    ///
    /// # Errors
    ///
    /// Returns an error only when the Jira fallback itself fails.
    pub async fn resolve(&self, owner: &str, repo: &str, jira_key: &str) -> Result<ResolvedIssues> {
        match FetchOutcome::from(self.github.fetch_issues(owner, repo).await) {
            FetchOutcome::Found(issues) => {
                info!("Using GitHub Issues for {owner}/{repo} ({} issues)", issues.len());
                return Ok(ResolvedIssues {
                    source: IssueSource::GitHubIssues,
                    issues,
                });
            }
            FetchOutcome::Empty => {
                info!("No GitHub issues for {owner}/{repo}, falling back to Jira project {jira_key}");
            }
            FetchOutcome::Unavailable(e) => {
                warn!("GitHub Issues unavailable for {owner}/{repo} ({e}), falling back to Jira project {jira_key}");
            }
        }

        let issues = self.jira.fetch_issues(jira_key).await?;
        info!("Using Jira for {jira_key} ({} issues)", issues.len());

        Ok(ResolvedIssues {
            source: IssueSource::Jira,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::records::IssueId;

    fn resolver_for(github: &mockito::ServerGuard, jira: &mockito::ServerGuard) -> IssueSourceResolver {
        IssueSourceResolver::new(
            GitHubClient::new(&github.url(), None, Duration::ZERO).unwrap(),
            JiraClient::new(&jira.url(), 50, false, Duration::ZERO).unwrap(),
        )
    }

    fn jira_body() -> String {
        json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "issues": [{
                "id": "1",
                "key": "FOO-3",
                "fields": { "summary": "Crash", "description": null, "status": { "name": "Resolved" } }
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_github_answer_is_final() {
        let mut github = mockito::Server::new_async().await;
        let mut jira = mockito::Server::new_async().await;

        github
            .mock("GET", "/repos/apache/foo/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{ "number": 7, "title": "NPE", "body": "", "state": "closed" }]).to_string())
            .create_async()
            .await;

        let jira_mock = jira
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let resolved = resolver_for(&github, &jira)
            .resolve("apache", "foo", "FOO")
            .await
            .unwrap();

        jira_mock.assert_async().await;
        assert_eq!(resolved.source, IssueSource::GitHubIssues);
        assert_eq!(resolved.issues[0].number_or_key, IssueId::Number(7));
    }

    #[tokio::test]
    async fn test_empty_github_falls_back_to_jira() {
        let mut github = mockito::Server::new_async().await;
        let mut jira = mockito::Server::new_async().await;

        github
            .mock("GET", "/repos/apache/foo/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        jira.mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(jira_body())
            .create_async()
            .await;

        let resolved = resolver_for(&github, &jira)
            .resolve("apache", "foo", "FOO")
            .await
            .unwrap();

        assert_eq!(resolved.source, IssueSource::Jira);
        assert_eq!(resolved.issues[0].number_or_key, IssueId::Key("FOO-3".into()));
    }

    #[tokio::test]
    async fn test_github_error_falls_back_to_jira() {
        let mut github = mockito::Server::new_async().await;
        let mut jira = mockito::Server::new_async().await;

        github
            .mock("GET", "/repos/apache/foo/issues")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        jira.mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(jira_body())
            .create_async()
            .await;

        let resolved = resolver_for(&github, &jira)
            .resolve("apache", "foo", "FOO")
            .await
            .unwrap();

        assert_eq!(resolved.source, IssueSource::Jira);
        assert_eq!(resolved.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_both_sources_failing_is_an_error() {
        let mut github = mockito::Server::new_async().await;
        let mut jira = mockito::Server::new_async().await;

        github
            .mock("GET", "/repos/apache/foo/issues")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        jira.mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = resolver_for(&github, &jira)
            .resolve("apache", "foo", "FOO")
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_outcome_classification() {
        assert!(matches!(FetchOutcome::from(Ok(Vec::new())), FetchOutcome::Empty));
        assert!(matches!(
            FetchOutcome::from(Err(MinerError::Config("x".into()))),
            FetchOutcome::Unavailable(_)
        ));
    }
}
