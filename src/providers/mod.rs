mod github;
mod jira;
mod resolver;

pub use github::GitHubClient;
pub use jira::JiraClient;
pub use resolver::IssueSourceResolver;
