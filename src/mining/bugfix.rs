use std::path::Path;

use log::info;

use crate::artifacts::{write_json, BUG_FIX_FILE};
use crate::error::Result;
use crate::project::Project;
use crate::providers::IssueSourceResolver;
use crate::records::{BugFixReport, CommitRecord};

use super::correlator::CommitIssueCorrelator;

/// Resolves the project's issues and correlates them with its commits.
pub async fn mine_bug_fixes(
    resolver: &IssueSourceResolver,
    project: &Project,
    jira_key: &str,
    commits: &[CommitRecord],
) -> Result<BugFixReport> {
    info!("Mining bug-fixing commits for {}", project.name);

    let (owner, repo) = project.owner_repo()?;
    let resolved = resolver.resolve(&owner, &repo, jira_key).await?;

    let correlator = CommitIssueCorrelator::new(&resolved.issues);
    let bug_fixing_commits = correlator.correlate(commits);

    let linked = bug_fixing_commits
        .iter()
        .filter(|a| a.matched_issue_id.is_some())
        .count();
    info!(
        "Found {} bug-fixing commits ({linked} linked to {} issues) in {}",
        bug_fixing_commits.len(),
        resolved.source,
        project.name
    );

    Ok(BugFixReport {
        project: project.url.clone(),
        using_issue_tracker: resolved.source,
        bug_fixing_commits,
        issues: resolved.issues,
    })
}

pub fn save_bug_fix_report(report: &BugFixReport, output_dir: &Path) -> Result<()> {
    write_json(&output_dir.join(BUG_FIX_FILE), report)
}
