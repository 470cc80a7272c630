use std::path::Path;
use std::time::Duration;

use log::{error, info, warn};

use crate::artifacts::{project_output_dir, ArtifactKind, REFACTORING_STATS_FILE};
use crate::config::{CommitSource, Config};
use crate::error::Result;
use crate::mining::{
    aggregate_effort, extract_diffs, mine_bug_fixes, save_bug_fix_report, save_commit_diffs,
    save_effort, summarize_refactorings, Checkout, GitHistoryWalker, RefactoringMinerCli,
    SccCounter, WorkingTree,
};
use crate::output::StageProgress;
use crate::project::Project;
use crate::providers::IssueSourceResolver;
use crate::records::{CommitRecord, RunOutcome};

use super::ledger::RunLedger;

/// Drives every mining stage for each project in turn.
///
/// A failing stage is recorded in the project's outcome and never stops the
/// run; only a failed clone skips the remaining stages of that project.
pub struct RunCoordinator<'a> {
    config: &'a Config,
    resolver: IssueSourceResolver,
    skip_complete: bool,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(config: &'a Config, resolver: IssueSourceResolver, skip_complete: bool) -> Self {
        Self {
            config,
            resolver,
            skip_complete,
        }
    }

    fn outputs_root(&self) -> &Path {
        &self.config.run.outputs_dir
    }

    /// Mines all projects, flushing the ledger after each one.
    ///
    /// A report that cannot be written is logged and retried with the next
    /// project; it never stops the run.
    pub async fn run(&self, projects: &[Project]) -> Result<RunLedger> {
        std::fs::create_dir_all(self.outputs_root())?;
        let mut ledger = RunLedger::new(self.outputs_root());
        let delay = Duration::from_secs(self.config.run.inter_project_delay_secs);

        for (index, project) in projects.iter().enumerate() {
            info!(
                "Project {}/{}: {}",
                index + 1,
                projects.len(),
                project.url
            );

            if let Some(outcome) = self.already_complete(project) {
                info!("Skipping {}: all artifacts present", project.name);
                checkpoint(&mut ledger, outcome);
                continue;
            }

            let outcome = self.mine_project(project).await;
            if let Some(e) = &outcome.error {
                warn!("{} finished with errors: {e}", project.name);
            }
            checkpoint(&mut ledger, outcome);

            if index + 1 < projects.len() {
                tokio::time::sleep(delay).await;
            }
        }

        if let Err(e) = ledger.flush() {
            warn!(
                "Run report {} could not be written; outcomes are only in the summary: {e}",
                ledger.path().display()
            );
        }
        Ok(ledger)
    }

    fn already_complete(&self, project: &Project) -> Option<RunOutcome> {
        if !self.skip_complete {
            return None;
        }

        let dir = self.outputs_root().join(&project.name);
        let refactoring = self.config.run.refactoring;
        if !ArtifactKind::VERIFIED.iter().all(|kind| kind.exists_in(&dir))
            || (refactoring && !dir.join(REFACTORING_STATS_FILE).is_file())
        {
            return None;
        }

        let mut outcome = RunOutcome::new(&project.url);
        outcome.diff_ok = true;
        outcome.effort_ok = true;
        outcome.bugfix_ok = true;
        outcome.refactoring_ok = refactoring;
        Some(outcome)
    }

    /// Runs every stage for one project; errors end up in the outcome.
    pub async fn mine_project(&self, project: &Project) -> RunOutcome {
        let mut outcome = RunOutcome::new(&project.url);

        let output_dir = match project_output_dir(self.outputs_root(), &project.name) {
            Ok(dir) => dir,
            Err(e) => {
                error!("Cannot create output directory for {}: {e}", project.name);
                outcome.record_error("output", e);
                return outcome;
            }
        };

        let progress = StageProgress::start(&project.name, "Cloning");
        let checkout_dir = self.config.run.repos_dir.join(&project.name);
        let checkout = match Checkout::acquire(&self.config.tools.git, &project.url, &checkout_dir).await {
            Ok(checkout) => {
                progress.succeed();
                checkout
            }
            Err(e) => {
                progress.fail();
                error!("Clone of {} failed: {e}", project.url);
                outcome.record_error("clone", e);
                return outcome;
            }
        };

        let progress = StageProgress::start(&project.name, "Extracting diffs");
        let result = self.diff_stage(&checkout, &output_dir).await;
        outcome.diff_ok = settle(&mut outcome, project, "diff", result, progress);

        let progress = StageProgress::start(&project.name, "Aggregating effort");
        let result = self.effort_stage(&checkout, &output_dir).await;
        outcome.effort_ok = settle(&mut outcome, project, "effort", result, progress);

        let progress = StageProgress::start(&project.name, "Mining bug fixes");
        let result = self.bugfix_stage(project, &checkout, &output_dir).await;
        outcome.bugfix_ok = settle(&mut outcome, project, "bugfix", result, progress);

        if self.config.run.refactoring {
            let progress = StageProgress::start(&project.name, "Detecting refactorings");
            let result = self.refactoring_stage(&checkout, &output_dir).await;
            outcome.refactoring_ok = settle(&mut outcome, project, "refactoring", result, progress);
        } else {
            info!("Refactoring detection disabled, skipping {}", project.name);
        }

        if let Err(e) = checkout.release() {
            error!("Could not delete checkout of {}: {e}", project.name);
            outcome.record_error("release", e);
        }

        outcome
    }

    async fn diff_stage(&self, checkout: &Checkout, output_dir: &Path) -> Result<()> {
        let diffs = extract_diffs(&GitHistoryWalker::new(checkout)).await?;
        save_commit_diffs(&diffs, output_dir)
    }

    async fn effort_stage(&self, checkout: &Checkout, output_dir: &Path) -> Result<()> {
        let counter = SccCounter::new(&self.config.tools.scc);
        let samples = aggregate_effort(checkout, &counter).await?;
        save_effort(&samples, output_dir)
    }

    async fn bugfix_stage(
        &self,
        project: &Project,
        checkout: &Checkout,
        output_dir: &Path,
    ) -> Result<()> {
        let commits = self.commit_history(project, checkout).await?;
        let jira_key = self.config.jira_key_for(&project.name);
        let report = mine_bug_fixes(&self.resolver, project, &jira_key, &commits).await?;
        save_bug_fix_report(&report, output_dir)
    }

    async fn commit_history(
        &self,
        project: &Project,
        checkout: &Checkout,
    ) -> Result<Vec<CommitRecord>> {
        match self.config.run.commit_source {
            CommitSource::Checkout => checkout.commits().await,
            CommitSource::Github => {
                let (owner, repo) = project.owner_repo()?;
                self.resolver.github().fetch_commits(&owner, &repo).await
            }
        }
    }

    async fn refactoring_stage(&self, checkout: &Checkout, output_dir: &Path) -> Result<()> {
        let detector = RefactoringMinerCli::new(&self.config.tools.refactoring_miner);
        summarize_refactorings(&detector, checkout.path(), output_dir)
            .await
            .map(|_| ())
    }
}

fn checkpoint(ledger: &mut RunLedger, outcome: RunOutcome) {
    if let Err(e) = ledger.record(outcome) {
        error!("Failed to update run report {}: {e}", ledger.path().display());
    }
}

/// Records a stage result; returns whether the stage succeeded.
fn settle(
    outcome: &mut RunOutcome,
    project: &Project,
    stage: &str,
    result: Result<()>,
    progress: StageProgress,
) -> bool {
    match result {
        Ok(()) => {
            progress.succeed();
            true
        }
        Err(e) => {
            progress.fail();
            error!("Stage {stage} failed for {}: {e}", project.name);
            outcome.record_error(stage, e);
            false
        }
    }
}
