use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::output;
use crate::pipeline::{verify_outputs, LinkProber, ProbeLedger, RunCoordinator};
use crate::project::load_projects;
use crate::providers::{GitHubClient, IssueSourceResolver, JiraClient};

#[derive(Parser)]
#[command(name = "repominer")]
#[command(author, version, about = "Repository History Mining Pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./repominer.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine every project of the project list
    Mine {
        /// Project list, one URL per line
        #[arg(short, long)]
        sources: Option<PathBuf>,

        /// Skip projects whose artifacts are all present
        #[arg(long, default_value_t = false)]
        skip_complete: bool,

        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Audit the output tree and rewrite the missing-artifact lists
    Verify {
        #[arg(short, long)]
        outputs: Option<PathBuf>,
    },

    /// Build the project list by probing repository URLs
    Probe {
        /// CSV file with a `project` column
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

impl Cli {
    async fn execute_mine(
        &self,
        mut config: Config,
        sources: Option<&Path>,
        skip_complete: bool,
        token: Option<&str>,
    ) -> Result<()> {
        if let Some(sources) = sources {
            config.run.sources = sources.to_path_buf();
        }
        if let Some(token) = token {
            config.github.token = Some(token.to_string());
        }

        let projects = load_projects(&config.run.sources).with_context(|| {
            format!(
                "Failed to read project list: {}",
                config.run.sources.display()
            )
        })?;
        info!("Mining {} projects from {}", projects.len(), config.run.sources.display());

        let github = GitHubClient::new(
            &config.github.api_url,
            config.github.token.as_deref().map(Token::from),
            Duration::from_millis(config.github.page_delay_ms),
        )?;
        let jira = JiraClient::new(
            &config.jira.base_url,
            config.jira.page_size,
            config.jira.include_changelog,
            Duration::from_millis(config.jira.page_delay_ms),
        )?;
        let resolver = IssueSourceResolver::new(github, jira);

        let ledger = RunCoordinator::new(&config, resolver, skip_complete)
            .run(&projects)
            .await?;

        output::print_run_summary(ledger.outcomes());
        Ok(())
    }

    fn execute_verify(&self, config: &Config, outputs: Option<&Path>) -> Result<()> {
        let outputs = outputs.unwrap_or(&config.run.outputs_dir);
        let list_dir = outputs
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        info!("Verifying outputs under {}", outputs.display());
        let report = verify_outputs(outputs, list_dir, &config.verify.url_prefix)
            .with_context(|| format!("Failed to verify outputs: {}", outputs.display()))?;

        output::print_verification(&report);
        Ok(())
    }

    async fn execute_probe(&self, mut config: Config, input: Option<&Path>) -> Result<()> {
        if let Some(input) = input {
            config.probe.input = input.to_path_buf();
        }

        info!("Probing project links from {}", config.probe.input.display());
        let prober = LinkProber::new(&config.probe)?;
        let mut ledger = ProbeLedger::new(&config.probe.sources, &config.probe.failed);

        let result = prober.run(&config.probe.input, &mut ledger).await;
        output::print_probe_summary(&ledger);
        result?;

        info!("Project list written to {}", config.probe.sources.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Mine {
                sources,
                skip_complete,
                token,
            } => {
                self.execute_mine(config, sources.as_deref(), *skip_complete, token.as_deref())
                    .await
            }
            Commands::Verify { outputs } => self.execute_verify(&config, outputs.as_deref()),
            Commands::Probe { input } => self.execute_probe(config, input.as_deref()).await,
        }
    }
}
