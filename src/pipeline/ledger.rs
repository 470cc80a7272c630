use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::artifacts::{write_json, RUN_REPORT_FILE};
use crate::error::Result;
use crate::records::RunOutcome;

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    outcomes: &'a [RunOutcome],
}

/// Outcomes of a mining run, checkpointed to `run-report.json` after every project.
#[derive(Debug)]
pub struct RunLedger {
    path: PathBuf,
    started_at: DateTime<Utc>,
    outcomes: Vec<RunOutcome>,
}

impl RunLedger {
    pub fn new(outputs_root: &Path) -> Self {
        Self {
            path: outputs_root.join(RUN_REPORT_FILE),
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }

    /// Adds an outcome and rewrites the report file.
    pub fn record(&mut self, outcome: RunOutcome) -> Result<()> {
        self.outcomes.push(outcome);
        self.flush()
    }

    pub fn flush(&self) -> Result<()> {
        write_json(
            &self.path,
            &RunReport {
                started_at: self.started_at,
                updated_at: Utc::now(),
                outcomes: &self.outcomes,
            },
        )?;
        debug!("Run report updated: {}", self.path.display());
        Ok(())
    }
}
