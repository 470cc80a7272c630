use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::artifacts::{write_atomic, DEVELOPER_TOTALS_FILE, EFFORT_FILE};
use crate::error::{MinerError, Result};
use crate::records::EffortSample;

use super::checkout::WorkingTree;
use super::tools::{check_output, run_tool};

/// Token index of the line count on the `Total` row (`Total Files Lines ...`).
const LOC_COLUMN: usize = 2;
const SCC_FLAGS: [&str; 1] = ["--no-cocomo"];

/// Counts lines of code in the current state of a working tree.
#[allow(async_fn_in_trait)]
pub trait LineCounter {
    async fn count_lines(&self, dir: &Path) -> Result<u64>;
}

/// [`LineCounter`] backed by the `scc` binary.
pub struct SccCounter {
    program: String,
}

impl SccCounter {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl LineCounter for SccCounter {
    async fn count_lines(&self, dir: &Path) -> Result<u64> {
        let output = run_tool(&self.program, &SCC_FLAGS, Some(dir)).await?;
        check_output(&output, &self.program)?;
        parse_total_loc(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Finds the `Total` row of a tabular report and reads its line count.
pub fn parse_total_loc(report: &str) -> Result<u64> {
    let unexpected = |message: String| MinerError::ToolOutput {
        tool: "scc".to_string(),
        message,
    };

    let row = report
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|tokens| tokens.first() == Some(&"Total"))
        .ok_or_else(|| unexpected("no Total row".to_string()))?;

    let value = row
        .get(LOC_COLUMN)
        .ok_or_else(|| unexpected(format!("Total row has {} columns", row.len())))?;

    value
        .replace(',', "")
        .parse()
        .map_err(|_| unexpected(format!("non-numeric line count {value:?}")))
}

/// Computes touched lines of code for every adjacent commit pair.
///
/// Each commit is checked out and counted once. A pair is skipped (and logged)
/// when either side could not be counted. The tree is moved back to the ref it
/// started on afterwards.
pub async fn aggregate_effort(
    tree: &impl WorkingTree,
    counter: &impl LineCounter,
) -> Result<Vec<EffortSample>> {
    let commits = tree.commits().await?;
    let original_ref = tree.head_ref().await?;

    info!("Counting lines of code across {} commits", commits.len());

    let mut samples = Vec::new();
    let mut previous: Option<(&str, Option<u64>)> = None;

    for commit in &commits {
        let loc = match count_at(tree, counter, &commit.hash).await {
            Ok(loc) => Some(loc),
            Err(e) => {
                warn!("Line count failed at {}: {e}", commit.hash);
                None
            }
        };

        if let Some((previous_hash, previous_loc)) = previous {
            match (previous_loc, loc) {
                (Some(before), Some(after)) => samples.push(EffortSample {
                    commit_hash: commit.hash.clone(),
                    previous_hash: previous_hash.to_string(),
                    author: commit.author.clone(),
                    touched_loc: after.abs_diff(before),
                }),
                _ => warn!(
                    "Skipping effort sample {previous_hash} -> {}: line count unavailable",
                    commit.hash
                ),
            }
        }

        previous = Some((commit.hash.as_str(), loc));
    }

    if let Err(e) = tree.checkout(&original_ref).await {
        warn!("Could not restore working tree to {original_ref}: {e}");
    }

    info!("Collected {} effort samples", samples.len());
    Ok(samples)
}

async fn count_at(tree: &impl WorkingTree, counter: &impl LineCounter, hash: &str) -> Result<u64> {
    tree.checkout(hash).await?;
    counter.count_lines(tree.path()).await
}

#[derive(Debug, Serialize)]
struct EffortRow<'a> {
    refactoring_hash: &'a str,
    previous_hash: &'a str,
    #[serde(rename = "TLOC")]
    tloc: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DeveloperTotal {
    pub author: String,
    pub commits: u64,
    #[serde(rename = "TLOC")]
    pub tloc: u64,
}

/// Sums samples per commit author, sorted by author.
pub fn developer_totals(samples: &[EffortSample]) -> Vec<DeveloperTotal> {
    let mut totals: BTreeMap<&str, DeveloperTotal> = BTreeMap::new();

    for sample in samples {
        let total = totals
            .entry(&sample.author)
            .or_insert_with(|| DeveloperTotal {
                author: sample.author.clone(),
                ..DeveloperTotal::default()
            });
        total.commits += 1;
        total.tloc += sample.touched_loc;
    }

    totals.into_values().collect()
}

pub fn save_effort(samples: &[EffortSample], output_dir: &Path) -> Result<()> {
    write_atomic(&output_dir.join(EFFORT_FILE), |writer| {
        let mut csv = csv::Writer::from_writer(writer);
        if samples.is_empty() {
            csv.write_record(["refactoring_hash", "previous_hash", "TLOC"])?;
        }
        for sample in samples {
            csv.serialize(EffortRow {
                refactoring_hash: &sample.commit_hash,
                previous_hash: &sample.previous_hash,
                tloc: sample.touched_loc,
            })?;
        }
        csv.flush()?;
        Ok(())
    })?;

    write_atomic(&output_dir.join(DEVELOPER_TOTALS_FILE), |writer| {
        let mut csv = csv::Writer::from_writer(writer);
        let totals = developer_totals(samples);
        if totals.is_empty() {
            csv.write_record(["author", "commits", "TLOC"])?;
        }
        for total in totals {
            csv.serialize(total)?;
        }
        csv.flush()?;
        Ok(())
    })
}
