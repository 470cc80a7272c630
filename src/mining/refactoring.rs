use std::fs::{self, File};
use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use log::info;
use serde::Deserialize;

use crate::artifacts::{
    write_atomic, REFACTORING_ARCHIVE_FILE, REFACTORING_RAW_FILE, REFACTORING_STATS_FILE,
};
use crate::error::{MinerError, Result};

use super::tools::{check_output, run_tool};

pub const TOTAL_LABEL: &str = "Total Refactorings";
pub const COMMIT_GAP_LABEL: &str = "Average Number of Commits Between Refactorings";
pub const PER_COMMIT_LABEL: &str = "Average Refactors per Refactoring Commit";

/// Detects refactorings across the full history of a checkout.
#[allow(async_fn_in_trait)]
pub trait RefactoringDetector {
    /// Analyses `checkout` and writes the JSON report to `report`.
    async fn detect(&self, checkout: &Path, report: &Path) -> Result<()>;
}

/// [`RefactoringDetector`] backed by the RefactoringMiner command line.
pub struct RefactoringMinerCli {
    program: String,
}

impl RefactoringMinerCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl RefactoringDetector for RefactoringMinerCli {
    async fn detect(&self, checkout: &Path, report: &Path) -> Result<()> {
        let checkout = checkout.to_string_lossy();
        let report = report.to_string_lossy();
        let output = run_tool(&self.program, &["-a", &checkout, "-json", &report], None).await?;
        check_output(&output, "RefactoringMiner")
    }
}

#[derive(Debug, Deserialize)]
struct DetectorReport {
    #[serde(default)]
    commits: Vec<DetectedCommit>,
}

#[derive(Debug, Deserialize)]
struct DetectedCommit {
    #[serde(default)]
    refactorings: Vec<DetectedRefactoring>,
}

#[derive(Debug, Deserialize)]
struct DetectedRefactoring {
    #[serde(rename = "type")]
    kind: String,
}

/// Label to value, aggregates first, then per-type counts in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct RefactoringSummary {
    pub entries: IndexMap<String, f64>,
}

impl RefactoringSummary {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries.get(label).copied()
    }
}

fn mean(numerator: usize, divisor: usize) -> f64 {
    if divisor == 0 {
        0.0
    } else {
        numerator as f64 / divisor as f64
    }
}

fn summarize(report: &DetectorReport) -> RefactoringSummary {
    let mut per_type: IndexMap<String, f64> = IndexMap::new();
    let mut total = 0;
    let mut refactoring_commits = 0;

    for commit in &report.commits {
        if commit.refactorings.is_empty() {
            continue;
        }
        refactoring_commits += 1;
        for refactoring in &commit.refactorings {
            *per_type.entry(refactoring.kind.clone()).or_default() += 1.0;
            total += 1;
        }
    }

    let mut entries = IndexMap::new();
    entries.insert(TOTAL_LABEL.to_string(), total as f64);
    entries.insert(
        COMMIT_GAP_LABEL.to_string(),
        mean(report.commits.len(), refactoring_commits),
    );
    entries.insert(PER_COMMIT_LABEL.to_string(), mean(total, refactoring_commits));
    entries.extend(per_type);

    RefactoringSummary { entries }
}

/// Parses a detector report into its summary.
pub fn summarize_report(json: &str) -> Result<RefactoringSummary> {
    let report: DetectorReport = serde_json::from_str(json)?;
    Ok(summarize(&report))
}

/// Runs the detector, writes the summary CSV and replaces the raw report
/// with its gzip archive.
pub async fn summarize_refactorings(
    detector: &impl RefactoringDetector,
    checkout: &Path,
    output_dir: &Path,
) -> Result<RefactoringSummary> {
    let raw = output_dir.join(REFACTORING_RAW_FILE);
    detector.detect(checkout, &raw).await?;

    if !raw.is_file() {
        return Err(MinerError::ToolOutput {
            tool: "RefactoringMiner".to_string(),
            message: format!("no report written to {}", raw.display()),
        });
    }

    let summary = summarize_report(&fs::read_to_string(&raw)?)?;
    info!(
        "Detected {} refactorings in {}",
        summary.get(TOTAL_LABEL).unwrap_or_default(),
        checkout.display()
    );

    save_summary(&summary, output_dir)?;
    archive_report(&raw, &output_dir.join(REFACTORING_ARCHIVE_FILE))?;

    Ok(summary)
}

pub fn save_summary(summary: &RefactoringSummary, output_dir: &Path) -> Result<()> {
    write_atomic(&output_dir.join(REFACTORING_STATS_FILE), |writer| {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (label, value) in &summary.entries {
            csv.write_record([label.as_str(), &value.to_string()])?;
        }
        csv.flush()?;
        Ok(())
    })
}

/// Compresses `raw` into `archive`; `raw` is removed only once the archive is durable.
fn archive_report(raw: &Path, archive: &Path) -> Result<()> {
    write_atomic(archive, |writer| {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        io::copy(&mut File::open(raw)?, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    })?;

    fs::remove_file(raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    const REPORT: &str = r#"{
        "commits": [
            {"sha1": "c1", "refactorings": [
                {"type": "Extract Method", "description": "..."},
                {"type": "Rename Variable", "description": "..."}
            ]},
            {"sha1": "c2", "refactorings": []},
            {"sha1": "c3", "refactorings": [
                {"type": "Rename Variable", "description": "..."}
            ]},
            {"sha1": "c4", "refactorings": []}
        ]
    }"#;

    struct WritingDetector(&'static str);

    impl RefactoringDetector for WritingDetector {
        async fn detect(&self, _checkout: &Path, report: &Path) -> Result<()> {
            fs::write(report, self.0)?;
            Ok(())
        }
    }

    struct SilentDetector;

    impl RefactoringDetector for SilentDetector {
        async fn detect(&self, _checkout: &Path, _report: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_summary_aggregates_then_types() {
        let summary = summarize_report(REPORT).unwrap();

        let labels: Vec<_> = summary.entries.keys().map(String::as_str).collect();
        assert_eq!(
            labels,
            vec![
                TOTAL_LABEL,
                COMMIT_GAP_LABEL,
                PER_COMMIT_LABEL,
                "Extract Method",
                "Rename Variable"
            ]
        );
        assert_eq!(summary.get(TOTAL_LABEL), Some(3.0));
        assert_eq!(summary.get(COMMIT_GAP_LABEL), Some(2.0));
        assert_eq!(summary.get(PER_COMMIT_LABEL), Some(1.5));
        assert_eq!(summary.get("Rename Variable"), Some(2.0));
    }

    #[test]
    fn test_no_refactoring_commits_gives_zero_averages() {
        let summary =
            summarize_report(r#"{"commits": [{"refactorings": []}, {"refactorings": []}]}"#)
                .unwrap();

        assert_eq!(summary.get(TOTAL_LABEL), Some(0.0));
        assert_eq!(summary.get(COMMIT_GAP_LABEL), Some(0.0));
        assert_eq!(summary.get(PER_COMMIT_LABEL), Some(0.0));
        assert_eq!(summary.entries.len(), 3);
    }

    #[test]
    fn test_malformed_report_is_an_error() {
        assert!(summarize_report("not json").is_err());
    }

    #[tokio::test]
    async fn test_artifacts_and_archive() {
        let temp_dir = TempDir::new().unwrap();

        summarize_refactorings(&WritingDetector(REPORT), Path::new("/checkout"), temp_dir.path())
            .await
            .unwrap();

        let csv = fs::read_to_string(temp_dir.path().join(REFACTORING_STATS_FILE)).unwrap();
        assert!(csv.starts_with("Total Refactorings,3\n"));
        assert!(csv.contains("Average Refactors per Refactoring Commit,1.5\n"));
        assert!(csv.ends_with("Rename Variable,2\n"));

        assert!(!temp_dir.path().join(REFACTORING_RAW_FILE).exists());

        let mut restored = String::new();
        GzDecoder::new(File::open(temp_dir.path().join(REFACTORING_ARCHIVE_FILE)).unwrap())
            .read_to_string(&mut restored)
            .unwrap();
        assert_eq!(restored, REPORT);
    }

    #[tokio::test]
    async fn test_missing_report_fails_the_stage() {
        let temp_dir = TempDir::new().unwrap();

        let result =
            summarize_refactorings(&SilentDetector, Path::new("/checkout"), temp_dir.path()).await;

        assert!(matches!(result, Err(MinerError::ToolOutput { .. })));
        assert!(!temp_dir.path().join(REFACTORING_STATS_FILE).exists());
    }
}
