use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

pub const BUG_FIX_FILE: &str = "bug-fixing-commits.json";
pub const DIFF_FILE: &str = "diff_analysis.json";
pub const EFFORT_FILE: &str = "developers-effort.csv";
pub const DEVELOPER_TOTALS_FILE: &str = "developer-totals.csv";
pub const REFACTORING_STATS_FILE: &str = "rminer_analysis.csv";
pub const REFACTORING_RAW_FILE: &str = "rminer_output.json";
pub const REFACTORING_ARCHIVE_FILE: &str = "rminer_output.json.gz";
pub const RUN_REPORT_FILE: &str = "run-report.json";

/// Per-project artifact that the verifier audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Diff,
    Effort,
    BugFix,
}

impl ArtifactKind {
    pub const VERIFIED: [Self; 3] = [Self::Diff, Self::Effort, Self::BugFix];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Diff => DIFF_FILE,
            Self::Effort => EFFORT_FILE,
            Self::BugFix => BUG_FIX_FILE,
        }
    }

    pub fn missing_list(self) -> &'static str {
        match self {
            Self::Diff => "no_diff.txt",
            Self::Effort => "no_effort.txt",
            Self::BugFix => "no_bugfix.txt",
        }
    }

    pub fn exists_in(self, project_dir: &Path) -> bool {
        project_dir.join(self.file_name()).is_file()
    }
}

/// Output directory for one project, created on demand.
pub fn project_output_dir(outputs_root: &Path, project_name: &str) -> Result<PathBuf> {
    let dir = outputs_root.join(project_name);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Path of the in-progress sibling used for atomic replacement.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Writes `contents` through a temporary sibling and renames it into place,
/// so readers never observe a half-written artifact.
pub fn write_atomic<F>(path: &Path, contents: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = partial_path(path);
    let result = write_and_rename(&partial, path, contents);
    if result.is_err() && partial.exists() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_and_rename<F>(partial: &Path, path: &Path, contents: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(partial)?);
    contents(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(partial, path)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writeln!(writer)?;
        Ok(())
    })
}
