use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::error::{MinerError, Result};
use crate::records::CommitRecord;

use super::tools::run_tool;

/// `git log` record layout: fields split by 0x1f, header closed by 0x1d,
/// records introduced by 0x1e.
pub(crate) const LOG_FORMAT: &str = "--format=%x1e%H%x1f%P%x1f%an%x1f%aI%x1f%B%x1d";

/// Working tree that can be moved between commits.
#[allow(async_fn_in_trait)]
pub trait WorkingTree {
    fn path(&self) -> &Path;

    /// Commits reachable from HEAD, oldest first.
    async fn commits(&self) -> Result<Vec<CommitRecord>>;

    /// Moves the working tree to `rev`, discarding local state.
    async fn checkout(&self, rev: &str) -> Result<()>;

    /// Branch name, or commit hash when detached.
    async fn head_ref(&self) -> Result<String>;
}

/// A cloned project on local storage.
///
/// Exactly one checkout exists at a time; [`Checkout::release`] deletes it.
#[derive(Debug)]
pub struct Checkout {
    git: String,
    dir: PathBuf,
}

impl Checkout {
    /// Clones `url` into `dir`, replacing anything left there by an earlier run.
    pub async fn acquire(git: &str, url: &str, dir: &Path) -> Result<Self> {
        if dir.exists() {
            info!("Removing stale checkout at {}", dir.display());
            fs::remove_dir_all(dir)?;
        }

        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        info!("Cloning repository: {url}");
        let dir_str = dir.to_string_lossy();
        let output = run_tool(git, &["clone", "--quiet", url, &dir_str], None).await?;
        check_git(&output, "git clone")?;
        info!("Successfully cloned repository to {}", dir.display());

        Ok(Self {
            git: git.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    /// Runs a git command inside the checkout and returns its stdout.
    ///
    /// Paths are printed verbatim (`core.quotePath=false`); only paths with
    /// control characters, quotes or backslashes still come back C-quoted.
    pub(crate) async fn git(&self, args: &[&str]) -> Result<String> {
        let mut full_args = vec!["-c", "core.quotePath=false"];
        full_args.extend_from_slice(args);
        let output = run_tool(&self.git, &full_args, Some(&self.dir)).await?;
        check_git(&output, &format!("git {}", args.first().copied().unwrap_or_default()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Deletes the working copy.
    pub fn release(self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        info!("Successfully deleted {}", self.dir.display());
        Ok(())
    }
}

impl WorkingTree for Checkout {
    fn path(&self) -> &Path {
        &self.dir
    }

    async fn commits(&self) -> Result<Vec<CommitRecord>> {
        let stdout = self.git(&["log", "--reverse", LOG_FORMAT]).await?;
        let commits: Vec<_> = parse_log(&stdout)?.into_iter().map(|(commit, _)| commit).collect();
        debug!("Listed {} commits in {}", commits.len(), self.dir.display());
        Ok(commits)
    }

    async fn checkout(&self, rev: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", "--force", rev]).await.map(|_| ())
    }

    async fn head_ref(&self) -> Result<String> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = branch.trim();

        if branch == "HEAD" {
            return Ok(self.git(&["rev-parse", "HEAD"]).await?.trim().to_string());
        }

        Ok(branch.to_string())
    }
}

pub(crate) fn check_git(output: &Output, operation: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    Err(MinerError::Git {
        operation: operation.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Parses `git log` output produced with [`LOG_FORMAT`].
///
/// Returns each commit with whatever followed its header (numstat lines when
/// requested).
pub(crate) fn parse_log(stdout: &str) -> Result<Vec<(CommitRecord, &str)>> {
    stdout
        .split('\x1e')
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<(CommitRecord, &str)> {
    let (header, trailer) = record.split_once('\x1d').unwrap_or((record, ""));
    let fields: Vec<&str> = header.splitn(5, '\x1f').collect();

    let [hash, parents, author, date, message] = fields.as_slice() else {
        return Err(malformed(record));
    };

    let timestamp = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|_| malformed(record))?
        .with_timezone(&Utc);

    let commit = CommitRecord {
        hash: hash.trim().to_string(),
        parent_hash: parents.split_whitespace().next().map(ToString::to_string),
        author: (*author).to_string(),
        timestamp,
        message: message.trim_end().to_string(),
    };

    Ok((commit, trailer))
}

fn malformed(record: &str) -> MinerError {
    let preview: String = record.chars().take(80).collect();
    MinerError::ToolOutput {
        tool: "git log".to_string(),
        message: format!("malformed record: {preview:?}"),
    }
}
