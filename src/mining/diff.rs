use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

use crate::artifacts::{write_json, DIFF_FILE};
use crate::error::{MinerError, Result};
use crate::records::{CommitDiff, FileDiff};

use super::checkout::{parse_log, Checkout, LOG_FORMAT};

/// Source of per-commit, per-file change data.
///
/// Everything downstream consumes [`CommitDiff`]; implementations are the only
/// place that knows how the raw history is obtained.
#[allow(async_fn_in_trait)]
pub trait HistoryWalker {
    /// Every commit, oldest first, with its modified files.
    async fn walk(&self) -> Result<Vec<CommitDiff>>;
}

/// [`HistoryWalker`] backed by `git log --numstat` and `git show`.
pub struct GitHistoryWalker<'a> {
    checkout: &'a Checkout,
}

impl<'a> GitHistoryWalker<'a> {
    pub fn new(checkout: &'a Checkout) -> Self {
        Self { checkout }
    }

    async fn patch_texts(&self, hash: &str) -> Result<HashMap<String, String>> {
        let stdout = self
            .checkout
            .git(&[
                "show",
                "--format=",
                "--patch",
                "--no-renames",
                "--no-color",
                "--no-ext-diff",
                hash,
            ])
            .await?;

        Ok(split_patch(&stdout))
    }
}

impl HistoryWalker for GitHistoryWalker<'_> {
    async fn walk(&self) -> Result<Vec<CommitDiff>> {
        let stdout = self
            .checkout
            .git(&["log", "--reverse", "--no-renames", "--numstat", LOG_FORMAT])
            .await?;

        let mut diffs = Vec::new();

        for (commit, trailer) in parse_log(&stdout)? {
            let stats = parse_numstat(trailer)?;

            let mut texts = if stats.is_empty() {
                HashMap::new()
            } else {
                self.patch_texts(&commit.hash).await.unwrap_or_else(|e| {
                    warn!("Could not read patch of commit {}: {e}", commit.hash);
                    HashMap::new()
                })
            };

            let modified_files = stats
                .into_iter()
                .map(|(filename, added_lines, deleted_lines)| FileDiff {
                    diff_text: texts.remove(&filename).unwrap_or_default(),
                    filename,
                    added_lines,
                    deleted_lines,
                })
                .collect();

            diffs.push(CommitDiff {
                commit,
                modified_files,
            });
        }

        Ok(diffs)
    }
}

/// Runs the walker over the whole history.
///
/// Any walker failure fails the whole extraction; nothing partial is returned.
pub async fn extract_diffs(walker: &impl HistoryWalker) -> Result<Vec<CommitDiff>> {
    let diffs = walker.walk().await?;

    let files: usize = diffs.iter().map(|d| d.modified_files.len()).sum();
    info!("Extracted {} commits touching {files} files", diffs.len());

    Ok(diffs)
}

pub fn save_commit_diffs(diffs: &[CommitDiff], output_dir: &Path) -> Result<()> {
    write_json(&output_dir.join(DIFF_FILE), &diffs)
}

/// Parses `--numstat` lines; binary files (`-`) count as zero.
fn parse_numstat(block: &str) -> Result<Vec<(String, u64, u64)>> {
    block
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut parts = line.splitn(3, '\t');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(added), Some(deleted), Some(path)) => Ok((
                    unquote_path(path),
                    parse_count(added, line)?,
                    parse_count(deleted, line)?,
                )),
                _ => Err(bad_numstat(line)),
            }
        })
        .collect()
}

fn parse_count(value: &str, line: &str) -> Result<u64> {
    if value == "-" {
        return Ok(0);
    }
    value.parse().map_err(|_| bad_numstat(line))
}

fn bad_numstat(line: &str) -> MinerError {
    MinerError::ToolOutput {
        tool: "git log --numstat".to_string(),
        message: format!("unexpected line {line:?}"),
    }
}

/// Post-image path of a `diff --git a/<path> b/<path>` header.
fn header_path(header: &str) -> String {
    if header.ends_with('"') {
        if let Some(start) = header.rfind(" \"b/") {
            let quoted = unquote_path(&header[start + 1..]);
            return quoted.strip_prefix("b/").unwrap_or(&quoted).to_string();
        }
    }

    header
        .rsplit_once(" b/")
        .map_or(header, |(_, path)| path)
        .to_string()
}

/// Decodes a path git printed as a C-style quoted string; other paths pass through.
fn unquote_path(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();

    while let Some(byte) = chars.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }

        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'v') => bytes.push(0x0b),
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Splits a multi-file patch into per-file hunk text keyed by path.
fn split_patch(patch: &str) -> HashMap<String, String> {
    let mut texts = HashMap::new();
    let mut current: Option<(String, String)> = None;
    let mut in_hunks = false;

    for line in patch.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some((path, text)) = current.take() {
                texts.insert(path, text);
            }
            let path = header_path(header);
            current = Some((path, String::new()));
            in_hunks = false;
            continue;
        }

        let Some((_, text)) = current.as_mut() else {
            continue;
        };

        if line.starts_with("@@") {
            in_hunks = true;
        }

        if in_hunks {
            text.push_str(line);
            text.push('\n');
        }
    }

    if let Some((path, text)) = current {
        texts.insert(path, text);
    }

    texts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::fixtures::{history_repo, EMPTY_MESSAGE};
    use crate::records::CommitRecord;
    use chrono::Utc;

    const PATCH: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 83db48f..bf269f4 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 fn main() {
-    old();
+    new();
+    more();
 }
diff --git a/logo.png b/logo.png
new file mode 100644
index 0000000..e69de29
Binary files /dev/null and b/logo.png differ
";

    #[test]
    fn test_parse_numstat() {
        let stats = parse_numstat("\n2\t1\tsrc/lib.rs\n-\t-\tlogo.png\n").unwrap();
        assert_eq!(
            stats,
            vec![
                ("src/lib.rs".to_string(), 2, 1),
                ("logo.png".to_string(), 0, 0)
            ]
        );
    }

    #[test]
    fn test_parse_numstat_rejects_garbage() {
        assert!(parse_numstat("two\tone\tsrc/lib.rs").is_err());
    }

    #[test]
    fn test_split_patch_keeps_hunks_only() {
        let texts = split_patch(PATCH);

        let lib = &texts["src/lib.rs"];
        assert!(lib.starts_with("@@ -1,3 +1,4 @@"));
        assert!(lib.contains("+    more();"));
        assert!(!lib.contains("index 83db48f"));

        assert_eq!(texts["logo.png"], "");
    }

    #[test]
    fn test_quoted_paths_are_decoded() {
        assert_eq!(unquote_path("\"caf\\303\\251.txt\""), "café.txt");
        assert_eq!(unquote_path("\"tab\\there.txt\""), "tab\there.txt");
        assert_eq!(unquote_path("\"say \\\"hi\\\".txt\""), "say \"hi\".txt");
        assert_eq!(unquote_path("my file.txt"), "my file.txt");
    }

    #[test]
    fn test_numstat_with_quoted_path() {
        let stats = parse_numstat("1\t0\t\"caf\\303\\251.txt\"\n").unwrap();
        assert_eq!(stats, vec![("café.txt".to_string(), 1, 0)]);
    }

    #[test]
    fn test_split_patch_with_quoted_header() {
        let patch = "\
diff --git \"a/caf\\303\\251.txt\" \"b/caf\\303\\251.txt\"
new file mode 100644
--- /dev/null
+++ \"b/caf\\303\\251.txt\"
@@ -0,0 +1 @@
+bonjour
";
        let texts = split_patch(patch);
        assert_eq!(texts["café.txt"], "@@ -0,0 +1 @@\n+bonjour\n");
    }

    struct FixedWalker(Vec<CommitDiff>);

    impl HistoryWalker for FixedWalker {
        async fn walk(&self) -> Result<Vec<CommitDiff>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenWalker;

    impl HistoryWalker for BrokenWalker {
        async fn walk(&self) -> Result<Vec<CommitDiff>> {
            Err(MinerError::Git {
                operation: "git log".into(),
                stderr: "fatal: not a git repository".into(),
            })
        }
    }

    fn empty_commit(hash: &str) -> CommitDiff {
        CommitDiff {
            commit: CommitRecord {
                hash: hash.to_string(),
                parent_hash: None,
                author: "Ada".to_string(),
                timestamp: Utc::now(),
                message: "Empty commit".to_string(),
            },
            modified_files: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_commits_without_files_are_kept() {
        let diffs = extract_diffs(&FixedWalker(vec![empty_commit("c1")]))
            .await
            .unwrap();

        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].modified_files.is_empty());
    }

    #[tokio::test]
    async fn test_walk_of_real_history() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let origin = history_repo(temp_dir.path());
        let checkout = Checkout::acquire(
            "git",
            &origin.to_string_lossy(),
            &temp_dir.path().join("Repos").join("origin"),
        )
        .await
        .unwrap();

        let diffs = extract_diffs(&GitHistoryWalker::new(&checkout)).await.unwrap();

        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].commit.parent_hash, None);
        assert_eq!(
            diffs[1].commit.parent_hash.as_deref(),
            Some(diffs[0].commit.hash.as_str())
        );
        assert_eq!(
            diffs[2].commit.parent_hash.as_deref(),
            Some(diffs[1].commit.hash.as_str())
        );

        let initial = &diffs[0].modified_files;
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].filename, "a.txt");
        assert!(initial[0].diff_text.contains("+one"));

        let file = |name: &str| {
            diffs[1]
                .modified_files
                .iter()
                .find(|f| f.filename == name)
                .unwrap_or_else(|| panic!("{name} missing from {:?}", diffs[1].modified_files))
        };

        let accented = file("café.txt");
        assert_eq!((accented.added_lines, accented.deleted_lines), (1, 0));
        assert!(accented.diff_text.starts_with("@@"));
        assert!(accented.diff_text.contains("+bonjour"));

        let spaced = file("my file.txt");
        assert!(spaced.diff_text.contains("+hello"));

        let grown = file("a.txt");
        assert_eq!((grown.added_lines, grown.deleted_lines), (1, 0));
        assert!(grown.diff_text.contains("+two"));

        assert_eq!(diffs[2].commit.message, EMPTY_MESSAGE);
        assert!(diffs[2].modified_files.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_history_fails_the_extraction() {
        assert!(extract_diffs(&BrokenWalker).await.is_err());
    }

    #[test]
    fn test_saved_document_shape() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut diff = empty_commit("c1");
        diff.modified_files.push(FileDiff {
            filename: "src/lib.rs".to_string(),
            added_lines: 2,
            deleted_lines: 1,
            diff_text: "@@ -1 +1 @@\n".to_string(),
        });

        save_commit_diffs(&[diff], temp_dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp_dir.path().join(DIFF_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved[0]["hash"], "c1");
        assert!(saved[0]["parent_hash"].is_null());
        assert_eq!(saved[0]["modified_files"][0]["added_lines"], 2);
        assert_eq!(saved[0]["modified_files"][0]["diff"], "@@ -1 +1 @@\n");
    }
}
