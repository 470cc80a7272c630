//! Small on-disk git repositories for exercising the git adapters.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub(crate) const INITIAL_MESSAGE: &str = "Initial import";
pub(crate) const ACCENT_MESSAGE: &str = "Fix accents, closes #7";
pub(crate) const EMPTY_MESSAGE: &str = "Empty commit";

pub(crate) fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Ada",
            "-c",
            "user.email=ada@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Three commits under `root/origin`:
/// 1. `a.txt`
/// 2. `a.txt` grows a line, `café.txt` and `my file.txt` are added
/// 3. an empty commit
pub(crate) fn history_repo(root: &Path) -> PathBuf {
    let origin = root.join("origin");
    fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "--quiet"]);

    fs::write(origin.join("a.txt"), "one\n").unwrap();
    git(&origin, &["add", "-A"]);
    git(&origin, &["commit", "--quiet", "-m", INITIAL_MESSAGE]);

    fs::write(origin.join("a.txt"), "one\ntwo\n").unwrap();
    fs::write(origin.join("café.txt"), "bonjour\n").unwrap();
    fs::write(origin.join("my file.txt"), "hello\n").unwrap();
    git(&origin, &["add", "-A"]);
    git(&origin, &["commit", "--quiet", "-m", ACCENT_MESSAGE]);

    git(&origin, &["commit", "--quiet", "--allow-empty", "-m", EMPTY_MESSAGE]);

    origin
}
