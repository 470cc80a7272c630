use std::fs;
use std::path::Path;

use url::Url;

use crate::error::{MinerError, Result};

/// A source-control project from the corpus list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub url: String,
    pub name: String,
}

impl Project {
    pub fn new(url: &str) -> Result<Self> {
        let url = url.trim();
        let name = short_name(url)
            .ok_or_else(|| MinerError::InvalidProjectUrl(url.to_string()))?
            .to_string();

        Ok(Self {
            url: url.to_string(),
            name,
        })
    }

    /// Owner and repository segments of a GitHub-style URL.
    pub fn owner_repo(&self) -> Result<(String, String)> {
        let parsed =
            Url::parse(&self.url).map_err(|_| MinerError::InvalidProjectUrl(self.url.clone()))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [.., owner, repo] => Ok((
                (*owner).to_string(),
                repo.strip_suffix(".git").unwrap_or(repo).to_string(),
            )),
            _ => Err(MinerError::InvalidProjectUrl(self.url.clone())),
        }
    }
}

/// Last path segment with any `.git` suffix removed.
fn short_name(url: &str) -> Option<&str> {
    let last = url.trim_end_matches('/').rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then_some(name)
}

/// Reads the project list, skipping blank lines and `#` comments.
pub fn load_projects(path: &Path) -> Result<Vec<Project>> {
    let contents = fs::read_to_string(path)?;

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Project::new)
        .collect()
}
