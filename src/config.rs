use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration file structure for repominer.
///
/// Holds API endpoints, external tool locations and run layout so a corpus
/// can be re-mined with the same settings. Configuration files are loaded
/// from the current directory or a specified path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub REST API base URL
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Pause between paginated requests (milliseconds)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JiraConfig {
    /// Jira instance base URL
    #[serde(default = "default_jira_base_url")]
    pub base_url: String,

    /// Requested `maxResults` per search page
    #[serde(default = "default_jira_page_size")]
    pub page_size: usize,

    /// Expand per-issue changelogs
    #[serde(default)]
    pub include_changelog: bool,

    /// Pause between paginated requests (milliseconds)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Explicit project short name to Jira key overrides
    #[serde(default)]
    pub project_keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolsConfig {
    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_scc")]
    pub scc: String,

    #[serde(default = "default_refactoring_miner")]
    pub refactoring_miner: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitSource {
    /// Local `git log` of the checkout
    #[default]
    Checkout,
    /// GitHub commits API
    Github,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// Project list, one URL per line
    #[serde(default = "default_sources")]
    pub sources: PathBuf,

    /// Where checkouts are materialized
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// Root of the per-project output tree
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,

    #[serde(default = "default_inter_project_delay_secs")]
    pub inter_project_delay_secs: u64,

    /// Where bug-fix mining reads commit messages from
    #[serde(default)]
    pub commit_source: CommitSource,

    /// Run the refactoring detector stage
    #[serde(default = "default_true")]
    pub refactoring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VerifyConfig {
    /// Prefix joined with a project directory name in missing lists
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProbeConfig {
    /// CSV file with a `project` column
    #[serde(default = "default_probe_input")]
    pub input: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Abort once more than this many links failed
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,

    #[serde(default = "default_probe_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_web_base")]
    pub web_base: String,

    #[serde(default = "default_org")]
    pub org: String,

    /// Output file for reachable project URLs
    #[serde(default = "default_sources")]
    pub sources: PathBuf,

    /// Output file for unreachable project URLs
    #[serde(default = "default_failed")]
    pub failed: PathBuf,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: default_jira_base_url(),
            page_size: default_jira_page_size(),
            include_changelog: false,
            page_delay_ms: default_page_delay_ms(),
            project_keys: BTreeMap::new(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            scc: default_scc(),
            refactoring_miner: default_refactoring_miner(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            repos_dir: default_repos_dir(),
            outputs_dir: default_outputs_dir(),
            inter_project_delay_secs: default_inter_project_delay_secs(),
            commit_source: CommitSource::default(),
            refactoring: true,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_url_prefix(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            input: default_probe_input(),
            chunk_size: default_chunk_size(),
            max_failures: default_max_failures(),
            delay_ms: default_probe_delay_ms(),
            web_base: default_web_base(),
            org: default_org(),
            sources: default_sources(),
            failed: default_failed(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_jira_base_url() -> String {
    "https://issues.apache.org/jira".to_string()
}

fn default_jira_page_size() -> usize {
    50
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_git() -> String {
    "git".to_string()
}

fn default_scc() -> String {
    "scc".to_string()
}

fn default_refactoring_miner() -> String {
    "RefactoringMiner-3.0.9/bin/RefactoringMiner".to_string()
}

fn default_sources() -> PathBuf {
    PathBuf::from("sources.txt")
}

fn default_failed() -> PathBuf {
    PathBuf::from("failed.txt")
}

fn default_repos_dir() -> PathBuf {
    PathBuf::from("Repos")
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("Outputs")
}

fn default_inter_project_delay_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_url_prefix() -> String {
    "https://github.com/apache".to_string()
}

fn default_probe_input() -> PathBuf {
    PathBuf::from("sonar_measures.csv")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_failures() -> usize {
    50
}

fn default_probe_delay_ms() -> u64 {
    100
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_org() -> String {
    "apache".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./repominer.toml
    /// 3. ./repominer.json
    /// 4. ./repominer.yaml
    /// 5. ./repominer.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "repominer.toml",
            "repominer.json",
            "repominer.yaml",
            "repominer.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Jira project key for a project short name.
    ///
    /// Explicit overrides win; otherwise the short name is uppercased, which
    /// matches the Apache convention (`ant` -> `ANT`).
    pub fn jira_key_for(&self, short_name: &str) -> String {
        self.jira
            .project_keys
            .get(short_name)
            .cloned()
            .unwrap_or_else(|| short_name.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.jira.page_size, 50);
        assert_eq!(config.probe.max_failures, 50);
        assert_eq!(config.run.inter_project_delay_secs, 2);
        assert_eq!(config.run.commit_source, CommitSource::Checkout);
        assert!(config.run.refactoring);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[github]
token = "ghp-test-token"
api-url = "https://github.example.com/api/v3"

[jira]
page-size = 100
include-changelog = true

[jira.project-keys]
commons-lang = "LANG"

[run]
outputs-dir = "/tmp/outputs"
commit-source = "github"
refactoring = false
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.github.token, Some("ghp-test-token".to_string()));
        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        assert_eq!(config.jira.page_size, 100);
        assert!(config.jira.include_changelog);
        assert_eq!(config.run.outputs_dir, PathBuf::from("/tmp/outputs"));
        assert_eq!(config.run.commit_source, CommitSource::Github);
        assert!(!config.run.refactoring);
        assert_eq!(config.jira_key_for("commons-lang"), "LANG");
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "tools": {
    "scc": "/usr/local/bin/scc"
  },
  "probe": {
    "max-failures": 5
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.tools.scc, "/usr/local/bin/scc");
        assert_eq!(config.tools.git, "git");
        assert_eq!(config.probe.max_failures, 5);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "verify:\n  url-prefix: https://github.com/eclipse\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.verify.url_prefix, "https://github.com/eclipse");
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let result = Config::load(Some(Path::new("definitely-missing-repominer.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_jira_key_defaults_to_uppercase_name() {
        let config = Config::default();
        assert_eq!(config.jira_key_for("ant"), "ANT");
    }
}
