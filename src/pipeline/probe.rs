use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};

use crate::artifacts::write_atomic;
use crate::config::ProbeConfig;
use crate::error::{MinerError, Result};
use crate::output::ItemProgress;

const PROJECT_COLUMN: &str = "project";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachable and unreachable project URLs found so far.
///
/// Flushing rewrites both files in full, sorted.
#[derive(Debug)]
pub struct ProbeLedger {
    sources_path: PathBuf,
    failed_path: PathBuf,
    seen: HashSet<String>,
    successful: BTreeSet<String>,
    failed: BTreeSet<String>,
}

impl ProbeLedger {
    pub fn new(sources_path: &Path, failed_path: &Path) -> Self {
        Self {
            sources_path: sources_path.to_path_buf(),
            failed_path: failed_path.to_path_buf(),
            seen: HashSet::new(),
            successful: BTreeSet::new(),
            failed: BTreeSet::new(),
        }
    }

    /// Marks a project name as seen; `false` if it already was.
    fn first_sighting(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_string())
    }

    fn record(&mut self, url: String, reachable: bool) {
        if reachable {
            self.successful.insert(url);
        } else {
            self.failed.insert(url);
        }
    }

    pub fn successful(&self) -> usize {
        self.successful.len()
    }

    pub fn failed(&self) -> usize {
        self.failed.len()
    }

    pub fn processed(&self) -> usize {
        self.seen.len()
    }

    pub fn flush(&self) -> Result<()> {
        write_lines(&self.sources_path, &self.successful)?;
        write_lines(&self.failed_path, &self.failed)
    }
}

fn write_lines(path: &Path, lines: &BTreeSet<String>) -> Result<()> {
    write_atomic(path, |writer| {
        for line in lines {
            writeln!(writer, "{line}")?;
        }
        Ok(())
    })
}

/// Builds the project list by checking which candidate repositories exist.
pub struct LinkProber {
    client: Client,
    web_base: String,
    org: String,
    chunk_size: usize,
    max_failures: usize,
    delay: Duration,
}

impl LinkProber {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(MinerError::Config("probe chunk-size must be positive".into()));
        }

        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("repominer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            web_base: config.web_base.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            chunk_size: config.chunk_size,
            max_failures: config.max_failures,
            delay: Duration::from_millis(config.delay_ms),
        })
    }

    /// Repository URL for a raw project name from the measures file.
    pub fn project_url(&self, raw_name: &str) -> String {
        let name = raw_name.to_lowercase();
        let org_prefix = format!("{}_", self.org);
        let name = name.strip_prefix(&org_prefix).unwrap_or(&name);
        format!("{}/{}/{name}", self.web_base, self.org)
    }

    /// Probes every distinct project of `input`, chunk by chunk.
    ///
    /// The ledger is flushed after each chunk and before aborting.
    ///
    /// # Errors
    ///
    /// Returns [`MinerError::TooManyFailedProbes`] once more than
    /// `max-failures` links failed, and an error when the input cannot be read.
    pub async fn run(&self, input: &Path, ledger: &mut ProbeLedger) -> Result<()> {
        let mut reader = csv::Reader::from_path(input)?;
        let column = reader
            .headers()?
            .iter()
            .position(|header| header == PROJECT_COLUMN)
            .ok_or_else(|| {
                MinerError::Config(format!(
                    "{} has no '{PROJECT_COLUMN}' column",
                    input.display()
                ))
            })?;

        let mut records = reader.into_records();
        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            for record in records.by_ref().take(self.chunk_size) {
                if let Some(name) = record?.get(column) {
                    chunk.push(name.to_lowercase());
                }
            }
            if chunk.is_empty() {
                break;
            }

            self.probe_chunk(chunk, ledger).await?;
            ledger.flush()?;
            info!(
                "Progress: {} successful links, {} failed links",
                ledger.successful(),
                ledger.failed()
            );
        }

        Ok(())
    }

    async fn probe_chunk(&self, chunk: Vec<String>, ledger: &mut ProbeLedger) -> Result<()> {
        let fresh: Vec<String> = chunk
            .into_iter()
            .filter(|name| ledger.first_sighting(name))
            .collect();

        if fresh.is_empty() {
            return Ok(());
        }

        info!("Processing {} new unique projects", fresh.len());
        let progress = ItemProgress::new(fresh.len(), "Probing links");

        for name in &fresh {
            let url = self.project_url(name);
            let reachable = self.is_reachable(&url).await;
            ledger.record(url, reachable);
            progress.advance();

            tokio::time::sleep(self.delay).await;

            if ledger.failed() > self.max_failures {
                progress.abandon();
                ledger.flush()?;
                return Err(MinerError::TooManyFailedProbes(ledger.failed()));
            }
        }

        progress.finish();
        Ok(())
    }

    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("Reachable: {url}");
                true
            }
            Ok(response) => {
                warn!("Link failed ({}): {url}", response.status());
                false
            }
            Err(e) => {
                warn!("Link failed ({e}): {url}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn probe_config(web_base: &str) -> ProbeConfig {
        ProbeConfig {
            web_base: web_base.to_string(),
            delay_ms: 0,
            ..ProbeConfig::default()
        }
    }

    fn write_measures(dir: &Path, rows: &str) -> PathBuf {
        let path = dir.join("sonar_measures.csv");
        fs::write(&path, format!("metric,project\n{rows}")).unwrap();
        path
    }

    #[test]
    fn test_project_url_strips_org_prefix() {
        let prober = LinkProber::new(&probe_config("https://github.com/")).unwrap();
        assert_eq!(
            prober.project_url("Apache_Commons-IO"),
            "https://github.com/apache/commons-io"
        );
        assert_eq!(prober.project_url("ant"), "https://github.com/apache/ant");
    }

    #[tokio::test]
    async fn test_probe_sorts_and_deduplicates() {
        let mut server = mockito::Server::new_async().await;
        let ant = server
            .mock("HEAD", "/apache/ant")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("HEAD", "/apache/zookeeper")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("HEAD", "/apache/camel")
            .with_status(200)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let input = write_measures(
            temp_dir.path(),
            "ncloc,Ant\nbugs,apache_zookeeper\nncloc,ant\nbugs,camel\n",
        );
        let sources = temp_dir.path().join("sources.txt");
        let failed = temp_dir.path().join("failed.txt");

        let config = ProbeConfig {
            chunk_size: 2,
            ..probe_config(&server.url())
        };
        let mut ledger = ProbeLedger::new(&sources, &failed);
        LinkProber::new(&config)
            .unwrap()
            .run(&input, &mut ledger)
            .await
            .unwrap();

        ant.assert_async().await;
        let base = server.url();
        assert_eq!(
            fs::read_to_string(&sources).unwrap(),
            format!("{base}/apache/ant\n{base}/apache/camel\n")
        );
        assert_eq!(
            fs::read_to_string(&failed).unwrap(),
            format!("{base}/apache/zookeeper\n")
        );
        assert_eq!(ledger.processed(), 3);
    }

    #[tokio::test]
    async fn test_too_many_failures_aborts_after_flush() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let input = write_measures(temp_dir.path(), "x,a\nx,b\nx,c\nx,d\n");
        let sources = temp_dir.path().join("sources.txt");
        let failed = temp_dir.path().join("failed.txt");

        let config = ProbeConfig {
            max_failures: 2,
            ..probe_config(&server.url())
        };
        let mut ledger = ProbeLedger::new(&sources, &failed);
        let result = LinkProber::new(&config)
            .unwrap()
            .run(&input, &mut ledger)
            .await;

        assert!(matches!(result, Err(MinerError::TooManyFailedProbes(3))));
        assert_eq!(fs::read_to_string(&failed).unwrap().lines().count(), 3);
        assert_eq!(fs::read_to_string(&sources).unwrap(), "");
    }

    #[tokio::test]
    async fn test_input_without_project_column() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("measures.csv");
        fs::write(&input, "metric,value\nncloc,10\n").unwrap();

        let mut ledger = ProbeLedger::new(
            &temp_dir.path().join("sources.txt"),
            &temp_dir.path().join("failed.txt"),
        );
        let result = LinkProber::new(&probe_config("http://127.0.0.1:9"))
            .unwrap()
            .run(&input, &mut ledger)
            .await;

        assert!(matches!(result, Err(MinerError::Config(_))));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let config = ProbeConfig {
            chunk_size: 0,
            ..ProbeConfig::default()
        };
        assert!(LinkProber::new(&config).is_err());
    }
}
