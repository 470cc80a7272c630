use std::fs;
use std::io::Write;
use std::path::Path;

use log::{info, warn};

use crate::artifacts::{write_atomic, ArtifactKind};
use crate::error::Result;

/// Projects missing one kind of artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifacts {
    pub kind: ArtifactKind,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub projects_checked: usize,
    pub missing: Vec<MissingArtifacts>,
}

/// Audits every project directory under `outputs_root` and rewrites the
/// missing lists (`no_diff.txt`, ...) in `list_dir`.
///
/// Lists are sorted and written in full each time, so repeated runs over the
/// same tree produce identical files.
pub fn verify_outputs(
    outputs_root: &Path,
    list_dir: &Path,
    url_prefix: &str,
) -> Result<VerificationReport> {
    let mut projects = Vec::new();
    for entry in fs::read_dir(outputs_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => projects.push(name),
            Err(name) => warn!("Skipping non UTF-8 output directory {name:?}"),
        }
    }
    projects.sort();

    let prefix = url_prefix.trim_end_matches('/');
    let mut missing = Vec::new();

    for kind in ArtifactKind::VERIFIED {
        let urls: Vec<String> = projects
            .iter()
            .filter(|name| !kind.exists_in(&outputs_root.join(name)))
            .map(|name| format!("{prefix}/{name}"))
            .collect();

        write_atomic(&list_dir.join(kind.missing_list()), |writer| {
            for url in &urls {
                writeln!(writer, "{url}")?;
            }
            Ok(())
        })?;

        info!("{} projects without {}", urls.len(), kind.file_name());
        missing.push(MissingArtifacts { kind, urls });
    }

    Ok(VerificationReport {
        projects_checked: projects.len(),
        missing,
    })
}
