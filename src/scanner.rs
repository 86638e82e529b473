//! Backup directory scanning.

use crate::error::ScanError;
use crate::template::FormatTemplate;
use crate::time::{classify, Classification};

use chrono::NaiveDateTime;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A backup found in the scanned directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Full path; unique within a scan
    pub path: PathBuf,
    /// File or directory name the timestamp was read from
    pub name: String,
    pub classification: Classification,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, classification: Classification) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Artifact {
            path,
            name,
            classification,
        }
    }

    /// Timestamp if the artifact takes part in bucketing
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.classification.timestamp()
    }
}

/// Build the scan glob matcher rooted at the backup directory
fn scan_matcher(directory: &Path, template: &FormatTemplate) -> Result<Override, ScanError> {
    let mut builder = OverrideBuilder::new(directory);
    builder
        .add(template.glob())
        .map_err(|e| glob_error(directory, e))?;
    builder.build().map_err(|e| glob_error(directory, e))
}

fn glob_error(directory: &Path, err: ignore::Error) -> ScanError {
    ScanError::Io {
        path: directory.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
    }
}

/// List and classify the backups directly inside `directory`.
///
/// Only entries whose names match the template's scan glob are returned.
/// Symlinks are skipped. The result is sorted by path.
pub fn scan_directory(
    directory: &Path,
    template: &FormatTemplate,
    now: NaiveDateTime,
) -> Result<Vec<Artifact>, ScanError> {
    let metadata = match std::fs::metadata(directory) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::NotFound(directory.to_path_buf()));
        }
        Err(err) => {
            return Err(ScanError::Io {
                path: directory.to_path_buf(),
                source: err,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(directory.to_path_buf()));
    }

    let matcher = scan_matcher(directory, template)?;

    // Backups are plain entries; ignore files in the backup directory do not apply
    let walker = WalkBuilder::new(directory)
        .max_depth(Some(1))
        .hidden(false)
        .parents(false)
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .build();

    let mut artifacts = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    directory = %directory.display(),
                    error = %err,
                    "failed to access entry, skipping"
                );
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_symlink() {
            debug!(path = %path.display(), "skipping symlink");
            continue;
        }

        if !matcher.matched(path, file_type.is_dir()).is_whitelist() {
            debug!(path = %path.display(), "name does not match format, ignoring");
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let classification = classify(template, &name, now);
        debug!(path = %path.display(), ?classification, "classified");
        artifacts.push(Artifact::new(path, classification));
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        directory = %directory.display(),
        count = artifacts.len(),
        "scan complete"
    );
    Ok(artifacts)
}
