//! Acting on the resolver's decisions: report, move or delete.

use crate::error::DispositionError;
use crate::resolver::RetentionReasons;

use colored::Colorize;
use humansize::{format_size, BINARY};
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// What to do with disposable artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Print what would be kept and what could go
    #[default]
    Report,
    /// Move disposable artifacts into a destination directory
    Move,
    /// Delete disposable artifacts
    Delete,
}

/// Runtime flags for move and delete
#[derive(Debug, Clone, Copy, Default)]
pub struct DispositionOptions {
    pub verbose: bool,
    pub dry_run: bool,
}

/// Outcome of a move or delete pass
#[derive(Debug, Default)]
pub struct DispositionSummary {
    pub kept: usize,
    pub processed: usize,
    pub failures: Vec<DispositionError>,
}

impl DispositionSummary {
    fn record(&mut self, result: Result<(), DispositionError>) {
        match result {
            Ok(()) => self.processed += 1,
            Err(err) => {
                error!("{err}");
                self.failures.push(err);
            }
        }
    }
}

/// Total size of a file or directory tree. Symlinks are not followed or counted.
pub fn artifact_size(path: &Path) -> u64 {
    let metadata = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not get metadata");
            return 0;
        }
    };

    if metadata.is_symlink() {
        return 0;
    }
    if metadata.is_file() {
        return metadata.len();
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read directory");
            return 0;
        }
    };

    entries
        .flatten()
        .map(|entry| artifact_size(&entry.path()))
        .sum()
}

/// Print the decisions.
///
/// Verbose output lists every artifact with its reasons. Otherwise the kept
/// and disposable artifacts are listed under their counts, with the space the
/// disposable ones take up.
pub fn write_report<W: Write>(
    out: &mut W,
    reasons: &RetentionReasons,
    verbose: bool,
) -> io::Result<()> {
    if reasons.is_empty() {
        writeln!(
            out,
            "No files matching the specified file format found. See --help if in doubt."
        )?;
        return Ok(());
    }

    if verbose {
        for (path, list) in reasons.iter() {
            if list.is_empty() {
                writeln!(out, "{} - {}", path.display(), "No reason to keep".red())?;
            } else {
                let joined = list
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "{} - Reasons to keep: {}", path.display(), joined.green())?;
            }
        }
        writeln!(
            out,
            "Files with no reason to keep can be deleted or moved using --action=delete or --action=move, see --help"
        )?;
        return Ok(());
    }

    let kept: Vec<&Path> = reasons.kept().collect();
    let disposable: Vec<&Path> = reasons.disposable().collect();

    writeln!(out, "{}", format!("Files to keep: {}", kept.len()).bold())?;
    for path in &kept {
        writeln!(out, "  {}", path.display().to_string().green())?;
    }

    writeln!(
        out,
        "{}",
        format!("Files to move or delete: {}", disposable.len()).bold()
    )?;
    for path in &disposable {
        writeln!(out, "  {}", path.display().to_string().red())?;
    }

    if !disposable.is_empty() {
        let reclaimable: u64 = disposable.iter().map(|p| artifact_size(p)).sum();
        writeln!(
            out,
            "Space reclaimable: {}",
            format_size(reclaimable, BINARY).bold()
        )?;
    }
    Ok(())
}

/// Fail when `destination` exists but is not a directory.
///
/// Returns whether the directory already exists. Dry runs call this instead
/// of [`prepare_destination`].
pub fn check_destination(destination: &Path) -> Result<bool, DispositionError> {
    match fs::metadata(destination) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(DispositionError::DestinationNotDirectory(
            destination.to_path_buf(),
        )),
        Err(_) => Ok(false),
    }
}

/// Make sure `destination` is a usable directory, creating it if needed.
///
/// Fails when the path exists but is not a directory; every move would fail.
pub fn prepare_destination(destination: &Path) -> Result<(), DispositionError> {
    if check_destination(destination)? {
        return Ok(());
    }
    fs::create_dir_all(destination).map_err(|source| DispositionError::CreateDestination {
        path: destination.to_path_buf(),
        source,
    })
}

/// Move every disposable artifact into `destination`.
///
/// The destination must already have passed [`prepare_destination`].
pub fn move_disposable<W: Write>(
    out: &mut W,
    reasons: &RetentionReasons,
    destination: &Path,
    options: DispositionOptions,
) -> io::Result<DispositionSummary> {
    let mut summary = DispositionSummary::default();

    for (path, list) in reasons.iter() {
        if !list.is_empty() {
            summary.kept += 1;
            if options.verbose {
                writeln!(out, "keeping  {}...", path.display())?;
            }
            continue;
        }

        if options.dry_run {
            writeln!(
                out,
                "Would move: {} -> {}",
                path.display(),
                destination.display()
            )?;
            summary.processed += 1;
            continue;
        }

        if options.verbose {
            writeln!(out, "moving {} to {}...", path.display(), destination.display())?;
        }
        summary.record(move_artifact(path, destination));
    }

    Ok(summary)
}

fn move_artifact(path: &Path, destination: &Path) -> Result<(), DispositionError> {
    let target = match path.file_name() {
        Some(name) => destination.join(name),
        None => destination.to_path_buf(),
    };
    if fs::symlink_metadata(&target).is_ok() {
        return Err(DispositionError::TargetExists {
            path: path.to_path_buf(),
            target,
        });
    }

    let to_move_error = |source| DispositionError::Move {
        path: path.to_path_buf(),
        source,
    };

    match fs::rename(path, &target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(path, &target).map_err(to_move_error)
        }
        Err(err) => Err(to_move_error(err)),
    }
}

/// Move across filesystems. A failed copy leaves no partial target behind.
fn copy_then_remove(path: &Path, target: &Path) -> io::Result<()> {
    let is_dir = fs::symlink_metadata(path)?.is_dir();
    let copied = if is_dir {
        copy_tree(path, target)
    } else {
        fs::copy(path, target).map(|_| ())
    };

    if let Err(err) = copied {
        let cleanup = if is_dir {
            fs::remove_dir_all(target)
        } else {
            fs::remove_file(target)
        };
        if let Err(cleanup_err) = cleanup {
            if cleanup_err.kind() != io::ErrorKind::NotFound {
                warn!(
                    target = %target.display(),
                    error = %cleanup_err,
                    "failed to remove partial copy"
                );
            }
        }
        return Err(err);
    }

    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to: PathBuf = target.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Delete every disposable artifact, files and directories alike
pub fn delete_disposable<W: Write>(
    out: &mut W,
    reasons: &RetentionReasons,
    options: DispositionOptions,
) -> io::Result<DispositionSummary> {
    let mut summary = DispositionSummary::default();

    for (path, list) in reasons.iter() {
        if !list.is_empty() {
            summary.kept += 1;
            if options.verbose {
                writeln!(out, "keeping  {}...", path.display())?;
            }
            continue;
        }

        if options.dry_run {
            writeln!(out, "Would delete: {}", path.display())?;
            summary.processed += 1;
            continue;
        }

        if options.verbose {
            writeln!(out, "deleting {}...", path.display())?;
        }
        summary.record(delete_artifact(path));
    }

    Ok(summary)
}

fn delete_artifact(path: &Path) -> Result<(), DispositionError> {
    let to_delete_error = |source| DispositionError::Delete {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::symlink_metadata(path).map_err(to_delete_error)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(to_delete_error)
    } else {
        fs::remove_file(path).map_err(to_delete_error)
    }
}
