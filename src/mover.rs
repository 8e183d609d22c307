//! Move execution: duplicate policies, the single-file move primitive, and
//! running a whole plan.
//!
//! Every entry of a plan is attempted independently; one failed move never
//! aborts the rest of the run.

use crate::preview::PreviewEntry;
use crate::undo::UndoLog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What to do when a move's destination name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum DuplicatePolicy {
    /// Leave both files where they are.
    Skip,
    /// Remove the existing destination entry, then move.
    Overwrite,
    /// Append `_1`, `_2`, ... to the stem until the name is unused.
    #[default]
    Rename,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DuplicatePolicy::Skip => "Skip",
            DuplicatePolicy::Overwrite => "Overwrite",
            DuplicatePolicy::Rename => "Rename",
        };
        f.write_str(name)
    }
}

/// Errors raised while executing moves.
#[derive(Debug)]
pub enum MoveError {
    /// Failed to create a destination category folder.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// The source path has no file name component.
    NoFileName { path: PathBuf },
    /// Overwrite policy could not clear the existing destination entry.
    ///
    /// Fatal for this entry: the move is not attempted over a path that
    /// could not be removed.
    ReplaceFailed { path: PathBuf, source: io::Error },
    /// The underlying rename/copy of one file failed.
    TransferFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveError::DirectoryCreationFailed { path, source } => {
                write!(f, "Failed to create folder {}: {}", path.display(), source)
            }
            MoveError::NoFileName { path } => {
                write!(f, "Path has no file name: {}", path.display())
            }
            MoveError::ReplaceFailed { path, source } => {
                write!(
                    f,
                    "Could not remove existing entry {}: {}",
                    path.display(),
                    source
                )
            }
            MoveError::TransferFailed { from, to, source } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    from.display(),
                    to.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for MoveError {}

/// Result of one attempted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at this path (may differ from the planned
    /// destination under the Rename policy).
    Moved(PathBuf),
    /// A duplicate existed and the policy was Skip; nothing changed.
    Skipped,
}

/// Rename-or-copy transfer. Falls back to copy + delete when the rename
/// crosses a filesystem boundary.
pub(crate) fn transfer(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Picks `stem_1.ext`, `stem_2.ext`, ... — the first name unused in
/// `dest_folder` at the time of the call.
fn renamed_destination(dest_folder: &Path, file_name: &Path) -> PathBuf {
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dest_folder.join(format!("{}_{}{}", stem, counter, suffix));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Moves one file into `dest_folder`, applying `policy` on name collision.
///
/// The destination folder is assumed to exist; [`execute_plan`] creates every
/// category folder up front before any moves run.
pub fn move_file(
    source: &Path,
    dest_folder: &Path,
    policy: DuplicatePolicy,
) -> Result<MoveOutcome, MoveError> {
    let file_name = source.file_name().ok_or_else(|| MoveError::NoFileName {
        path: source.to_path_buf(),
    })?;
    let mut destination = dest_folder.join(file_name);

    if destination.exists() {
        match policy {
            DuplicatePolicy::Skip => return Ok(MoveOutcome::Skipped),
            DuplicatePolicy::Overwrite => {
                let removal = if destination.is_dir() {
                    fs::remove_dir_all(&destination)
                } else {
                    fs::remove_file(&destination)
                };
                removal.map_err(|e| MoveError::ReplaceFailed {
                    path: destination.clone(),
                    source: e,
                })?;
            }
            DuplicatePolicy::Rename => {
                destination = renamed_destination(dest_folder, Path::new(file_name));
            }
        }
    }

    transfer(source, &destination).map_err(|e| MoveError::TransferFailed {
        from: source.to_path_buf(),
        to: destination.clone(),
        source: e,
    })?;
    Ok(MoveOutcome::Moved(destination))
}

/// One line of a run's log, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Moved { from: PathBuf, to: PathBuf },
    Skipped { path: PathBuf },
    Missing { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

/// Outcome of one full run over a plan.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub moved: usize,
    pub skipped: usize,
    pub missing: usize,
    pub failed: usize,
    pub events: Vec<RunEvent>,
}

impl RunReport {
    /// The per-run summary line, e.g. `"Moved 2 file(s). Missing: 1."`.
    pub fn summary(&self) -> String {
        let mut line = format!("Moved {} file(s).", self.moved);
        if self.missing > 0 {
            line.push_str(&format!(" Missing: {}.", self.missing));
        }
        line
    }
}

/// Executes a plan sequentially, in plan order.
///
/// Every destination folder named by the plan is created first; a failure
/// there is the only fatal error. Afterwards each entry is attempted
/// independently: a source that vanished since the preview counts as missing,
/// and a failed move is recorded and skipped over. Successful moves are
/// appended to the returned [`UndoLog`], which replaces whatever log the
/// previous run left behind.
pub fn execute_plan(
    plan: &[PreviewEntry],
    policy: DuplicatePolicy,
) -> Result<(RunReport, UndoLog), MoveError> {
    let folders: BTreeSet<&Path> = plan
        .iter()
        .filter_map(|e| e.destination.parent())
        .collect();
    for folder in folders {
        fs::create_dir_all(folder).map_err(|e| MoveError::DirectoryCreationFailed {
            path: folder.to_path_buf(),
            source: e,
        })?;
    }

    let mut report = RunReport::default();
    let mut log = UndoLog::new();

    for entry in plan {
        if !entry.source.exists() {
            report.missing += 1;
            report.events.push(RunEvent::Missing {
                path: entry.source.clone(),
            });
            continue;
        }
        let dest_folder = match entry.destination.parent() {
            Some(folder) => folder,
            None => {
                report.failed += 1;
                report.events.push(RunEvent::Failed {
                    path: entry.source.clone(),
                    reason: "planned destination has no parent folder".to_string(),
                });
                continue;
            }
        };
        match move_file(&entry.source, dest_folder, policy) {
            Ok(MoveOutcome::Moved(actual)) => {
                log.record(actual.clone(), entry.source.clone());
                report.moved += 1;
                report.events.push(RunEvent::Moved {
                    from: entry.source.clone(),
                    to: actual,
                });
            }
            Ok(MoveOutcome::Skipped) => {
                report.skipped += 1;
                report.events.push(RunEvent::Skipped {
                    path: entry.source.clone(),
                });
            }
            Err(e) => {
                report.failed += 1;
                report.events.push(RunEvent::Failed {
                    path: entry.source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((report, log))
}
