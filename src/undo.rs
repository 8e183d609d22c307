//! Single-level undo: records of one run's moves and their reversal.
//!
//! Exactly one run is undoable. The log is replaced wholesale on every run
//! and consumed by a single `undo`; afterwards it is empty and a second undo
//! restores nothing. Between CLI invocations the log lives in a JSON file
//! next to the settings (see [`UndoLog::save`] / [`UndoLog::load`]).

use crate::mover::transfer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One successful move: where the file went and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub new_path: PathBuf,
    pub original_path: PathBuf,
}

/// Errors around persisting or reading the undo log.
#[derive(Debug)]
pub enum UndoError {
    WriteFailed { path: PathBuf, source: io::Error },
    ReadFailed { path: PathBuf, source: io::Error },
    InvalidFormat { reason: String },
}

impl std::fmt::Display for UndoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndoError::WriteFailed { path, source } => {
                write!(f, "Failed to write undo log {}: {}", path.display(), source)
            }
            UndoError::ReadFailed { path, source } => {
                write!(f, "Failed to read undo log {}: {}", path.display(), source)
            }
            UndoError::InvalidFormat { reason } => {
                write!(f, "Invalid undo log: {}", reason)
            }
        }
    }
}

impl std::error::Error for UndoError {}

/// What an undo pass accomplished.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Files moved back to their original path.
    pub restored: usize,
    /// Records whose moved-to file no longer existed, with the missing path.
    pub skipped: Vec<(PathBuf, String)>,
    /// Records whose restoration failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn is_complete_success(&self) -> bool {
        self.skipped.is_empty() && self.failures.is_empty()
    }
}

/// The move records of the most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLog {
    /// RFC 3339 stamp of the run that produced this log.
    pub timestamp: String,
    records: Vec<MoveRecord>,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog {
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            records: Vec::new(),
        }
    }

    /// Appends one completed move to the current run's log.
    pub fn record(&mut self, new_path: PathBuf, original_path: PathBuf) {
        self.records.push(MoveRecord {
            new_path,
            original_path,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    /// Reverses every recorded move, most recent first.
    ///
    /// The original parent directory is re-created if it disappeared, and a
    /// file is only moved back if it still sits at its moved-to location.
    /// Failures are collected per record; the remaining records are still
    /// attempted. The log is cleared afterwards regardless of partial
    /// failure, so a second call restores zero.
    pub fn undo(&mut self) -> UndoReport {
        let mut report = UndoReport::default();

        for record in self.records.iter().rev() {
            if !record.new_path.exists() {
                report.skipped.push((
                    record.new_path.clone(),
                    "file no longer at its moved-to location".to_string(),
                ));
                continue;
            }
            if let Some(parent) = record.original_path.parent()
                && let Err(e) = fs::create_dir_all(parent)
            {
                report.failures.push((
                    record.new_path.clone(),
                    format!("could not re-create {}: {}", parent.display(), e),
                ));
                continue;
            }
            match transfer(&record.new_path, &record.original_path) {
                Ok(()) => report.restored += 1,
                Err(e) => report
                    .failures
                    .push((record.new_path.clone(), e.to_string())),
            }
        }

        self.records.clear();
        report
    }

    /// Writes the log as pretty JSON, replacing any previous run's log.
    pub fn save(&self, path: &Path) -> Result<(), UndoError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| UndoError::InvalidFormat {
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(|e| UndoError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads the persisted log. `Ok(None)` when no log file exists.
    pub fn load(path: &Path) -> Result<Option<Self>, UndoError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|e| UndoError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let log = serde_json::from_str(&json).map_err(|e| UndoError::InvalidFormat {
            reason: e.to_string(),
        })?;
        Ok(Some(log))
    }

    /// Removes the persisted log file, if present.
    pub fn delete(path: &Path) -> Result<(), UndoError> {
        if path.exists() {
            fs::remove_file(path).map_err(|e| UndoError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).expect("write test file");
    }

    #[test]
    fn test_undo_restores_in_reverse_order() {
        let tmp = TempDir::new().expect("temp dir");
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir(&src).unwrap();
        fs::create_dir(&out).unwrap();

        let mut log = UndoLog::new();
        for name in ["a.txt", "b.txt"] {
            let original = src.join(name);
            let moved = out.join(name);
            write(&original, name);
            fs::rename(&original, &moved).unwrap();
            log.record(moved, original);
        }

        let report = log.undo();
        assert_eq!(report.restored, 2);
        assert!(report.is_complete_success());
        assert!(src.join("a.txt").exists());
        assert!(src.join("b.txt").exists());
        assert!(!out.join("a.txt").exists());
    }

    #[test]
    fn test_undo_recreates_missing_parent_directory() {
        let tmp = TempDir::new().expect("temp dir");
        let src = tmp.path().join("src").join("nested");
        let out = tmp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir(&out).unwrap();

        let original = src.join("a.txt");
        let moved = out.join("a.txt");
        write(&original, "x");
        fs::rename(&original, &moved).unwrap();
        fs::remove_dir_all(tmp.path().join("src")).unwrap();

        let mut log = UndoLog::new();
        log.record(moved, original.clone());
        let report = log.undo();
        assert_eq!(report.restored, 1);
        assert!(original.exists());
    }

    #[test]
    fn test_undo_skips_records_whose_file_vanished() {
        let tmp = TempDir::new().expect("temp dir");
        let mut log = UndoLog::new();
        log.record(tmp.path().join("gone.txt"), tmp.path().join("orig.txt"));

        let report = log.undo();
        assert_eq!(report.restored, 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_undo_continues_past_restore_failure() {
        let tmp = TempDir::new().expect("temp dir");
        let out = tmp.path().join("out");
        fs::create_dir(&out).unwrap();
        write(&out.join("a.txt"), "a");
        write(&out.join("b.txt"), "b");
        // A regular file squats where b's parent folder must be re-created.
        write(&tmp.path().join("blocked"), "not a directory");

        let a_original = tmp.path().join("src").join("a.txt");
        let mut log = UndoLog::new();
        log.record(out.join("a.txt"), a_original.clone());
        log.record(out.join("b.txt"), tmp.path().join("blocked").join("b.txt"));

        let report = log.undo();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, out.join("b.txt"));
        assert_eq!(report.restored, 1);
        assert!(report.skipped.is_empty());
        assert!(!report.is_complete_success());
        assert!(a_original.exists());
        assert!(out.join("b.txt").exists());
        assert!(log.is_empty());
    }

    #[test]
    fn test_second_undo_is_a_no_op() {
        let tmp = TempDir::new().expect("temp dir");
        let original = tmp.path().join("a.txt");
        let moved = tmp.path().join("moved.txt");
        write(&original, "x");
        fs::rename(&original, &moved).unwrap();

        let mut log = UndoLog::new();
        log.record(moved, original);
        assert_eq!(log.undo().restored, 1);
        assert!(log.is_empty());

        let second = log.undo();
        assert_eq!(second.restored, 0);
        assert!(second.is_complete_success());
    }

    #[test]
    fn test_log_cleared_even_after_partial_failure() {
        let tmp = TempDir::new().expect("temp dir");
        let original = tmp.path().join("a.txt");
        let moved = tmp.path().join("moved.txt");
        write(&original, "x");
        fs::rename(&original, &moved).unwrap();

        let mut log = UndoLog::new();
        log.record(tmp.path().join("gone.txt"), tmp.path().join("orig.txt"));
        log.record(moved, original.clone());

        let report = log.undo();
        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(log.is_empty());
        assert!(original.exists());
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().expect("temp dir");
        let log_path = tmp.path().join("last_run.json");

        let mut log = UndoLog::new();
        log.record(
            PathBuf::from("/out/Documents/a.txt"),
            PathBuf::from("/in/a.txt"),
        );
        log.save(&log_path).expect("save");

        let loaded = UndoLog::load(&log_path).expect("load").expect("present");
        assert_eq!(loaded, log);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let tmp = TempDir::new().expect("temp dir");
        let loaded = UndoLog::load(&tmp.path().join("nope.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let tmp = TempDir::new().expect("temp dir");
        let log_path = tmp.path().join("last_run.json");
        write(&log_path, "not json at all");
        assert!(matches!(
            UndoLog::load(&log_path),
            Err(UndoError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let tmp = TempDir::new().expect("temp dir");
        let log_path = tmp.path().join("last_run.json");
        UndoLog::new().save(&log_path).expect("save");
        UndoLog::delete(&log_path).expect("delete");
        assert!(!log_path.exists());
        UndoLog::delete(&log_path).expect("second delete is fine");
    }
}
