//! Settings: the single durable record of the tool's configuration.
//!
//! Loaded once at startup, passed by value into the preview and move calls,
//! and written back after every mutation. The persisted form is a flat JSON
//! object with the keys `source_paths`, `destination_path`,
//! `selected_categories`, `folder_lists` and `duplicate_mode`; a missing or
//! malformed file silently falls back to defaults.

use crate::category::{CategoryError, CategoryTable};
use crate::mover::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the persisted undo log, kept next to the settings file.
const UNDO_LOG_FILE: &str = "last_run.json";

/// Errors that can occur while writing settings.
///
/// Reading never errors: anything unreadable is treated as "no prior
/// settings".
#[derive(Debug)]
pub enum SettingsError {
    WriteFailed { path: PathBuf, source: io::Error },
    SerializeFailed { reason: String },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::WriteFailed { path, source } => {
                write!(f, "Failed to write settings {}: {}", path.display(), source)
            }
            SettingsError::SerializeFailed { reason } => {
                write!(f, "Failed to serialize settings: {}", reason)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Everything the tool remembers between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ordered set of directories to scan. Existence is checked at scan
    /// time, not here.
    pub source_paths: Vec<PathBuf>,
    /// Root under which category folders are created. Empty until set.
    pub destination_path: PathBuf,
    /// Subset of category names the preview considers, in selection order.
    pub selected_categories: Vec<String>,
    /// The category table; entry order decides classification ties.
    pub folder_lists: CategoryTable,
    pub duplicate_mode: DuplicatePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        let folder_lists = CategoryTable::builtin();
        let selected_categories = folder_lists.names();
        Self {
            source_paths: Vec::new(),
            destination_path: PathBuf::new(),
            selected_categories,
            folder_lists,
            duplicate_mode: DuplicatePolicy::default(),
        }
    }
}

impl Settings {
    /// The default on-disk location: `~/.config/filesort/settings.json`,
    /// falling back to the current directory when HOME is unset.
    pub fn default_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("filesort")
                .join("settings.json")
        } else {
            PathBuf::from("settings.json")
        }
    }

    /// Where the undo log for these settings lives: a sibling of the
    /// settings file.
    pub fn undo_log_path(settings_path: &Path) -> PathBuf {
        match settings_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(UNDO_LOG_FILE),
            _ => PathBuf::from(UNDO_LOG_FILE),
        }
    }

    /// Loads settings from `path`. A missing, unreadable or malformed file
    /// yields defaults — never an error.
    pub fn load(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&json).unwrap_or_default()
    }

    /// Writes settings as pretty JSON via a temp file and rename, so a crash
    /// mid-write never leaves a truncated settings file behind. Last writer
    /// wins; there is no locking.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::SerializeFailed {
                reason: e.to_string(),
            })?;

        let write_failed = |e: io::Error| SettingsError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_failed)?;
        fs::rename(&tmp, path).map_err(write_failed)
    }

    /// Appends a source directory. Duplicates are rejected; existence is not
    /// required at registration time.
    pub fn add_source(&mut self, path: PathBuf) -> bool {
        if self.source_paths.contains(&path) {
            return false;
        }
        self.source_paths.push(path);
        true
    }

    pub fn remove_source(&mut self, path: &Path) -> bool {
        let before = self.source_paths.len();
        self.source_paths.retain(|p| p != path);
        self.source_paths.len() != before
    }

    pub fn clear_sources(&mut self) {
        self.source_paths.clear();
    }

    pub fn set_destination(&mut self, path: PathBuf) {
        self.destination_path = path;
    }

    pub fn set_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicate_mode = policy;
    }

    /// Adds or replaces a category and makes sure it is selected, so a
    /// freshly defined category takes part in the next preview.
    pub fn set_category<I, S>(&mut self, name: &str, extensions: I) -> Result<(), CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.folder_lists.add_or_update(name, extensions)?;
        let name = name.trim();
        if !self.selected_categories.iter().any(|c| c == name) {
            self.selected_categories.push(name.to_string());
        }
        Ok(())
    }

    /// Removes a category and drops it from the selected set.
    pub fn remove_category(&mut self, name: &str) -> bool {
        let removed = self.folder_lists.remove(name);
        if removed {
            self.selected_categories.retain(|c| c != name);
        }
        removed
    }

    pub fn select_category(&mut self, name: &str) -> Result<(), CategoryError> {
        if !self.folder_lists.contains(name) {
            return Err(CategoryError::UnknownCategory(name.to_string()));
        }
        if !self.selected_categories.iter().any(|c| c == name) {
            self.selected_categories.push(name.to_string());
        }
        Ok(())
    }

    pub fn deselect_category(&mut self, name: &str) -> bool {
        let before = self.selected_categories.len();
        self.selected_categories.retain(|c| c != name);
        self.selected_categories.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_select_every_builtin_category() {
        let settings = Settings::default();
        assert_eq!(settings.selected_categories, settings.folder_lists.names());
        assert_eq!(settings.duplicate_mode, DuplicatePolicy::Rename);
        assert!(settings.source_paths.is_empty());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let tmp = TempDir::new().expect("temp dir");
        let settings = Settings::load(&tmp.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_file_yields_defaults() {
        let tmp = TempDir::new().expect("temp dir");
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ this is not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().expect("temp dir");
        let path = tmp.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.add_source(PathBuf::from("/data/inbox"));
        settings.set_destination(PathBuf::from("/data/sorted"));
        settings.set_policy(DuplicatePolicy::Skip);
        settings.set_category("Scans", ["tig", "nef"]).unwrap();
        settings.save(&path).expect("save");

        let restored = Settings::load(&path);
        assert_eq!(restored, settings);
        // Table order survives the round trip.
        assert_eq!(restored.folder_lists.names(), settings.folder_lists.names());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let tmp = TempDir::new().expect("temp dir");
        let path = tmp.path().join("settings.json");
        Settings::default().save(&path).expect("save");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_add_source_rejects_duplicates() {
        let mut settings = Settings::default();
        assert!(settings.add_source(PathBuf::from("/a")));
        assert!(!settings.add_source(PathBuf::from("/a")));
        assert_eq!(settings.source_paths.len(), 1);
    }

    #[test]
    fn test_remove_source() {
        let mut settings = Settings::default();
        settings.add_source(PathBuf::from("/a"));
        assert!(settings.remove_source(Path::new("/a")));
        assert!(!settings.remove_source(Path::new("/a")));
    }

    #[test]
    fn test_set_category_auto_selects() {
        let mut settings = Settings::default();
        settings.deselect_category("Design");
        settings.set_category("Design", ["fig"]).unwrap();
        assert!(settings.selected_categories.iter().any(|c| c == "Design"));
    }

    #[test]
    fn test_remove_category_drops_selection() {
        let mut settings = Settings::default();
        assert!(settings.remove_category("Design"));
        assert!(!settings.selected_categories.iter().any(|c| c == "Design"));
        assert!(!settings.remove_category("Design"));
    }

    #[test]
    fn test_select_unknown_category_is_error() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.select_category("Nope"),
            Err(CategoryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut settings = Settings::default();
        settings.deselect_category("Audio");
        settings.select_category("Audio").unwrap();
        settings.select_category("Audio").unwrap();
        let count = settings
            .selected_categories
            .iter()
            .filter(|c| *c == "Audio")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_persisted_keys_match_the_settings_record() {
        let json = serde_json::to_value(Settings::default()).expect("serialize");
        let obj = json.as_object().expect("object");
        for key in [
            "source_paths",
            "destination_path",
            "selected_categories",
            "folder_lists",
            "duplicate_mode",
        ] {
            assert!(obj.contains_key(key), "missing key {}", key);
        }
        assert_eq!(obj["duplicate_mode"], "Rename");
    }

    #[test]
    fn test_undo_log_path_is_settings_sibling() {
        let path = Settings::undo_log_path(Path::new("/home/u/.config/filesort/settings.json"));
        assert_eq!(path, Path::new("/home/u/.config/filesort/last_run.json"));
    }
}
