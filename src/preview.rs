//! Preview builder: computes the move plan without touching the filesystem.

use crate::category::CategoryTable;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One planned move: where a file is, which category it matched, and where it
/// would go. A disposable projection — never persisted, recomputed whenever
/// the configuration or the directory tree changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub source: PathBuf,
    pub category: String,
    pub destination: PathBuf,
}

/// Walks every source directory and plans a move for each classified file.
///
/// - Sources that do not exist are skipped, never an error.
/// - Recurses into subdirectories; yields regular files only. Symbolic links
///   are neither followed nor yielded.
/// - Files with no matching selected category are omitted.
/// - Destination is `destination_root / category / file_name`.
///
/// Read-only: the plan reflects the tree at call time and may be invalidated
/// by anything that mutates it before execution.
pub fn build_preview<S: AsRef<str>>(
    sources: &[PathBuf],
    destination_root: &Path,
    table: &CategoryTable,
    selected: &[S],
) -> Vec<PreviewEntry> {
    let mut plan = Vec::new();
    for source in sources {
        if !source.is_dir() {
            continue;
        }
        for entry in WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(category) = table.classify(path, selected) {
                let destination = destination_root.join(category).join(entry.file_name());
                plan.push(PreviewEntry {
                    source: path.to_path_buf(),
                    category: category.to_string(),
                    destination,
                });
            }
        }
    }
    plan
}
