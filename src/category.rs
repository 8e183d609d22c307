//! Category table and extension-based classification.
//!
//! A category is a named bucket of file extensions that maps to a destination
//! subfolder of the same name. The table keeps its entries in a fixed order,
//! and classification is first-match over that order, so the order a table is
//! built (or read from disk) in is the order that decides ties.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Errors produced when editing the category table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// The category name was empty after trimming.
    EmptyName,
    /// No usable extensions were left after normalization.
    NoExtensions { name: String },
    /// An extension is already owned by a different category.
    ///
    /// Rejected at edit time so classification never silently depends on
    /// which of two categories happens to come first in the table.
    ExtensionConflict {
        extension: String,
        existing_category: String,
    },
    /// The named category does not exist.
    UnknownCategory(String),
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryError::EmptyName => write!(f, "Category name must not be empty"),
            CategoryError::NoExtensions { name } => {
                write!(f, "Category '{}' has no valid extensions", name)
            }
            CategoryError::ExtensionConflict {
                extension,
                existing_category,
            } => write!(
                f,
                "Extension '{}' already belongs to category '{}'",
                extension, existing_category
            ),
            CategoryError::UnknownCategory(name) => {
                write!(f, "No category named '{}'", name)
            }
        }
    }
}

impl std::error::Error for CategoryError {}

/// One named bucket of extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    pub name: String,
    /// Lowercase, dot-less, sorted, deduplicated.
    pub extensions: Vec<String>,
}

/// Ordered mapping from category name to a set of file extensions.
///
/// Entry order is significant: [`CategoryTable::classify`] returns the first
/// matching category in table order. The serde impls preserve that order
/// through the settings file, so a table round-trips byte-order intact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryTable {
    entries: Vec<CategoryEntry>,
}

/// Normalizes one raw extension: trims whitespace, strips a leading dot,
/// lowercases. Returns `None` when nothing is left.
fn normalize_extension(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_start_matches('.').to_lowercase();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Normalizes a list of raw extensions into the stored form.
fn normalize_extensions<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cleaned: Vec<String> = raw
        .into_iter()
        .filter_map(|ext| normalize_extension(ext.as_ref()))
        .collect();
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

impl CategoryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table new settings start from.
    ///
    /// Ported from the categories the tool has always shipped with. The table
    /// is conflict-free: `html`/`htm` live in Documents only, `ts` in
    /// Programming only (Videos keeps `mts` and `m2ts`).
    pub fn builtin() -> Self {
        let defaults: &[(&str, &[&str])] = &[
            (
                "Installation Files",
                &[
                    "exe", "msi", "apk", "dmg", "pkg", "deb", "rpm", "bat", "sh", "appimage",
                ],
            ),
            (
                "Documents",
                &[
                    "doc", "docx", "pdf", "txt", "rtf", "odt", "xls", "xlsx", "csv", "ppt", "pptx",
                    "html", "htm", "md", "log", "json", "xml", "yml", "yaml",
                ],
            ),
            (
                "Images",
                &[
                    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg", "webp", "heic", "ico",
                    "jfif", "psd", "ai", "eps",
                ],
            ),
            (
                "Videos",
                &[
                    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "mpeg", "3gp", "mts", "m2ts",
                ],
            ),
            (
                "Audio",
                &[
                    "mp3", "wav", "aac", "flac", "ogg", "m4a", "wma", "aiff", "opus",
                ],
            ),
            (
                "Compressed Files",
                &[
                    "zip", "rar", "7z", "tar", "gz", "bz2", "xz", "iso", "cab", "zst",
                ],
            ),
            (
                "Programming",
                &[
                    "py", "java", "c", "cpp", "cs", "js", "ts", "css", "php", "swift", "kt", "go",
                    "rs", "rb",
                ],
            ),
            ("Design", &["fig", "sketch", "xd", "indd", "idml"]),
        ];

        let entries = defaults
            .iter()
            .map(|(name, exts)| CategoryEntry {
                name: (*name).to_string(),
                extensions: normalize_extensions(exts.iter().copied()),
            })
            .collect();
        Self { entries }
    }

    /// Category names in table order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// The extensions of a category, if it exists.
    pub fn extensions(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.extensions.as_slice())
    }

    /// Adds a category or replaces an existing one of the same name.
    ///
    /// Extensions are normalized (trimmed, leading dot stripped, lowercased)
    /// and deduplicated. An extension already owned by a *different* category
    /// is rejected with [`CategoryError::ExtensionConflict`]; replacing a
    /// category with a new extension set for itself is always allowed.
    ///
    /// New categories are appended, so they classify after every existing one.
    pub fn add_or_update<I, S>(&mut self, name: &str, extensions: I) -> Result<(), CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }

        let cleaned = normalize_extensions(extensions);
        if cleaned.is_empty() {
            return Err(CategoryError::NoExtensions {
                name: name.to_string(),
            });
        }

        for ext in &cleaned {
            if let Some(owner) = self.owner_of(ext)
                && owner != name
            {
                return Err(CategoryError::ExtensionConflict {
                    extension: ext.clone(),
                    existing_category: owner.to_string(),
                });
            }
        }

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.extensions = cleaned,
            None => self.entries.push(CategoryEntry {
                name: name.to_string(),
                extensions: cleaned,
            }),
        }
        Ok(())
    }

    /// Removes a category. Returns `true` when an entry was actually removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    /// The first category in table order that owns the extension, if any.
    fn owner_of(&self, extension: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.extensions.iter().any(|x| x == extension))
            .map(|e| e.name.as_str())
    }

    /// Classifies a file path against the selected categories.
    ///
    /// The file's extension is lowercased and compared without its dot; a
    /// file with no extension never matches. Categories are tried in table
    /// order, restricted to `selected`, and the first one containing the
    /// extension wins.
    pub fn classify<S: AsRef<str>>(&self, path: &Path, selected: &[S]) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.entries
            .iter()
            .filter(|e| selected.iter().any(|s| s.as_ref() == e.name))
            .find(|e| e.extensions.iter().any(|x| *x == ext))
            .map(|e| e.name.as_str())
    }
}

// Serialized as a plain JSON object so the settings file stays hand-editable;
// the deserializer keeps entries in document order and re-normalizes
// extensions, since the file may have been edited outside the tool.
impl Serialize for CategoryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.extensions)?;
        }
        map.end()
    }
}

struct CategoryTableVisitor;

impl<'de> Visitor<'de> for CategoryTableVisitor {
    type Value = CategoryTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of category name to extension list")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = CategoryTable::new();
        while let Some((name, extensions)) = access.next_entry::<String, Vec<String>>()? {
            let cleaned = normalize_extensions(extensions);
            table.entries.retain(|e| e.name != name);
            table.entries.push(CategoryEntry {
                name,
                extensions: cleaned,
            });
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for CategoryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CategoryTableVisitor)
    }
}
