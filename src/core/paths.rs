//! core::paths
//!
//! Centralized path routing for project storage locations.
//!
//! # Storage Layout
//!
//! A project root contains:
//! - `<language>/<namespace>.json` - One document per language and namespace
//! - `<schema_dir>/<namespace>.json` - Canonical key structure per namespace
//! - `<schema_dir>/.tombstones.json` - Removals some documents still lack
//! - `.translatehub.toml` - Optional project configuration
//!
//! The schema directory defaults to `_schema` and is configurable.
//!
//! **Hard rule:** No code outside this module joins document or schema
//! paths by hand. All paths go through `ProjectPaths`.
//!
//! # Example
//!
//! ```
//! use translatehub::core::paths::ProjectPaths;
//! use translatehub::core::types::{LanguageId, NamespaceId};
//! use std::path::PathBuf;
//!
//! let paths = ProjectPaths::new(PathBuf::from("/locales"), "_schema");
//! let en = LanguageId::new("en").unwrap();
//! let common = NamespaceId::new("common").unwrap();
//!
//! assert_eq!(
//!     paths.document_path(&en, &common),
//!     PathBuf::from("/locales/en/common.json")
//! );
//! assert_eq!(
//!     paths.schema_path(&common),
//!     PathBuf::from("/locales/_schema/common.json")
//! );
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::{LanguageId, NamespaceId, DOCUMENT_EXTENSION};

/// File name of the project-level configuration.
pub const PROJECT_CONFIG_FILE: &str = ".translatehub.toml";

/// Hidden file in the schema directory holding pending removals.
pub const TOMBSTONES_FILE: &str = ".tombstones.json";

/// Centralized path routing for a project directory.
///
/// # Invariants
///
/// - The schema directory is never reported as a language
/// - Every document path ends in `.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Project root directory.
    pub root: PathBuf,

    /// Name of the schema directory under the root.
    pub schema_dir_name: String,
}

/// Result of scanning a project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedLayout {
    /// Language directories found under the root.
    pub languages: BTreeSet<LanguageId>,
    /// Namespaces found in any language directory or the schema directory.
    pub namespaces: BTreeSet<NamespaceId>,
    /// Whether the schema directory exists.
    pub has_schema_dir: bool,
    /// Namespaces that have a persisted schema file.
    pub schema_files: BTreeSet<NamespaceId>,
    /// Entries that were skipped because their names are not valid ids.
    pub skipped: Vec<PathBuf>,
}

impl ProjectPaths {
    /// Create paths for a project root.
    pub fn new(root: PathBuf, schema_dir_name: impl Into<String>) -> Self {
        Self {
            root,
            schema_dir_name: schema_dir_name.into(),
        }
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one language's documents.
    pub fn language_dir(&self, lang: &LanguageId) -> PathBuf {
        self.root.join(lang.as_str())
    }

    /// Path of the document for a language and namespace.
    pub fn document_path(&self, lang: &LanguageId, ns: &NamespaceId) -> PathBuf {
        self.language_dir(lang).join(ns.file_name())
    }

    /// Directory holding persisted schema entries.
    pub fn schema_dir(&self) -> PathBuf {
        self.root.join(&self.schema_dir_name)
    }

    /// Path of the persisted schema entry for a namespace.
    pub fn schema_path(&self, ns: &NamespaceId) -> PathBuf {
        self.schema_dir().join(ns.file_name())
    }

    /// Path of the pending-removal record.
    pub fn tombstones_path(&self) -> PathBuf {
        self.schema_dir().join(TOMBSTONES_FILE)
    }

    /// Path of the project configuration file.
    pub fn project_config_path(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILE)
    }

    /// Whether a language id collides with the schema directory.
    pub fn is_reserved(&self, lang: &LanguageId) -> bool {
        lang.as_str() == self.schema_dir_name
    }

    /// Scan the project root for languages and namespaces.
    ///
    /// Hidden entries are ignored. Directory or file names that do not
    /// form valid ids are collected in [`ScannedLayout::skipped`] rather
    /// than failing the scan.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root (or a language directory) cannot
    /// be listed.
    pub fn scan(&self) -> io::Result<ScannedLayout> {
        let mut layout = ScannedLayout::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            if name == self.schema_dir_name {
                layout.has_schema_dir = true;
                let found = self.scan_namespace_files(&entry.path(), &mut layout.skipped)?;
                layout.namespaces.extend(found.iter().cloned());
                layout.schema_files = found;
                continue;
            }

            match LanguageId::new(name) {
                Ok(lang) => {
                    let found = self.scan_namespace_files(&entry.path(), &mut layout.skipped)?;
                    layout.namespaces.extend(found);
                    layout.languages.insert(lang);
                }
                Err(_) => layout.skipped.push(entry.path()),
            }
        }

        Ok(layout)
    }

    fn scan_namespace_files(
        &self,
        dir: &Path,
        skipped: &mut Vec<PathBuf>,
    ) -> io::Result<BTreeSet<NamespaceId>> {
        let mut found = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match NamespaceId::new(name) {
                Ok(ns) => {
                    found.insert(ns);
                }
                Err(_) => skipped.push(path),
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lang(s: &str) -> LanguageId {
        LanguageId::new(s).unwrap()
    }

    fn ns(s: &str) -> NamespaceId {
        NamespaceId::new(s).unwrap()
    }

    #[test]
    fn document_and_schema_paths() {
        let paths = ProjectPaths::new(PathBuf::from("/p"), "_schema");
        assert_eq!(
            paths.document_path(&lang("de"), &ns("common")),
            PathBuf::from("/p/de/common.json")
        );
        assert_eq!(paths.schema_dir(), PathBuf::from("/p/_schema"));
        assert_eq!(
            paths.project_config_path(),
            PathBuf::from("/p/.translatehub.toml")
        );
        assert_eq!(
            paths.tombstones_path(),
            PathBuf::from("/p/_schema/.tombstones.json")
        );
    }

    #[test]
    fn reserved_language_matches_schema_dir() {
        let paths = ProjectPaths::new(PathBuf::from("/p"), "_keys");
        assert!(paths.is_reserved(&lang("_keys")));
        assert!(!paths.is_reserved(&lang("_schema")));
    }

    #[test]
    fn scan_collects_languages_and_namespaces() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("en")).unwrap();
        fs::create_dir_all(root.join("de")).unwrap();
        fs::create_dir_all(root.join("_schema")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("en/common.json"), "{}").unwrap();
        fs::write(root.join("de/errors.json"), "{}").unwrap();
        fs::write(root.join("de/notes.txt"), "ignored").unwrap();
        fs::write(root.join("_schema/common.json"), "{}").unwrap();
        fs::write(root.join("_schema/.tombstones.json"), "{}").unwrap();
        fs::write(root.join("README.md"), "ignored").unwrap();

        let paths = ProjectPaths::new(root.to_path_buf(), "_schema");
        let layout = paths.scan().unwrap();

        assert_eq!(
            layout.languages,
            [lang("de"), lang("en")].into_iter().collect()
        );
        assert_eq!(
            layout.namespaces,
            [ns("common"), ns("errors")].into_iter().collect()
        );
        assert!(layout.has_schema_dir);
        assert_eq!(layout.schema_files, [ns("common")].into_iter().collect());
    }

    #[test]
    fn scan_skips_invalid_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("bad name")).unwrap();
        fs::create_dir_all(root.join("en")).unwrap();

        let paths = ProjectPaths::new(root.to_path_buf(), "_schema");
        let layout = paths.scan().unwrap();

        assert_eq!(layout.languages.len(), 1);
        assert_eq!(layout.skipped.len(), 1);
        assert!(!layout.has_schema_dir);
    }
}
