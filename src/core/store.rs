//! core::store
//!
//! Flat-file persistence for translation documents and schema entries.
//!
//! # Architecture
//!
//! The store is the only code that touches document files. Every write
//! goes to a temp file in the target directory, is fsynced, then renamed
//! over the destination, so a crash mid-write never leaves a partially
//! written document behind.
//!
//! Loading a missing file is not an error: it yields `None` (callers
//! treat it as an empty document). A file that exists but cannot be
//! decoded is reported as [`StoreError::Malformed`]; it is never
//! overwritten by the store on its own initiative.
//!
//! # Example
//!
//! ```no_run
//! use translatehub::core::document::{Document, Encoding};
//! use translatehub::core::paths::ProjectPaths;
//! use translatehub::core::store::DocumentStore;
//! use translatehub::core::types::{LanguageId, NamespaceId};
//! use std::path::PathBuf;
//!
//! let store = DocumentStore::new(
//!     ProjectPaths::new(PathBuf::from("/locales"), "_schema"),
//!     Encoding::Pretty,
//! );
//! let en = LanguageId::new("en").unwrap();
//! let common = NamespaceId::new("common").unwrap();
//!
//! let doc = store.load(&en, &common)?;
//! store.save(&en, &common, &doc)?;
//! # Ok::<(), translatehub::core::store::StoreError>(())
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::document::{Document, DocumentError, Encoding};
use super::paths::ProjectPaths;
use super::tombstones::Tombstones;
use super::types::{LanguageId, NamespaceId, UtcTimestamp};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure (permissions, disk full, ...).
    #[error("i/o error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but does not hold a valid document.
    #[error("malformed document '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

impl StoreError {
    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            StoreError::Io { path, .. } | StoreError::Malformed { path, .. } => path,
        }
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.to_path_buf();
        move |source| StoreError::Io { path, source }
    }
}

/// A document as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Decoded contents.
    pub document: Document,
    /// Whether the file bytes already equal the canonical encoding.
    pub canonical: bool,
}

/// Document persistence over a project directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    paths: ProjectPaths,
    encoding: Encoding,
}

impl DocumentStore {
    /// Create a store rooted at `paths`.
    pub fn new(paths: ProjectPaths, encoding: Encoding) -> Self {
        Self { paths, encoding }
    }

    /// Path routing for this store.
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Encoding used for writes.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    // =========================================================================
    // Language documents
    // =========================================================================

    /// Load a document, treating a missing file as empty.
    pub fn load(&self, lang: &LanguageId, ns: &NamespaceId) -> Result<Document, StoreError> {
        Ok(self
            .load_stored(lang, ns)?
            .map(|s| s.document)
            .unwrap_or_default())
    }

    /// Load a document together with its canonical-form flag.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load_stored(
        &self,
        lang: &LanguageId,
        ns: &NamespaceId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.read_file(&self.paths.document_path(lang, ns))
    }

    /// Save a document atomically in canonical order.
    pub fn save(
        &self,
        lang: &LanguageId,
        ns: &NamespaceId,
        doc: &Document,
    ) -> Result<(), StoreError> {
        let path = self.paths.document_path(lang, ns);
        write_atomic(&path, &doc.encode(self.encoding))?;
        tracing::debug!(path = %path.display(), keys = doc.len(), "wrote document");
        Ok(())
    }

    /// Delete a document. Deleting a missing file succeeds.
    pub fn delete(&self, lang: &LanguageId, ns: &NamespaceId) -> Result<(), StoreError> {
        remove_if_exists(&self.paths.document_path(lang, ns))
    }

    /// Move a document to another namespace file. A missing source succeeds.
    pub fn rename(
        &self,
        lang: &LanguageId,
        from: &NamespaceId,
        to: &NamespaceId,
    ) -> Result<(), StoreError> {
        rename_if_exists(
            &self.paths.document_path(lang, from),
            &self.paths.document_path(lang, to),
        )
    }

    /// Whether a document file exists.
    pub fn exists(&self, lang: &LanguageId, ns: &NamespaceId) -> bool {
        self.paths.document_path(lang, ns).is_file()
    }

    // =========================================================================
    // Language directories
    // =========================================================================

    /// Create a language directory (idempotent).
    pub fn create_language(&self, lang: &LanguageId) -> Result<(), StoreError> {
        let dir = self.paths.language_dir(lang);
        fs::create_dir_all(&dir).map_err(StoreError::io(&dir))
    }

    /// Rename a language directory.
    pub fn rename_language(&self, from: &LanguageId, to: &LanguageId) -> Result<(), StoreError> {
        let src = self.paths.language_dir(from);
        let dst = self.paths.language_dir(to);
        fs::rename(&src, &dst).map_err(StoreError::io(&src))
    }

    /// Remove a language directory with all of its documents.
    pub fn remove_language(&self, lang: &LanguageId) -> Result<(), StoreError> {
        let dir = self.paths.language_dir(lang);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&dir)(e)),
        }
    }

    // =========================================================================
    // Schema entries
    // =========================================================================

    /// Load a persisted schema entry and its modification time.
    ///
    /// The schema file uses the document format with empty values.
    pub fn load_schema(
        &self,
        ns: &NamespaceId,
    ) -> Result<Option<(Document, Option<UtcTimestamp>)>, StoreError> {
        let path = self.paths.schema_path(ns);
        let Some(stored) = self.read_file(&path)? else {
            return Ok(None);
        };
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(UtcTimestamp::from_system_time);
        Ok(Some((stored.document, modified)))
    }

    /// Persist a schema entry atomically.
    pub fn save_schema(&self, ns: &NamespaceId, keys: &Document) -> Result<(), StoreError> {
        let path = self.paths.schema_path(ns);
        write_atomic(&path, &keys.encode(self.encoding))?;
        tracing::debug!(path = %path.display(), keys = keys.len(), "wrote schema");
        Ok(())
    }

    /// Delete a persisted schema entry. A missing file succeeds.
    pub fn delete_schema(&self, ns: &NamespaceId) -> Result<(), StoreError> {
        remove_if_exists(&self.paths.schema_path(ns))
    }

    /// Rename a persisted schema entry. A missing source succeeds.
    pub fn rename_schema(&self, from: &NamespaceId, to: &NamespaceId) -> Result<(), StoreError> {
        rename_if_exists(&self.paths.schema_path(from), &self.paths.schema_path(to))
    }

    /// Load pending removals; a missing file means none.
    pub fn load_tombstones(&self) -> Result<Tombstones, StoreError> {
        let path = self.paths.tombstones_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Tombstones::new()),
            Err(e) => return Err(StoreError::io(&path)(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path,
            source: DocumentError::Json(e.to_string()),
        })
    }

    /// Persist pending removals, removing the file once nothing is pending.
    pub fn save_tombstones(&self, tombstones: &Tombstones) -> Result<(), StoreError> {
        let path = self.paths.tombstones_path();
        if tombstones.is_empty() {
            return remove_if_exists(&path);
        }
        let mut bytes = serde_json::to_vec_pretty(tombstones).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e.into(),
        })?;
        bytes.push(b'\n');
        write_atomic(&path, &bytes)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn read_file(&self, path: &Path) -> Result<Option<StoredDocument>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path)(e)),
        };

        let document = Document::decode(&bytes).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        let canonical = document.encode(self.encoding) == bytes;
        Ok(Some(StoredDocument {
            document,
            canonical,
        }))
    }
}

/// Write bytes to `path` via temp file, fsync and rename.
///
/// Creates the parent directory if needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::io(&temp_path)(e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::io(path)(e)
    })
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path)(e)),
    }
}

fn rename_if_exists(from: &Path, to: &Path) -> Result<(), StoreError> {
    if !from.exists() {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }
    fs::rename(from, to).map_err(StoreError::io(from))
}
