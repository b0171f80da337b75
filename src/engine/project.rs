//! engine::project
//!
//! The open project: explicit context passed to every core operation.
//!
//! # Lifecycle
//!
//! [`Project::open`] scans the root, loads the persisted schema entries and
//! rebuilds any namespace that has none. [`Project::close`] waits for
//! in-flight structural operations, flushes staged value edits and may
//! remove the working copy. After close every operation fails with
//! [`MutationError::Closed`].
//!
//! # Locking
//!
//! Shared state sits behind short-lived mutexes. Lock order, where two are
//! ever held together: namespace token, then registry, then languages,
//! then edits. File I/O happens with only the namespace token held.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::core::config::Config;
use crate::core::document::{Document, Encoding};
use crate::core::ops::NamespaceLocks;
use crate::core::paths::ProjectPaths;
use crate::core::store::{DocumentStore, StoreError};
use crate::core::types::{KeyPath, LanguageId, NamespaceId};

use super::coordinator::Coordinator;
use super::edits::{EditBuffer, FlushReport, NamespaceEdits};
use super::outcome::{MutationError, TargetFailure};
use super::schema::{SchemaEntry, SchemaRegistry};
use super::sync::Synchronizer;

/// Errors opening a project.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("project root '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("cannot scan project root '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An open translation project.
#[derive(Debug)]
pub struct Project {
    paths: ProjectPaths,
    config: Config,
    store: DocumentStore,
    languages: RwLock<BTreeSet<LanguageId>>,
    registry: Mutex<SchemaRegistry>,
    locks: NamespaceLocks,
    edits: Mutex<EditBuffer>,
    closed: AtomicBool,
}

impl Project {
    /// Open the project rooted at `root`.
    ///
    /// Schema files found in the schema directory are loaded as-is. Every
    /// namespace without one (all of them when the directory is missing)
    /// is rebuilt from the union of its documents and persisted, except
    /// namespaces that were removed while some language kept a file.
    /// Documents are not rewritten here.
    ///
    /// # Errors
    ///
    /// Fails if the root is not a directory or cannot be listed.
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Result<Project, OpenError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(OpenError::NotADirectory(root));
        }

        let paths = ProjectPaths::new(root, config.schema_dir_name());
        let store = DocumentStore::new(paths.clone(), Encoding::from_compress(config.compress_json()));
        let layout = paths.scan().map_err(|source| OpenError::Scan {
            path: paths.root().to_path_buf(),
            source,
        })?;

        for skipped in &layout.skipped {
            tracing::warn!(path = %skipped.display(), "ignoring entry with an invalid name");
        }

        let mut registry = SchemaRegistry::new();
        match store.load_tombstones() {
            Ok(tombstones) => registry.set_tombstones(tombstones),
            Err(err) => tracing::warn!(error = %err, "unreadable tombstones, ignoring"),
        }
        for ns in &layout.schema_files {
            match store.load_schema(ns) {
                Ok(Some((doc, modified))) => registry.insert_loaded(ns.clone(), doc.key_set(), modified),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(namespace = %ns, error = %err, "unreadable schema file, rebuilding");
                }
            }
        }

        for ns in &layout.namespaces {
            if registry.contains_namespace(ns) {
                continue;
            }
            if registry.tombstones().is_namespace_retired(ns) {
                tracing::debug!(namespace = %ns, "skipping removed namespace");
                continue;
            }
            let documents: Vec<Document> = layout
                .languages
                .iter()
                .filter_map(|lang| match store.load(lang, ns) {
                    Ok(doc) => Some(doc),
                    Err(err) => {
                        tracing::warn!(error = %err, "document left out of schema rebuild");
                        None
                    }
                })
                .collect();
            let added = registry.rebuild(ns, &documents);
            tracing::debug!(namespace = %ns, keys = added, "rebuilt schema");

            if let Err(err) = registry.persist(&store, ns) {
                tracing::warn!(namespace = %ns, error = %err, "could not persist rebuilt schema");
            }
        }

        tracing::info!(
            root = %paths.root().display(),
            languages = layout.languages.len(),
            namespaces = registry.namespaces().count(),
            "opened project"
        );

        Ok(Project {
            paths,
            config,
            store,
            languages: RwLock::new(layout.languages),
            registry: Mutex::new(registry),
            locks: NamespaceLocks::new(),
            edits: Mutex::new(EditBuffer::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Close the project.
    ///
    /// Waits for in-flight structural operations, then flushes staged
    /// edits. With `delete_working_copy` the edits are discarded and the
    /// root directory is removed instead.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Closed`] if already closed
    /// - [`MutationError::Io`] if the working copy cannot be removed
    pub fn close(&self, delete_working_copy: bool) -> Result<FlushReport, MutationError> {
        self.ensure_open()?;
        let _all = self.locks.acquire_exclusive();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(MutationError::Closed);
        }

        let report = if delete_working_copy {
            let discarded = self.edits().clear();
            let root = self.paths.root();
            fs::remove_dir_all(root).map_err(|source| StoreError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            tracing::info!(root = %root.display(), discarded, "removed working copy");
            FlushReport::default()
        } else {
            self.flush_pending(true)
        };

        tracing::info!(root = %self.paths.root().display(), "closed project");
        Ok(report)
    }

    /// Whether [`close`](Self::close) has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Known languages in order.
    pub fn languages(&self) -> Vec<LanguageId> {
        self.languages_read().iter().cloned().collect()
    }

    pub fn has_language(&self, lang: &LanguageId) -> bool {
        self.languages_read().contains(lang)
    }

    /// Known namespaces in order.
    pub fn namespaces(&self) -> Vec<NamespaceId> {
        self.registry().namespaces().cloned().collect()
    }

    pub fn has_namespace(&self, ns: &NamespaceId) -> bool {
        self.registry().contains_namespace(ns)
    }

    /// Schema key set of a namespace (empty if unknown).
    pub fn schema(&self, ns: &NamespaceId) -> BTreeSet<KeyPath> {
        self.registry().get(ns)
    }

    pub fn schema_entry(&self, ns: &NamespaceId) -> Option<SchemaEntry> {
        self.registry().entry(ns).cloned()
    }

    /// Entry point for structural operations.
    pub fn coordinator(&self) -> Coordinator<'_> {
        Coordinator::new(self)
    }

    // =========================================================================
    // Value edits
    // =========================================================================

    /// Stage a new value for an existing key.
    ///
    /// The value is written by the next [`flush`](Self::flush).
    ///
    /// # Errors
    ///
    /// [`MutationError::NotFound`] unless the language, the namespace and
    /// the key (in the namespace schema) all exist.
    pub fn set_value(
        &self,
        lang: &LanguageId,
        ns: &NamespaceId,
        key: &KeyPath,
        value: impl Into<String>,
    ) -> Result<(), MutationError> {
        self.ensure_open()?;
        if !self.has_language(lang) {
            return Err(MutationError::NotFound(format!("language '{lang}'")));
        }
        {
            let registry = self.registry();
            if !registry.contains_namespace(ns) {
                return Err(MutationError::NotFound(format!("namespace '{ns}'")));
            }
            if !registry.contains_key(ns, key) {
                return Err(MutationError::NotFound(format!(
                    "key '{key}' in namespace '{ns}'"
                )));
            }
        }
        self.edits().stage(lang, ns, key, value.into());
        Ok(())
    }

    /// Current value of a key: the staged edit if any, else the stored one.
    pub fn value(
        &self,
        lang: &LanguageId,
        ns: &NamespaceId,
        key: &KeyPath,
    ) -> Result<Option<String>, StoreError> {
        if let Some(staged) = self.edits().get(lang, ns, key) {
            return Ok(Some(staged.to_string()));
        }
        Ok(self.store.load(lang, ns)?.get(key).map(str::to_string))
    }

    pub fn is_modified(&self, lang: &LanguageId, ns: &NamespaceId, key: &KeyPath) -> bool {
        self.edits().is_modified(lang, ns, key)
    }

    /// Number of staged values not yet written.
    pub fn pending_edits(&self) -> usize {
        self.edits().len()
    }

    /// Drop every staged value. Returns how many were dropped.
    pub fn discard_edits(&self) -> usize {
        self.edits().clear()
    }

    /// Write staged edits.
    ///
    /// A namespace with a structural operation in flight is skipped and
    /// listed as deferred; its edits stay staged for the next flush.
    /// Edits whose key, language or namespace no longer exists are
    /// dropped. Edits that fail to write stay staged.
    pub fn flush(&self) -> FlushReport {
        if self.is_closed() {
            return FlushReport::default();
        }
        self.flush_pending(false)
    }

    fn flush_pending(&self, holding_exclusive: bool) -> FlushReport {
        let mut report = FlushReport::default();

        let namespaces = self.edits().namespaces();
        for ns in namespaces {
            let _guard = if holding_exclusive {
                None
            } else {
                match self.locks.try_acquire([ns.clone()]) {
                    Some(guard) => Some(guard),
                    None => {
                        tracing::debug!(namespace = %ns, "namespace busy, deferring flush");
                        report.deferred.push(ns);
                        continue;
                    }
                }
            };
            self.flush_namespace(&ns, &mut report);
        }

        if report.saved > 0 || !report.failed.is_empty() {
            tracing::info!(
                saved = report.saved,
                failed = report.failed.len(),
                deferred = report.deferred.len(),
                "flushed edits"
            );
        }
        report
    }

    fn flush_namespace(&self, ns: &NamespaceId, report: &mut FlushReport) {
        let Some(edits) = self.edits().take_namespace(ns) else {
            return;
        };
        let (known, schema) = {
            let registry = self.registry();
            (registry.contains_namespace(ns), registry.get(ns))
        };

        let mut retry = NamespaceEdits::new();
        for (lang, values) in edits {
            if !known || !self.has_language(&lang) {
                report.dropped += values.len();
                continue;
            }

            let before = values.len();
            let values: BTreeMap<KeyPath, String> = values
                .into_iter()
                .filter(|(key, _)| schema.contains(key))
                .collect();
            report.dropped += before - values.len();
            if values.is_empty() {
                continue;
            }

            let result = self.store.load(&lang, ns).and_then(|mut doc| {
                for (key, value) in &values {
                    doc.insert(key.clone(), value.clone());
                }
                self.store.save(&lang, ns, &doc)
            });
            match result {
                Ok(()) => report.saved += 1,
                Err(err) => {
                    tracing::warn!(language = %lang, namespace = %ns, error = %err, "flush failed");
                    report.failed.push(TargetFailure::from_store(&lang, ns, &err));
                    retry.insert(lang, values);
                }
            }
        }

        if !retry.is_empty() {
            self.edits().restore(ns, retry);
        }
    }

    // =========================================================================
    // Crate-internal state access
    // =========================================================================

    pub(crate) fn ensure_open(&self) -> Result<(), MutationError> {
        if self.is_closed() {
            Err(MutationError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn registry(&self) -> MutexGuard<'_, SchemaRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn edits(&self) -> MutexGuard<'_, EditBuffer> {
        self.edits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn languages_read(&self) -> RwLockReadGuard<'_, BTreeSet<LanguageId>> {
        self.languages.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn languages_write(&self) -> RwLockWriteGuard<'_, BTreeSet<LanguageId>> {
        self.languages.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn locks(&self) -> &NamespaceLocks {
        &self.locks
    }

    pub(crate) fn synchronizer(&self) -> Synchronizer<'_> {
        Synchronizer::new(&self.store, self.config.prune_orphans())
    }

    /// Load a document with staged edits applied on top.
    pub(crate) fn load_with_edits(
        &self,
        lang: &LanguageId,
        ns: &NamespaceId,
    ) -> Result<Document, StoreError> {
        let mut doc = self.store.load(lang, ns)?;
        self.edits().overlay(lang, ns, &mut doc);
        Ok(doc)
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

    fn key(s: &str) -> KeyPath {
        KeyPath::new(s).unwrap()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn open(root: &Path) -> Project {
        Project::open(root, Config::default()).unwrap()
    }

    mod open {
        use super::*;

        #[test]
        fn missing_root_fails() {
            let temp = TempDir::new().unwrap();
            let err = Project::open(temp.path().join("nope"), Config::default()).unwrap_err();
            assert!(matches!(err, OpenError::NotADirectory(_)));
        }

        #[test]
        fn rebuilds_and_persists_missing_schema() {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "en/common.json", r#"{"a": "1"}"#);
            write(temp.path(), "de/common.json", r#"{"b": "2"}"#);

            let project = open(temp.path());

            assert_eq!(project.languages(), vec![lang("de"), lang("en")]);
            assert_eq!(
                project.schema(&ns("common")),
                [key("a"), key("b")].into_iter().collect()
            );
            assert!(temp.path().join("_schema/common.json").is_file());
            // Documents are not touched on open.
            assert_eq!(
                fs::read_to_string(temp.path().join("en/common.json")).unwrap(),
                r#"{"a": "1"}"#
            );
        }

        #[test]
        fn persisted_schema_wins_over_documents() {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "_schema/common.json", r#"{"x": ""}"#);
            write(temp.path(), "en/common.json", r#"{"orphan": "1"}"#);

            let project = open(temp.path());

            assert_eq!(project.schema(&ns("common")), [key("x")].into_iter().collect());
        }

        #[test]
        fn malformed_document_skipped_in_rebuild() {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "en/common.json", r#"{"a": "1"}"#);
            write(temp.path(), "de/common.json", "{ nope");

            let project = open(temp.path());

            assert_eq!(project.schema(&ns("common")), [key("a")].into_iter().collect());
        }
    }

    mod edits {
        use super::*;

        fn project_with_key(temp: &TempDir) -> Project {
            write(temp.path(), "en/common.json", r#"{"a": "", "b": ""}"#);
            open(temp.path())
        }

        #[test]
        fn set_value_requires_schema_key() {
            let temp = TempDir::new().unwrap();
            let project = project_with_key(&temp);

            let err = project
                .set_value(&lang("en"), &ns("common"), &key("zzz"), "x")
                .unwrap_err();
            assert!(matches!(err, MutationError::NotFound(_)));

            let err = project
                .set_value(&lang("fr"), &ns("common"), &key("a"), "x")
                .unwrap_err();
            assert!(matches!(err, MutationError::NotFound(_)));
        }

        #[test]
        fn flush_writes_and_clears() {
            let temp = TempDir::new().unwrap();
            let project = project_with_key(&temp);
            project
                .set_value(&lang("en"), &ns("common"), &key("a"), "Alpha")
                .unwrap();
            assert!(project.is_modified(&lang("en"), &ns("common"), &key("a")));
            assert_eq!(
                project.value(&lang("en"), &ns("common"), &key("a")).unwrap(),
                Some("Alpha".to_string())
            );

            let report = project.flush();

            assert_eq!(report.saved, 1);
            assert!(report.is_settled());
            assert_eq!(project.pending_edits(), 0);
            let doc = project.store().load(&lang("en"), &ns("common")).unwrap();
            assert_eq!(doc.get(&key("a")), Some("Alpha"));
        }

        #[test]
        fn flush_defers_busy_namespace() {
            let temp = TempDir::new().unwrap();
            let project = project_with_key(&temp);
            project
                .set_value(&lang("en"), &ns("common"), &key("a"), "Alpha")
                .unwrap();

            let guard = project.locks().acquire([ns("common")]);
            let report = project.flush();
            assert_eq!(report.deferred, vec![ns("common")]);
            assert_eq!(project.pending_edits(), 1);
            drop(guard);

            assert_eq!(project.flush().saved, 1);
        }

        #[test]
        fn discard_drops_everything() {
            let temp = TempDir::new().unwrap();
            let project = project_with_key(&temp);
            project
                .set_value(&lang("en"), &ns("common"), &key("a"), "A")
                .unwrap();
            assert_eq!(project.discard_edits(), 1);
            assert_eq!(project.flush().saved, 0);
        }
    }

    mod close {
        use super::*;

        #[test]
        fn close_flushes_and_rejects_further_use() {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "en/common.json", r#"{"a": ""}"#);
            let project = open(temp.path());
            project
                .set_value(&lang("en"), &ns("common"), &key("a"), "A")
                .unwrap();

            let report = project.close(false).unwrap();

            assert_eq!(report.saved, 1);
            assert!(project.is_closed());
            assert!(matches!(project.close(false), Err(MutationError::Closed)));
            assert!(matches!(
                project.set_value(&lang("en"), &ns("common"), &key("a"), "B"),
                Err(MutationError::Closed)
            ));
        }

        #[test]
        fn close_can_delete_working_copy() {
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("project");
            write(&root, "en/common.json", r#"{"a": ""}"#);
            let project = open(&root);

            project.close(true).unwrap();

            assert!(!root.exists());
        }
    }
}
