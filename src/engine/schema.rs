//! engine::schema
//!
//! The schema registry: canonical key structure per namespace.
//!
//! # Architecture
//!
//! The registry owns one [`SchemaEntry`] per namespace. Documents refer to
//! the schema but never own it. Every structural change is applied here
//! first, persisted to the schema directory, and only then fanned out to
//! language documents by the synchronizer.
//!
//! # Invariants
//!
//! - A namespace's key set only shrinks through an explicit delete or
//!   rename; [`SchemaRegistry::rebuild`] only ever adds keys
//! - Mutations mark the entry dirty until [`SchemaRegistry::persist`]
//!   succeeds
//! - Content under a [`Tombstones`] record is never adopted back by a
//!   rebuild; callers discard it from documents before rebuilding

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::core::document::Document;
use crate::core::store::{DocumentStore, StoreError};
use crate::core::tombstones::Tombstones;
use crate::core::types::{KeyPath, NamespaceId, UtcTimestamp};

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("key '{key}' already exists in namespace '{namespace}'")]
    KeyExists { namespace: NamespaceId, key: KeyPath },

    #[error("key '{key}' does not exist in namespace '{namespace}'")]
    UnknownKey { namespace: NamespaceId, key: KeyPath },

    #[error("namespace '{0}' already exists")]
    NamespaceExists(NamespaceId),

    #[error("namespace '{0}' does not exist")]
    UnknownNamespace(NamespaceId),
}

/// Canonical record for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    keys: BTreeSet<KeyPath>,
    modified_at: UtcTimestamp,
    dirty: bool,
}

impl SchemaEntry {
    fn new(keys: BTreeSet<KeyPath>, modified_at: UtcTimestamp, dirty: bool) -> Self {
        Self {
            keys,
            modified_at,
            dirty,
        }
    }

    /// The ordered key set.
    pub fn keys(&self) -> &BTreeSet<KeyPath> {
        &self.keys
    }

    /// When the key set last changed.
    pub fn modified_at(&self) -> UtcTimestamp {
        self.modified_at
    }

    /// Whether the entry has changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn touch(&mut self) {
        self.modified_at = UtcTimestamp::now();
        self.dirty = true;
    }
}

/// Owner of every namespace's schema entry.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: BTreeMap<NamespaceId, SchemaEntry>,
    tombstones: Tombstones,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key set of a namespace; empty if the namespace is unknown.
    pub fn get(&self, ns: &NamespaceId) -> BTreeSet<KeyPath> {
        self.entries
            .get(ns)
            .map(|e| e.keys.clone())
            .unwrap_or_default()
    }

    /// Full entry of a namespace.
    pub fn entry(&self, ns: &NamespaceId) -> Option<&SchemaEntry> {
        self.entries.get(ns)
    }

    /// Whether a namespace has a schema entry.
    pub fn contains_namespace(&self, ns: &NamespaceId) -> bool {
        self.entries.contains_key(ns)
    }

    /// Whether `key` is part of the namespace schema.
    pub fn contains_key(&self, ns: &NamespaceId, key: &KeyPath) -> bool {
        self.entries.get(ns).is_some_and(|e| e.keys.contains(key))
    }

    /// All known namespaces in order.
    pub fn namespaces(&self) -> impl Iterator<Item = &NamespaceId> {
        self.entries.keys()
    }

    /// Create an empty entry if absent. Returns `true` if one was created.
    pub fn ensure(&mut self, ns: &NamespaceId) -> bool {
        if self.entries.contains_key(ns) {
            return false;
        }
        self.entries.insert(
            ns.clone(),
            SchemaEntry::new(BTreeSet::new(), UtcTimestamp::now(), true),
        );
        true
    }

    /// Add a key. Returns `false` (no-op) if it is already present.
    pub fn add_key(&mut self, ns: &NamespaceId, key: &KeyPath) -> bool {
        self.ensure(ns);
        let Some(entry) = self.entries.get_mut(ns) else {
            return false;
        };
        if !entry.keys.insert(key.clone()) {
            return false;
        }
        entry.touch();
        true
    }

    /// Replace `old` with `new` in one step.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::KeyExists`] if `new` is already present
    /// - [`SchemaError::UnknownKey`] if `old` is absent
    /// - [`SchemaError::UnknownNamespace`] if the namespace is unknown
    pub fn rename_key(
        &mut self,
        ns: &NamespaceId,
        old: &KeyPath,
        new: &KeyPath,
    ) -> Result<(), SchemaError> {
        let entry = self
            .entries
            .get_mut(ns)
            .ok_or_else(|| SchemaError::UnknownNamespace(ns.clone()))?;
        if entry.keys.contains(new) {
            return Err(SchemaError::KeyExists {
                namespace: ns.clone(),
                key: new.clone(),
            });
        }
        if !entry.keys.remove(old) {
            return Err(SchemaError::UnknownKey {
                namespace: ns.clone(),
                key: old.clone(),
            });
        }
        entry.keys.insert(new.clone());
        entry.touch();
        Ok(())
    }

    /// Remove a key. Returns `false` (no-op) if it was absent.
    pub fn delete_key(&mut self, ns: &NamespaceId, key: &KeyPath) -> bool {
        let Some(entry) = self.entries.get_mut(ns) else {
            return false;
        };
        if !entry.keys.remove(key) {
            return false;
        }
        entry.touch();
        true
    }

    /// Union the namespace schema with the keys of `documents`.
    ///
    /// Existing schema keys are kept. Returns the number of keys added.
    pub fn rebuild<'a>(
        &mut self,
        ns: &NamespaceId,
        documents: impl IntoIterator<Item = &'a Document>,
    ) -> usize {
        self.ensure(ns);
        let Some(entry) = self.entries.get_mut(ns) else {
            return 0;
        };
        let before = entry.keys.len();
        for doc in documents {
            entry.keys.extend(doc.keys().cloned());
        }
        let added = entry.keys.len() - before;
        if added > 0 {
            entry.touch();
        }
        added
    }

    /// Remove a namespace entry, returning it.
    pub fn remove(&mut self, ns: &NamespaceId) -> Option<SchemaEntry> {
        self.entries.remove(ns)
    }

    /// Move an entry to a new namespace id.
    ///
    /// # Errors
    ///
    /// Fails if `old` is unknown or `new` already exists.
    pub fn rename_namespace(
        &mut self,
        old: &NamespaceId,
        new: &NamespaceId,
    ) -> Result<(), SchemaError> {
        if self.entries.contains_key(new) {
            return Err(SchemaError::NamespaceExists(new.clone()));
        }
        let entry = self
            .entries
            .remove(old)
            .ok_or_else(|| SchemaError::UnknownNamespace(old.clone()))?;
        self.entries.insert(new.clone(), entry);
        Ok(())
    }

    /// Put back a previously captured entry (or remove it for `None`).
    ///
    /// Used to undo an in-memory change whose persistence failed.
    pub fn restore(&mut self, ns: &NamespaceId, entry: Option<SchemaEntry>) {
        match entry {
            Some(entry) => {
                self.entries.insert(ns.clone(), entry);
            }
            None => {
                self.entries.remove(ns);
            }
        }
    }

    /// Insert an entry loaded from disk.
    pub fn insert_loaded(
        &mut self,
        ns: NamespaceId,
        keys: BTreeSet<KeyPath>,
        modified_at: Option<UtcTimestamp>,
    ) {
        let entry = SchemaEntry::new(keys, modified_at.unwrap_or_else(UtcTimestamp::now), false);
        self.entries.insert(ns, entry);
    }

    /// Namespaces with unpersisted changes.
    pub fn dirty_namespaces(&self) -> Vec<NamespaceId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(ns, _)| ns.clone())
            .collect()
    }

    /// Persist one entry to the schema directory and clear its dirty flag.
    pub fn persist(&mut self, store: &DocumentStore, ns: &NamespaceId) -> Result<(), StoreError> {
        let Some(entry) = self.entries.get_mut(ns) else {
            return Ok(());
        };
        store.save_schema(ns, &Document::blank(&entry.keys))?;
        entry.dirty = false;
        Ok(())
    }

    /// Pending removals.
    pub fn tombstones(&self) -> &Tombstones {
        &self.tombstones
    }

    pub fn tombstones_mut(&mut self) -> &mut Tombstones {
        &mut self.tombstones
    }

    /// Install tombstones loaded from disk.
    pub fn set_tombstones(&mut self, tombstones: Tombstones) {
        self.tombstones = tombstones;
    }

    /// Write the pending removals.
    pub fn persist_tombstones(&self, store: &DocumentStore) -> Result<(), StoreError> {
        store.save_tombstones(&self.tombstones)
    }

    /// Mark an entry as persisted without writing it.
    ///
    /// For callers that wrote the schema file themselves.
    pub fn mark_clean(&mut self, ns: &NamespaceId) {
        if let Some(entry) = self.entries.get_mut(ns) {
            entry.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Encoding;
    use crate::core::paths::ProjectPaths;
    use tempfile::TempDir;

    fn ns(s: &str) -> NamespaceId {
        NamespaceId::new(s).unwrap()
    }

    fn key(s: &str) -> KeyPath {
        KeyPath::new(s).unwrap()
    }

    fn keys(list: &[&str]) -> BTreeSet<KeyPath> {
        list.iter().map(|k| key(k)).collect()
    }

    #[test]
    fn unknown_namespace_is_empty() {
        let registry = SchemaRegistry::new();
        assert!(registry.get(&ns("nope")).is_empty());
        assert!(!registry.contains_namespace(&ns("nope")));
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.ensure(&ns("common")));
        assert!(!registry.ensure(&ns("common")));
        assert!(registry.entry(&ns("common")).unwrap().is_dirty());
    }

    #[test]
    fn add_key_is_noop_when_present() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.add_key(&ns("common"), &key("a")));
        registry.mark_clean(&ns("common"));

        assert!(!registry.add_key(&ns("common"), &key("a")));
        assert!(!registry.entry(&ns("common")).unwrap().is_dirty());
    }

    #[test]
    fn rename_key_conflict_leaves_schema() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("a"));
        registry.add_key(&ns("common"), &key("b"));

        let err = registry
            .rename_key(&ns("common"), &key("a"), &key("b"))
            .unwrap_err();

        assert!(matches!(err, SchemaError::KeyExists { .. }));
        assert_eq!(registry.get(&ns("common")), keys(&["a", "b"]));
    }

    #[test]
    fn rename_key_replaces() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("a"));
        registry
            .rename_key(&ns("common"), &key("a"), &key("z"))
            .unwrap();
        assert_eq!(registry.get(&ns("common")), keys(&["z"]));
    }

    #[test]
    fn rename_missing_key_fails() {
        let mut registry = SchemaRegistry::new();
        registry.ensure(&ns("common"));
        assert!(matches!(
            registry.rename_key(&ns("common"), &key("a"), &key("b")),
            Err(SchemaError::UnknownKey { .. })
        ));
    }

    #[test]
    fn delete_key_absent_is_noop() {
        let mut registry = SchemaRegistry::new();
        registry.ensure(&ns("common"));
        assert!(!registry.delete_key(&ns("common"), &key("a")));
        assert!(!registry.delete_key(&ns("other"), &key("a")));
    }

    #[test]
    fn delete_key_removes_and_marks_dirty() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("a"));
        registry.add_key(&ns("common"), &key("b"));
        registry.mark_clean(&ns("common"));

        assert!(registry.delete_key(&ns("common"), &key("a")));

        assert_eq!(registry.get(&ns("common")), keys(&["b"]));
        assert!(registry.entry(&ns("common")).unwrap().is_dirty());
        assert!(!registry.delete_key(&ns("common"), &key("a")));
    }

    #[test]
    fn rebuild_unions_documents_and_existing_keys() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("kept"));

        let mut en = Document::new();
        en.insert(key("a"), "1");
        let mut de = Document::new();
        de.insert(key("b"), "2");

        let added = registry.rebuild(&ns("common"), [&en, &de]);

        assert_eq!(added, 2);
        assert_eq!(registry.get(&ns("common")), keys(&["a", "b", "kept"]));
    }

    #[test]
    fn rename_namespace_moves_entry() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("old"), &key("a"));
        registry.ensure(&ns("taken"));

        assert_eq!(
            registry.rename_namespace(&ns("old"), &ns("taken")),
            Err(SchemaError::NamespaceExists(ns("taken")))
        );
        registry.rename_namespace(&ns("old"), &ns("new")).unwrap();

        assert!(!registry.contains_namespace(&ns("old")));
        assert_eq!(registry.get(&ns("new")), keys(&["a"]));
    }

    #[test]
    fn restore_undoes_change() {
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("a"));
        let before = registry.entry(&ns("common")).cloned();

        registry.delete_key(&ns("common"), &key("a"));
        registry.restore(&ns("common"), before);

        assert_eq!(registry.get(&ns("common")), keys(&["a"]));
    }

    #[test]
    fn persist_writes_schema_file_and_clears_dirty() {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::new(
            ProjectPaths::new(temp.path().to_path_buf(), "_schema"),
            Encoding::Pretty,
        );
        let mut registry = SchemaRegistry::new();
        registry.add_key(&ns("common"), &key("y"));
        registry.add_key(&ns("common"), &key("x"));

        registry.persist(&store, &ns("common")).unwrap();

        assert!(registry.dirty_namespaces().is_empty());
        let (doc, _) = store.load_schema(&ns("common")).unwrap().unwrap();
        assert_eq!(doc.key_set(), keys(&["x", "y"]));
        assert!(doc.iter().all(|(_, v)| v.is_empty()));
    }
}
