//! engine::coordinator
//!
//! Single entry point for structural operations.
//!
//! # Protocol
//!
//! Every operation follows the same steps:
//! 1. Take the exclusion tokens of the namespaces it touches (language
//!    operations take the exclusive token)
//! 2. Validate the request against current state
//! 3. Update the schema entry in memory and persist it; on a write
//!    failure the in-memory entry is restored and the operation fails
//!    with nothing changed
//! 4. Fan out to the language documents through the synchronizer
//! 5. Report [`Outcome::Complete`], or [`Outcome::Degraded`] listing every
//!    (language, namespace) that was not updated
//!
//! Schema always goes first. A crash between steps 3 and 4 leaves
//! documents behind the schema, which `synchronize` repairs.
//!
//! A removal (delete or rename of a key or namespace) that some language
//! missed is recorded as a tombstone. Every later fan-out discards the
//! stale content from those languages before reconciling, so
//! `synchronize` finishes the removal instead of adopting the content
//! back into the schema.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::document::Document;
use crate::core::ops::NamespaceGuard;
use crate::core::store::StoreError;
use crate::core::tombstones::{discard_stale, fold_into, Tombstones};
use crate::core::types::{KeyPath, LanguageId, NamespaceId};

use super::outcome::{Applied, MutationError, Operation, Outcome, TargetFailure};
use super::project::Project;
use super::schema::{SchemaEntry, SchemaError};
use super::sync::ReconcileReport;

/// What to do when a moved key already exists in the target namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Leave the key in the source namespace.
    #[default]
    Skip,
    /// Overwrite the target's values.
    Replace,
    /// Move under `<source>_<key>`; skip if that is taken too.
    KeepBoth,
}

impl ConflictStrategy {
    /// Key the moved entry lands on, or `None` to skip it.
    fn target(self, from: &NamespaceId, key: &KeyPath, taken: &BTreeSet<KeyPath>) -> Option<KeyPath> {
        if !taken.contains(key) {
            return Some(key.clone());
        }
        match self {
            ConflictStrategy::Skip => None,
            ConflictStrategy::Replace => Some(key.clone()),
            ConflictStrategy::KeepBoth => {
                let prefixed = KeyPath::new(format!("{from}_{key}")).ok()?;
                (!taken.contains(&prefixed)).then_some(prefixed)
            }
        }
    }
}

/// A namespace that `synchronize_all` could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceError {
    pub namespace: NamespaceId,
    pub reason: String,
}

/// Result of synchronizing every namespace.
///
/// Each namespace is atomic on its own; the sweep as a whole may be
/// partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<Outcome>,
    pub errors: Vec<NamespaceError>,
}

impl SyncReport {
    /// Whether every namespace and every document was synchronized.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.outcomes.iter().all(Outcome::is_complete)
    }

    /// All failed targets across namespaces.
    pub fn failures(&self) -> impl Iterator<Item = &TargetFailure> {
        self.outcomes.iter().flat_map(|o| o.failures())
    }

    /// Documents written across namespaces.
    pub fn documents_touched(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                Outcome::Complete(applied) | Outcome::Degraded { applied, .. } => {
                    applied.documents_touched
                }
                Outcome::Unchanged { .. } => 0,
            })
            .sum()
    }
}

/// Structural operations over one project.
///
/// Obtained from [`Project::coordinator`].
#[derive(Debug, Clone, Copy)]
pub struct Coordinator<'p> {
    project: &'p Project,
}

impl<'p> Coordinator<'p> {
    pub(crate) fn new(project: &'p Project) -> Self {
        Self { project }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Add a key to a namespace; every language receives it empty.
    ///
    /// An existing key is reported as [`Outcome::Unchanged`]. A key that
    /// is not well formed fails with [`MutationError::Validation`].
    pub fn add_key(&self, ns: &NamespaceId, key: &KeyPath) -> Result<Outcome, MutationError> {
        key.ensure_well_formed()?;
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;

        let before = {
            let mut registry = self.project.registry();
            let before = registry.entry(ns).cloned();
            if !registry.add_key(ns, key) {
                return Ok(Outcome::Unchanged {
                    notice: format!("key '{key}' already exists in namespace '{ns}'"),
                });
            }
            before
        };
        let schema = self.persist_schema(ns, before)?;

        let report = self.fan_out(ns, &schema, &self.project.languages(), |_, _| {});

        Ok(self.finish(
            Operation::AddKey {
                namespace: ns.clone(),
                key: key.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    /// Rename a key, carrying its value over in every language.
    ///
    /// # Errors
    ///
    /// [`MutationError::Conflict`] if `to` already exists,
    /// [`MutationError::NotFound`] if `from` does not,
    /// [`MutationError::Validation`] if `to` is not well formed.
    pub fn rename_key(
        &self,
        ns: &NamespaceId,
        from: &KeyPath,
        to: &KeyPath,
    ) -> Result<Outcome, MutationError> {
        to.ensure_well_formed()?;
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;
        if from == to {
            return Ok(Outcome::Unchanged {
                notice: format!("key '{from}' already has that name"),
            });
        }

        let before = {
            let mut registry = self.project.registry();
            let before = registry.entry(ns).cloned();
            registry.rename_key(ns, from, to).map_err(schema_error)?;
            before
        };
        let schema = self.persist_schema(ns, before)?;

        let report = self.fan_out(ns, &schema, &self.project.languages(), |_, doc| {
            doc.rename(from, to);
        });
        let stragglers = failed_languages(&report.failed);
        self.update_tombstones(|t| {
            let redirected = t.redirect_key(ns, from, Some(to));
            t.retire_key(ns, from, Some(to), stragglers) || redirected
        });
        self.project.edits().rename_key(ns, from, to);

        Ok(self.finish(
            Operation::RenameKey {
                namespace: ns.clone(),
                from: from.clone(),
                to: to.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    /// Delete a key from the schema and every language.
    ///
    /// Destructive: the removed values are not kept anywhere.
    pub fn delete_key(&self, ns: &NamespaceId, key: &KeyPath) -> Result<Outcome, MutationError> {
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;

        let before = {
            let mut registry = self.project.registry();
            let before = registry.entry(ns).cloned();
            if !registry.delete_key(ns, key) {
                return Ok(Outcome::Unchanged {
                    notice: format!("key '{key}' does not exist in namespace '{ns}'"),
                });
            }
            before
        };
        let schema = self.persist_schema(ns, before)?;

        let report = self.fan_out(ns, &schema, &self.project.languages(), |_, doc| {
            doc.remove(key);
        });
        let stragglers = failed_languages(&report.failed);
        self.update_tombstones(|t| {
            let redirected = t.redirect_key(ns, key, None);
            t.retire_key(ns, key, None, stragglers) || redirected
        });
        self.project.edits().drop_key(ns, key);

        Ok(self.finish(
            Operation::DeleteKey {
                namespace: ns.clone(),
                key: key.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    /// Move keys with their values from one namespace to another.
    ///
    /// Keys that collide with the target are handled per `strategy`.
    /// A language whose target document could not be written keeps the
    /// keys in its source document.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Validation`] if both namespaces are the same
    /// - [`MutationError::NotFound`] for an unknown namespace or a key
    ///   absent from the source schema
    pub fn move_keys(
        &self,
        from: &NamespaceId,
        to: &NamespaceId,
        keys: &[KeyPath],
        strategy: ConflictStrategy,
    ) -> Result<Outcome, MutationError> {
        if from == to {
            return Err(MutationError::Validation(
                "source and target namespace are the same".into(),
            ));
        }
        let _guard = self.begin([from.clone(), to.clone()])?;
        self.require_namespace(from)?;
        self.require_namespace(to)?;

        let requested: BTreeSet<&KeyPath> = keys.iter().collect();
        let (plan, before_from, before_to) = {
            let mut registry = self.project.registry();
            let source = registry.get(from);
            let mut taken = registry.get(to);

            let mut plan: Vec<(KeyPath, KeyPath)> = Vec::new();
            for key in requested {
                if !source.contains(key) {
                    return Err(MutationError::NotFound(format!(
                        "key '{key}' in namespace '{from}'"
                    )));
                }
                match strategy.target(from, key, &taken) {
                    Some(dest) => {
                        taken.insert(dest.clone());
                        plan.push((key.clone(), dest));
                    }
                    None => tracing::debug!(key = %key, "key exists in target, skipped"),
                }
            }
            if plan.is_empty() {
                return Ok(Outcome::Unchanged {
                    notice: format!("no keys moved from '{from}' to '{to}'"),
                });
            }

            let before_from = registry.entry(from).cloned();
            let before_to = registry.entry(to).cloned();
            for (src, dest) in &plan {
                registry.add_key(to, dest);
                registry.delete_key(from, src);
            }
            (plan, before_from, before_to)
        };

        if let Err(err) = self.persist_schema(to, before_to.clone()) {
            self.project.registry().restore(from, before_from);
            return Err(err);
        }
        if let Err(err) = self.persist_schema(from, before_from) {
            self.rollback_schema(to, before_to);
            return Err(err);
        }

        let languages = self.project.languages();
        let store = self.project.store();
        let mut failures = Vec::new();

        let mut sources: BTreeMap<LanguageId, Document> = BTreeMap::new();
        for lang in &languages {
            match store.load(lang, from) {
                Ok(doc) => {
                    sources.insert(lang.clone(), doc);
                }
                Err(err) => failures.push(TargetFailure::from_store(lang, from, &err)),
            }
        }

        let to_schema = self.project.schema(to);
        let to_report = self.fan_out(to, &to_schema, &languages, |lang, doc| {
            if let Some(source) = sources.get(lang) {
                for (src, dest) in &plan {
                    if let Some(value) = source.get(src) {
                        doc.insert(dest.clone(), value);
                    }
                }
            }
        });

        let moved: Vec<LanguageId> = languages
            .iter()
            .filter(|lang| sources.contains_key(*lang))
            .filter(|lang| !to_report.failed.iter().any(|f| &f.language == *lang))
            .cloned()
            .collect();
        let from_schema = self.project.schema(from);
        let from_report = self.fan_out(from, &from_schema, &moved, |_, doc| {
            for (src, _) in &plan {
                doc.remove(src);
            }
        });
        let stragglers = failed_languages(&from_report.failed);
        self.update_tombstones(|t| {
            let mut changed = false;
            for (src, _) in &plan {
                changed |= t.redirect_key(from, src, None);
                changed |= t.retire_key(from, src, None, stragglers.iter().cloned());
            }
            changed
        });

        {
            let mut edits = self.project.edits();
            for (src, dest) in &plan {
                edits.move_key(from, to, src, dest);
            }
        }

        let touched = to_report.writes() + from_report.writes();
        failures.extend(to_report.failed);
        failures.extend(from_report.failed);

        Ok(self.finish(
            Operation::MoveKeys {
                from: from.clone(),
                to: to.clone(),
                keys: plan.into_iter().map(|(src, _)| src).collect(),
            },
            touched,
            failures,
        ))
    }

    // =========================================================================
    // Languages
    // =========================================================================

    /// Register a language; it receives every namespace with empty values.
    pub fn add_language(&self, lang: &LanguageId) -> Result<Outcome, MutationError> {
        let _guard = self.begin_exclusive()?;
        if self.project.paths().is_reserved(lang) {
            return Err(MutationError::Validation(format!(
                "'{lang}' is reserved for the schema directory"
            )));
        }
        if self.project.has_language(lang) {
            return Err(MutationError::Conflict(format!(
                "language '{lang}' already exists"
            )));
        }

        self.project.store().create_language(lang)?;
        self.project.languages_write().insert(lang.clone());

        let sync = self.project.synchronizer();
        let mut touched = 0;
        let mut failures = Vec::new();
        for ns in self.project.namespaces() {
            let report = sync.reconcile(&ns, &self.project.schema(&ns), [lang]);
            touched += report.writes();
            failures.extend(report.failed);
        }

        Ok(self.finish(
            Operation::AddLanguage {
                language: lang.clone(),
            },
            touched,
            failures,
        ))
    }

    /// Rename a language directory. Schema is unaffected.
    pub fn rename_language(
        &self,
        from: &LanguageId,
        to: &LanguageId,
    ) -> Result<Outcome, MutationError> {
        let _guard = self.begin_exclusive()?;
        self.require_language(from)?;
        if from == to {
            return Ok(Outcome::Unchanged {
                notice: format!("language '{from}' already has that name"),
            });
        }
        if self.project.paths().is_reserved(to) {
            return Err(MutationError::Validation(format!(
                "'{to}' is reserved for the schema directory"
            )));
        }
        if self.project.has_language(to) {
            return Err(MutationError::Conflict(format!(
                "language '{to}' already exists"
            )));
        }

        let store = self.project.store();
        store.rename_language(from, to)?;
        {
            let mut languages = self.project.languages_write();
            languages.remove(from);
            languages.insert(to.clone());
        }
        self.project.edits().rename_language(from, to);
        self.update_tombstones(|t| t.rename_language(from, to));

        let touched = self
            .project
            .namespaces()
            .iter()
            .filter(|ns| store.exists(to, ns))
            .count();
        Ok(self.finish(
            Operation::RenameLanguage {
                from: from.clone(),
                to: to.clone(),
            },
            touched,
            Vec::new(),
        ))
    }

    /// Remove a language and all of its documents. Schema is unaffected.
    pub fn delete_language(&self, lang: &LanguageId) -> Result<Outcome, MutationError> {
        let _guard = self.begin_exclusive()?;
        self.require_language(lang)?;

        let store = self.project.store();
        let touched = self
            .project
            .namespaces()
            .iter()
            .filter(|ns| store.exists(lang, ns))
            .count();
        store.remove_language(lang)?;
        self.project.languages_write().remove(lang);
        self.project.edits().discard_language(lang);
        self.update_tombstones(|t| t.remove_language(lang));

        Ok(self.finish(
            Operation::DeleteLanguage {
                language: lang.clone(),
            },
            touched,
            Vec::new(),
        ))
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Create a namespace with an empty schema and an empty document per
    /// language.
    ///
    /// # Errors
    ///
    /// [`MutationError::Conflict`] if the namespace exists, or if a
    /// language already has a document file under that name.
    pub fn add_namespace(&self, ns: &NamespaceId) -> Result<Outcome, MutationError> {
        let _guard = self.begin([ns.clone()])?;
        if self.project.has_namespace(ns) {
            return Err(MutationError::Conflict(format!(
                "namespace '{ns}' already exists"
            )));
        }
        let languages = self.project.languages();
        let store = self.project.store();
        if let Some(lang) = languages.iter().find(|lang| store.exists(lang, ns)) {
            return Err(MutationError::Conflict(format!(
                "'{}' already exists; run synchronize to adopt it",
                store.paths().document_path(lang, ns).display()
            )));
        }

        self.project.registry().ensure(ns);
        let schema = self.persist_schema(ns, None)?;
        self.update_tombstones(|t| t.forget_namespace(ns));
        let report = self.project.synchronizer().reconcile(ns, &schema, &languages);

        Ok(self.finish(
            Operation::AddNamespace {
                namespace: ns.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    /// Move a namespace's schema entry and every language's file.
    pub fn rename_namespace(
        &self,
        from: &NamespaceId,
        to: &NamespaceId,
    ) -> Result<Outcome, MutationError> {
        let _guard = self.begin([from.clone(), to.clone()])?;
        self.require_namespace(from)?;
        if from == to {
            return Ok(Outcome::Unchanged {
                notice: format!("namespace '{from}' already has that name"),
            });
        }
        if self.project.has_namespace(to) {
            return Err(MutationError::Conflict(format!(
                "namespace '{to}' already exists"
            )));
        }
        let languages = self.project.languages();
        let store = self.project.store();
        if let Some(lang) = languages.iter().find(|lang| store.exists(lang, to)) {
            return Err(MutationError::Conflict(format!(
                "'{}' already exists",
                store.paths().document_path(lang, to).display()
            )));
        }

        self.project
            .registry()
            .rename_namespace(from, to)
            .map_err(schema_error)?;
        if let Err(err) = store.rename_schema(from, to) {
            let _ = self.project.registry().rename_namespace(to, from);
            return Err(err.into());
        }
        let dirty = self.project.schema_entry(to).is_some_and(|e| e.is_dirty());
        if dirty {
            let keys = self.project.schema(to);
            match store.save_schema(to, &Document::blank(&keys)) {
                Ok(()) => self.project.registry().mark_clean(to),
                Err(err) => tracing::warn!(namespace = %to, error = %err, "schema not persisted"),
            }
        }
        self.project.edits().rename_namespace(from, to);

        let mut touched = 0;
        let mut failures = Vec::new();
        for lang in &languages {
            if !store.exists(lang, from) {
                continue;
            }
            match store.rename(lang, from, to) {
                Ok(()) => touched += 1,
                Err(err) => failures.push(TargetFailure::from_store(lang, from, &err)),
            }
        }
        let stragglers = failed_languages(&failures);
        self.update_tombstones(|t| {
            let moved = t.move_namespace(from, Some(to));
            t.retire_namespace(from, Some(to), stragglers) || moved
        });

        Ok(self.finish(
            Operation::RenameNamespace {
                from: from.clone(),
                to: to.clone(),
            },
            touched,
            failures,
        ))
    }

    /// Remove a namespace's schema entry and every language's file.
    pub fn delete_namespace(&self, ns: &NamespaceId) -> Result<Outcome, MutationError> {
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;

        let store = self.project.store();
        store.delete_schema(ns)?;
        self.project.registry().remove(ns);
        self.project.edits().discard_namespace(ns);

        let mut touched = 0;
        let mut failures = Vec::new();
        for lang in &self.project.languages() {
            if !store.exists(lang, ns) {
                continue;
            }
            match store.delete(lang, ns) {
                Ok(()) => touched += 1,
                Err(err) => failures.push(TargetFailure::from_store(lang, ns, &err)),
            }
        }
        let stragglers = failed_languages(&failures);
        self.update_tombstones(|t| {
            let moved = t.move_namespace(ns, None);
            t.retire_namespace(ns, None, stragglers) || moved
        });

        Ok(self.finish(
            Operation::DeleteNamespace {
                namespace: ns.clone(),
            },
            touched,
            failures,
        ))
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Bring every language's document in line with the current schema.
    pub fn reconcile(&self, ns: &NamespaceId) -> Result<Outcome, MutationError> {
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;

        let report = self.fan_out(ns, &self.project.schema(ns), &self.project.languages(), |_, _| {});
        Ok(self.finish(
            Operation::Reconcile {
                namespace: ns.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    /// Rebuild the schema from the documents, then reconcile.
    ///
    /// Keys found in any language join the schema, so nothing is pruned
    /// that some language still has.
    pub fn synchronize_namespace(&self, ns: &NamespaceId) -> Result<Outcome, MutationError> {
        let _guard = self.begin([ns.clone()])?;
        self.require_namespace(ns)?;
        self.synchronize_locked(ns)
    }

    /// Synchronize every namespace.
    ///
    /// Straggler files of removed namespaces are cleared first, then
    /// namespace files created on disk since the project was opened are
    /// picked up. A namespace that fails does not stop the sweep.
    pub fn synchronize_all(&self) -> Result<SyncReport, MutationError> {
        self.project.ensure_open()?;
        let mut report = SyncReport {
            errors: self.settle_removed_namespaces(),
            ..SyncReport::default()
        };
        self.discover_namespaces();

        for ns in self.project.namespaces() {
            match self.synchronize_namespace(&ns) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(MutationError::Closed) => return Err(MutationError::Closed),
                Err(err) => report.errors.push(NamespaceError {
                    namespace: ns,
                    reason: err.to_string(),
                }),
            }
        }
        Ok(report)
    }

    fn synchronize_locked(&self, ns: &NamespaceId) -> Result<Outcome, MutationError> {
        let languages = self.project.languages();
        let store = self.project.store();

        // Unreadable documents are reported by the reconcile below.
        let stale = self.project.registry().tombstones().keys(ns);
        let documents: Vec<Document> = languages
            .iter()
            .filter_map(|lang| {
                let mut doc = store.load(lang, ns).ok()?;
                discard_stale(&stale, lang, &mut doc);
                Some(doc)
            })
            .collect();

        let (before, dirty) = {
            let mut registry = self.project.registry();
            let before = registry.entry(ns).cloned();
            let added = registry.rebuild(ns, &documents);
            if added > 0 {
                tracing::debug!(namespace = %ns, keys = added, "schema gained keys");
            }
            let dirty = registry.entry(ns).is_some_and(SchemaEntry::is_dirty);
            (before, dirty)
        };
        let schema = if dirty {
            self.persist_schema(ns, before)?
        } else {
            self.project.schema(ns)
        };

        let report = self.fan_out(ns, &schema, &languages, |_, _| {});
        Ok(self.finish(
            Operation::Synchronize {
                namespace: ns.clone(),
            },
            report.writes(),
            report.failed,
        ))
    }

    fn discover_namespaces(&self) {
        let layout = match self.project.paths().scan() {
            Ok(layout) => layout,
            Err(err) => {
                tracing::warn!(error = %err, "rescan failed");
                return;
            }
        };
        for ns in layout.namespaces {
            if self.project.has_namespace(&ns)
                || self.project.registry().tombstones().is_namespace_retired(&ns)
            {
                continue;
            }
            let _guard = self.project.locks().acquire([ns.clone()]);
            if self.project.registry().ensure(&ns) {
                tracing::info!(namespace = %ns, "discovered namespace");
            }
        }
    }

    /// Clear straggler files of removed namespaces.
    ///
    /// A straggler of a renamed namespace is folded into the successor's
    /// document; any other straggler is deleted.
    fn settle_removed_namespaces(&self) -> Vec<NamespaceError> {
        let mut errors = Vec::new();
        let retired = self.project.registry().tombstones().retired_namespaces();
        for (ns, stone) in retired {
            let _guard = self
                .project
                .locks()
                .acquire(std::iter::once(ns.clone()).chain(stone.successor.clone()));
            let store = self.project.store();
            let successor = stone
                .successor
                .as_ref()
                .filter(|next| self.project.has_namespace(next));

            for lang in &stone.pending {
                let result = if self.project.has_language(lang) && store.exists(lang, &ns) {
                    match successor {
                        Some(next) => self.fold_namespace(lang, &ns, next),
                        None => store.delete(lang, &ns),
                    }
                } else {
                    Ok(())
                };
                match result {
                    Ok(()) => {
                        tracing::debug!(namespace = %ns, language = %lang, "removed straggler");
                        self.update_tombstones(|t| t.settle_namespace(&ns, lang));
                    }
                    Err(err) => errors.push(NamespaceError {
                        namespace: ns.clone(),
                        reason: err.to_string(),
                    }),
                }
            }
        }
        errors
    }

    fn fold_namespace(
        &self,
        lang: &LanguageId,
        from: &NamespaceId,
        to: &NamespaceId,
    ) -> Result<(), StoreError> {
        let store = self.project.store();
        let mut stale = store.load(lang, from)?;
        let removed = self.project.registry().tombstones().keys(to);
        discard_stale(&removed, lang, &mut stale);

        let mut target = store.load(lang, to)?;
        if fold_into(&stale, &mut target) > 0 || !store.exists(lang, to) {
            store.save(lang, to, &target)?;
        }
        store.delete(lang, from)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Reconcile `ns` for `languages` after discarding tombstoned content.
    ///
    /// Languages that come out clean have their key tombstones settled.
    fn fan_out<F>(
        &self,
        ns: &NamespaceId,
        schema: &BTreeSet<KeyPath>,
        languages: &[LanguageId],
        mut patch: F,
    ) -> ReconcileReport
    where
        F: FnMut(&LanguageId, &mut Document),
    {
        let stale = self.project.registry().tombstones().keys(ns);
        let report = self
            .project
            .synchronizer()
            .reconcile_with(ns, schema, languages, |lang, doc| {
                discard_stale(&stale, lang, doc);
                patch(lang, doc);
            });

        if !stale.is_empty() {
            self.update_tombstones(|t| {
                let mut changed = false;
                for lang in languages {
                    if !report.failed.iter().any(|f| &f.language == lang) {
                        changed |= t.settle_keys(ns, lang);
                    }
                }
                changed
            });
        }
        report
    }

    /// Apply `change` and persist the tombstones if it changed anything.
    fn update_tombstones(&self, change: impl FnOnce(&mut Tombstones) -> bool) {
        let mut registry = self.project.registry();
        if change(registry.tombstones_mut()) {
            if let Err(err) = registry.persist_tombstones(self.project.store()) {
                tracing::warn!(error = %err, "tombstones not persisted");
            }
        }
    }

    fn begin(
        &self,
        namespaces: impl IntoIterator<Item = NamespaceId>,
    ) -> Result<NamespaceGuard<'p>, MutationError> {
        self.project.ensure_open()?;
        let guard = self.project.locks().acquire(namespaces);
        // The project may have closed while we waited.
        self.project.ensure_open()?;
        Ok(guard)
    }

    fn begin_exclusive(&self) -> Result<NamespaceGuard<'p>, MutationError> {
        self.project.ensure_open()?;
        let guard = self.project.locks().acquire_exclusive();
        self.project.ensure_open()?;
        Ok(guard)
    }

    fn require_namespace(&self, ns: &NamespaceId) -> Result<(), MutationError> {
        if self.project.has_namespace(ns) {
            Ok(())
        } else {
            Err(MutationError::NotFound(format!("namespace '{ns}'")))
        }
    }

    fn require_language(&self, lang: &LanguageId) -> Result<(), MutationError> {
        if self.project.has_language(lang) {
            Ok(())
        } else {
            Err(MutationError::NotFound(format!("language '{lang}'")))
        }
    }

    /// Write the in-memory schema entry of `ns`.
    ///
    /// On failure the entry is reset to `before`.
    fn persist_schema(
        &self,
        ns: &NamespaceId,
        before: Option<SchemaEntry>,
    ) -> Result<BTreeSet<KeyPath>, MutationError> {
        let keys = self.project.schema(ns);
        match self
            .project
            .store()
            .save_schema(ns, &Document::blank(&keys))
        {
            Ok(()) => {
                self.project.registry().mark_clean(ns);
                Ok(keys)
            }
            Err(err) => {
                self.project.registry().restore(ns, before);
                Err(err.into())
            }
        }
    }

    /// Undo an already persisted schema change.
    fn rollback_schema(&self, ns: &NamespaceId, before: Option<SchemaEntry>) {
        let keys = before.as_ref().map(|e| e.keys().clone()).unwrap_or_default();
        self.project.registry().restore(ns, before);
        if let Err(err) = self
            .project
            .store()
            .save_schema(ns, &Document::blank(&keys))
        {
            tracing::warn!(namespace = %ns, error = %err, "schema file ahead of memory; synchronize to repair");
        }
    }

    fn finish(
        &self,
        operation: Operation,
        documents_touched: usize,
        failures: Vec<TargetFailure>,
    ) -> Outcome {
        if failures.is_empty() {
            tracing::info!(%operation, documents = documents_touched, "applied");
        } else {
            tracing::warn!(%operation, failed = failures.len(), "applied with failures");
        }
        Outcome::from_parts(
            Applied {
                operation,
                documents_touched,
            },
            failures,
        )
    }
}

fn failed_languages(failures: &[TargetFailure]) -> Vec<LanguageId> {
    failures.iter().map(|f| f.language.clone()).collect()
}

fn schema_error(err: SchemaError) -> MutationError {
    match err {
        SchemaError::KeyExists { .. } | SchemaError::NamespaceExists(_) => {
            MutationError::Conflict(err.to_string())
        }
        SchemaError::UnknownKey { .. } | SchemaError::UnknownNamespace(_) => {
            MutationError::NotFound(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::fs;
    use std::path::Path;
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

    fn keys(list: &[&str]) -> BTreeSet<KeyPath> {
        list.iter().map(|k| key(k)).collect()
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn setup() -> (TempDir, Project) {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "en/common.json", r#"{"a": "A", "b": "B"}"#);
        write(temp.path(), "de/common.json", r#"{"a": "Ä"}"#);
        let project = Project::open(temp.path(), Config::default()).unwrap();
        (temp, project)
    }

    mod strategy {
        use super::*;

        #[test]
        fn free_key_is_kept() {
            let taken = keys(&["x"]);
            assert_eq!(
                ConflictStrategy::Skip.target(&ns("src"), &key("a"), &taken),
                Some(key("a"))
            );
        }

        #[test]
        fn collisions() {
            let taken = keys(&["a", "src_b", "b"]);
            assert_eq!(ConflictStrategy::Skip.target(&ns("src"), &key("a"), &taken), None);
            assert_eq!(
                ConflictStrategy::Replace.target(&ns("src"), &key("a"), &taken),
                Some(key("a"))
            );
            assert_eq!(
                ConflictStrategy::KeepBoth.target(&ns("src"), &key("a"), &taken),
                Some(key("src_a"))
            );
            assert_eq!(
                ConflictStrategy::KeepBoth.target(&ns("src"), &key("b"), &taken),
                None
            );
        }
    }

    mod keys_ops {
        use super::*;

        #[test]
        fn add_existing_key_is_unchanged() {
            let (_temp, project) = setup();
            let outcome = project
                .coordinator()
                .add_key(&ns("common"), &key("a"))
                .unwrap();
            assert!(matches!(outcome, Outcome::Unchanged { .. }));
        }

        #[test]
        fn add_key_to_unknown_namespace_fails() {
            let (_temp, project) = setup();
            let err = project
                .coordinator()
                .add_key(&ns("nope"), &key("a"))
                .unwrap_err();
            assert!(matches!(err, MutationError::NotFound(_)));
        }

        #[test]
        fn rename_onto_existing_key_conflicts() {
            let (_temp, project) = setup();
            let err = project
                .coordinator()
                .rename_key(&ns("common"), &key("a"), &key("b"))
                .unwrap_err();
            assert!(matches!(err, MutationError::Conflict(_)));
            assert_eq!(project.schema(&ns("common")), keys(&["a", "b"]));
        }

        #[test]
        fn rename_moves_staged_edit() {
            let (_temp, project) = setup();
            project
                .set_value(&lang("de"), &ns("common"), &key("b"), "Bee")
                .unwrap();
            project
                .coordinator()
                .rename_key(&ns("common"), &key("b"), &key("c"))
                .unwrap();
            assert!(project.is_modified(&lang("de"), &ns("common"), &key("c")));
        }

        #[test]
        fn delete_drops_staged_edit() {
            let (_temp, project) = setup();
            project
                .set_value(&lang("de"), &ns("common"), &key("b"), "Bee")
                .unwrap();
            project
                .coordinator()
                .delete_key(&ns("common"), &key("b"))
                .unwrap();
            assert_eq!(project.pending_edits(), 0);
        }

        #[test]
        fn delete_absent_key_is_unchanged() {
            let (_temp, project) = setup();
            let outcome = project
                .coordinator()
                .delete_key(&ns("common"), &key("zzz"))
                .unwrap();
            assert!(matches!(outcome, Outcome::Unchanged { .. }));
        }
    }

    mod languages {
        use super::*;

        #[test]
        fn reserved_name_rejected() {
            let (_temp, project) = setup();
            let err = project
                .coordinator()
                .add_language(&lang("_schema"))
                .unwrap_err();
            assert!(matches!(err, MutationError::Validation(_)));
        }

        #[test]
        fn duplicate_language_conflicts() {
            let (_temp, project) = setup();
            let err = project.coordinator().add_language(&lang("en")).unwrap_err();
            assert!(matches!(err, MutationError::Conflict(_)));
        }

        #[test]
        fn rename_language_moves_directory() {
            let (temp, project) = setup();
            project
                .coordinator()
                .rename_language(&lang("de"), &lang("de-AT"))
                .unwrap();
            assert!(!temp.path().join("de").exists());
            assert!(temp.path().join("de-AT/common.json").is_file());
            assert_eq!(project.languages(), vec![lang("de-AT"), lang("en")]);
        }

        #[test]
        fn delete_language_keeps_schema() {
            let (temp, project) = setup();
            project.coordinator().delete_language(&lang("en")).unwrap();
            assert!(!temp.path().join("en").exists());
            assert_eq!(project.schema(&ns("common")), keys(&["a", "b"]));
        }
    }

    mod namespaces {
        use super::*;

        #[test]
        fn add_namespace_creates_empty_documents() {
            let (temp, project) = setup();
            let outcome = project.coordinator().add_namespace(&ns("menu")).unwrap();
            assert!(outcome.is_complete());
            assert_eq!(
                fs::read_to_string(temp.path().join("en/menu.json")).unwrap(),
                "{}\n"
            );
            assert!(temp.path().join("_schema/menu.json").is_file());
        }

        #[test]
        fn add_namespace_refuses_to_clobber_file() {
            let (temp, project) = setup();
            write(temp.path(), "en/stray.json", r#"{"k": "v"}"#);
            let err = project
                .coordinator()
                .add_namespace(&ns("stray"))
                .unwrap_err();
            assert!(matches!(err, MutationError::Conflict(_)));
        }

        #[test]
        fn rename_namespace_moves_files_and_schema() {
            let (temp, project) = setup();
            project
                .coordinator()
                .rename_namespace(&ns("common"), &ns("shared"))
                .unwrap();
            assert!(temp.path().join("en/shared.json").is_file());
            assert!(!temp.path().join("en/common.json").exists());
            assert!(temp.path().join("_schema/shared.json").is_file());
            assert_eq!(project.schema(&ns("shared")), keys(&["a", "b"]));
            assert!(!project.has_namespace(&ns("common")));
        }

        #[test]
        fn delete_namespace_removes_everything() {
            let (temp, project) = setup();
            project
                .coordinator()
                .delete_namespace(&ns("common"))
                .unwrap();
            assert!(!temp.path().join("en/common.json").exists());
            assert!(!temp.path().join("_schema/common.json").exists());
            assert!(project.namespaces().is_empty());
        }
    }

    mod sync {
        use super::*;

        #[test]
        fn synchronize_all_adopts_new_files() {
            let (temp, project) = setup();
            write(temp.path(), "en/extra.json", r#"{"k": "v"}"#);

            let report = project.coordinator().synchronize_all().unwrap();

            assert!(report.is_complete());
            assert_eq!(project.schema(&ns("extra")), keys(&["k"]));
            let de = project.store().load(&lang("de"), &ns("extra")).unwrap();
            assert_eq!(de.get(&key("k")), Some(""));
        }

        #[test]
        fn removal_follows_renamed_language() {
            let (temp, project) = setup();
            write(temp.path(), "de/common.json", "{ oops");

            let outcome = project
                .coordinator()
                .delete_key(&ns("common"), &key("a"))
                .unwrap();
            assert_eq!(outcome.failed_languages(), vec![lang("de")]);
            assert!(temp.path().join("_schema/.tombstones.json").is_file());

            write(temp.path(), "de/common.json", r#"{"a": "Ä"}"#);
            project
                .coordinator()
                .rename_language(&lang("de"), &lang("de-AT"))
                .unwrap();
            let outcome = project
                .coordinator()
                .synchronize_namespace(&ns("common"))
                .unwrap();

            assert!(outcome.is_complete());
            assert_eq!(project.schema(&ns("common")), keys(&["b"]));
            let de = project.store().load(&lang("de-AT"), &ns("common")).unwrap();
            assert_eq!(de.key_set(), keys(&["b"]));
            assert!(project.registry().tombstones().is_empty());
        }

        #[test]
        fn operations_fail_after_close() {
            let (_temp, project) = setup();
            project.close(false).unwrap();
            assert!(matches!(
                project.coordinator().reconcile(&ns("common")),
                Err(MutationError::Closed)
            ));
            assert!(matches!(
                project.coordinator().synchronize_all(),
                Err(MutationError::Closed)
            ));
        }
    }
}
