//! engine::sync
//!
//! Reconciles language documents against a namespace schema.
//!
//! # Algorithm
//!
//! For each language:
//! 1. Load the stored document (a missing file is an empty document)
//! 2. Apply the caller's patch (value moves for renames, removals for deletes)
//! 3. Insert every schema key that is missing, with an empty value
//! 4. Remove keys absent from the schema, unless orphans are kept
//! 5. Write only if the file was missing, not in canonical form, or changed
//!
//! A document that cannot be loaded is recorded as a failed target and
//! left untouched on disk. The remaining languages still proceed.
//!
//! Because step 5 compares against what is on disk, running a reconcile
//! twice with no intervening change writes nothing the second time.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::document::Document;
use crate::core::store::DocumentStore;
use crate::core::types::{KeyPath, LanguageId, NamespaceId};

use super::outcome::TargetFailure;

/// What a reconcile pass did for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub namespace: Option<NamespaceId>,
    /// Languages whose document was written.
    pub written: Vec<LanguageId>,
    /// Languages whose document already matched.
    pub unchanged: Vec<LanguageId>,
    pub failed: Vec<TargetFailure>,
    pub keys_added: usize,
    pub keys_removed: usize,
}

impl ReconcileReport {
    fn for_namespace(ns: &NamespaceId) -> Self {
        Self {
            namespace: Some(ns.clone()),
            ..Self::default()
        }
    }

    /// Number of documents written.
    pub fn writes(&self) -> usize {
        self.written.len()
    }

    /// Whether every language succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives documents toward their namespace schema.
#[derive(Debug, Clone, Copy)]
pub struct Synchronizer<'a> {
    store: &'a DocumentStore,
    prune_orphans: bool,
}

impl<'a> Synchronizer<'a> {
    pub fn new(store: &'a DocumentStore, prune_orphans: bool) -> Self {
        Self {
            store,
            prune_orphans,
        }
    }

    /// Make every language's document for `ns` match `schema`.
    pub fn reconcile<'l>(
        &self,
        ns: &NamespaceId,
        schema: &BTreeSet<KeyPath>,
        languages: impl IntoIterator<Item = &'l LanguageId>,
    ) -> ReconcileReport {
        self.reconcile_with(ns, schema, languages, |_, _| {})
    }

    /// Reconcile, applying `patch` to each loaded document first.
    ///
    /// The patch runs before the schema is enforced, so a value moved to a
    /// new key survives while the old key is pruned.
    pub fn reconcile_with<'l, F>(
        &self,
        ns: &NamespaceId,
        schema: &BTreeSet<KeyPath>,
        languages: impl IntoIterator<Item = &'l LanguageId>,
        mut patch: F,
    ) -> ReconcileReport
    where
        F: FnMut(&LanguageId, &mut Document),
    {
        let mut report = ReconcileReport::for_namespace(ns);

        for lang in languages {
            let stored = match self.store.load_stored(lang, ns) {
                Ok(stored) => stored,
                Err(err) => {
                    tracing::warn!(language = %lang, namespace = %ns, error = %err, "skipping document");
                    report.failed.push(TargetFailure::from_store(lang, ns, &err));
                    continue;
                }
            };

            let (mut doc, on_disk, canonical) = match stored {
                Some(s) => (s.document.clone(), Some(s.document), s.canonical),
                None => (Document::new(), None, false),
            };

            patch(lang, &mut doc);
            let (added, removed) = doc.conform_to(schema, self.prune_orphans);

            let needs_write = match &on_disk {
                None => true,
                Some(original) => !canonical || *original != doc,
            };
            if !needs_write {
                report.unchanged.push(lang.clone());
                continue;
            }

            match self.store.save(lang, ns, &doc) {
                Ok(()) => {
                    report.written.push(lang.clone());
                    report.keys_added += added;
                    report.keys_removed += removed;
                }
                Err(err) => {
                    tracing::warn!(language = %lang, namespace = %ns, error = %err, "write failed");
                    report.failed.push(TargetFailure::from_store(lang, ns, &err));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Encoding;
    use crate::core::paths::ProjectPaths;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStore) {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::new(
            ProjectPaths::new(temp.path().to_path_buf(), "_schema"),
            Encoding::Pretty,
        );
        (temp, store)
    }

    fn lang(s: &str) -> LanguageId {
        LanguageId::new(s).unwrap()
    }

    fn ns(s: &str) -> NamespaceId {
        NamespaceId::new(s).unwrap()
    }

    fn key(s: &str) -> KeyPath {
        KeyPath::new(s).unwrap()
    }

    fn schema(keys: &[&str]) -> BTreeSet<KeyPath> {
        keys.iter().map(|k| key(k)).collect()
    }

    fn doc(pairs: &[(&str, &str)]) -> Document {
        pairs.iter().map(|(k, v)| (key(k), v.to_string())).collect()
    }

    mod reconcile {
        use super::*;

        #[test]
        fn fills_missing_keys_and_creates_files() {
            let (_temp, store) = setup();
            store.save(&lang("en"), &ns("common"), &doc(&[("a", "1")])).unwrap();
            let langs = [lang("en"), lang("de")];

            let report = Synchronizer::new(&store, true).reconcile(
                &ns("common"),
                &schema(&["a", "b"]),
                &langs,
            );

            assert!(report.is_clean());
            assert_eq!(report.writes(), 2);
            assert_eq!(
                store.load(&lang("en"), &ns("common")).unwrap(),
                doc(&[("a", "1"), ("b", "")])
            );
            assert_eq!(
                store.load(&lang("de"), &ns("common")).unwrap(),
                doc(&[("a", ""), ("b", "")])
            );
        }

        #[test]
        fn second_pass_writes_nothing() {
            let (_temp, store) = setup();
            let langs = [lang("en"), lang("de")];
            let sync = Synchronizer::new(&store, true);

            sync.reconcile(&ns("common"), &schema(&["x"]), &langs);
            let again = sync.reconcile(&ns("common"), &schema(&["x"]), &langs);

            assert_eq!(again.writes(), 0);
            assert_eq!(again.unchanged.len(), 2);
        }

        #[test]
        fn unsorted_file_is_rewritten() {
            let (temp, store) = setup();
            fs::create_dir_all(temp.path().join("en")).unwrap();
            fs::write(
                temp.path().join("en/common.json"),
                "{\"b\": \"2\", \"a\": \"1\"}",
            )
            .unwrap();

            let report = Synchronizer::new(&store, true).reconcile(
                &ns("common"),
                &schema(&["a", "b"]),
                &[lang("en")],
            );

            assert_eq!(report.writes(), 1);
            let text = fs::read_to_string(temp.path().join("en/common.json")).unwrap();
            assert_eq!(text, "{\n  \"a\": \"1\",\n  \"b\": \"2\"\n}\n");
        }

        #[test]
        fn orphans_pruned_or_kept() {
            let (_temp, store) = setup();
            store
                .save(&lang("en"), &ns("common"), &doc(&[("orphan", "x")]))
                .unwrap();

            Synchronizer::new(&store, false).reconcile(&ns("common"), &schema(&["a"]), &[lang("en")]);
            assert!(store
                .load(&lang("en"), &ns("common"))
                .unwrap()
                .contains(&key("orphan")));

            Synchronizer::new(&store, true).reconcile(&ns("common"), &schema(&["a"]), &[lang("en")]);
            assert_eq!(
                store.load(&lang("en"), &ns("common")).unwrap(),
                doc(&[("a", "")])
            );
        }

        #[test]
        fn malformed_document_fails_and_stays_untouched() {
            let (temp, store) = setup();
            fs::create_dir_all(temp.path().join("de")).unwrap();
            fs::write(temp.path().join("de/common.json"), "{ broken").unwrap();

            let report = Synchronizer::new(&store, true).reconcile(
                &ns("common"),
                &schema(&["a"]),
                &[lang("de"), lang("en")],
            );

            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].language, lang("de"));
            assert_eq!(report.written, vec![lang("en")]);
            assert_eq!(
                fs::read_to_string(temp.path().join("de/common.json")).unwrap(),
                "{ broken"
            );
        }
    }

    mod patch {
        use super::*;

        #[test]
        fn rename_patch_preserves_value() {
            let (_temp, store) = setup();
            store
                .save(&lang("en"), &ns("common"), &doc(&[("old", "Hello")]))
                .unwrap();

            Synchronizer::new(&store, true).reconcile_with(
                &ns("common"),
                &schema(&["new"]),
                &[lang("en")],
                |_, d| {
                    d.rename(&key("old"), &key("new"));
                },
            );

            assert_eq!(
                store.load(&lang("en"), &ns("common")).unwrap(),
                doc(&[("new", "Hello")])
            );
        }

        #[test]
        fn removal_patch_applies_without_pruning() {
            let (_temp, store) = setup();
            store
                .save(&lang("en"), &ns("common"), &doc(&[("gone", "x"), ("orphan", "y")]))
                .unwrap();

            Synchronizer::new(&store, false).reconcile_with(
                &ns("common"),
                &schema(&[]),
                &[lang("en")],
                |_, d| {
                    d.remove(&key("gone"));
                },
            );

            assert_eq!(
                store.load(&lang("en"), &ns("common")).unwrap(),
                doc(&[("orphan", "y")])
            );
        }
    }
}
