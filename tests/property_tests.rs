//! Property-based tests for documents and reconciliation.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tempfile::TempDir;

use translatehub::core::document::{Document, Encoding};
use translatehub::core::paths::ProjectPaths;
use translatehub::core::store::DocumentStore;
use translatehub::core::types::{KeyPath, LanguageId, NamespaceId};
use translatehub::engine::Synchronizer;

/// Strategy for generating valid key paths like `menu.file/open`.
fn valid_key_path() -> impl Strategy<Value = String> {
    (
        "[a-z][a-z0-9_]{0,7}",
        prop::collection::vec(
            (prop::sample::select(vec!['.', '/']), "[a-zA-Z0-9_-]{1,6}"),
            0..3,
        ),
    )
        .prop_map(|(head, rest)| {
            let mut path = head;
            for (delim, segment) in rest {
                path.push(delim);
                path.push_str(&segment);
            }
            path
        })
}

/// Strategy for documents with arbitrary (including non-ASCII) values.
fn document() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(valid_key_path(), "\\PC{0,12}", 0..12)
}

fn to_document(map: &BTreeMap<String, String>) -> Document {
    map.iter()
        .map(|(k, v)| (KeyPath::new(k.as_str()).unwrap(), v.clone()))
        .collect()
}

proptest! {
    /// Any generated key path is accepted and keeps its text.
    #[test]
    fn key_path_accepts_valid(path in valid_key_path()) {
        let key = KeyPath::new(path.as_str()).unwrap();
        prop_assert_eq!(key.as_str(), path.as_str());
        prop_assert!(key.ensure_well_formed().is_ok());
        prop_assert!(key.segments().all(|s| !s.is_empty()));
    }

    /// A doubled delimiter always yields an empty segment, which loads
    /// but is refused for a new key.
    #[test]
    fn key_path_rejects_empty_segment(a in "[a-z]{1,5}", b in "[a-z]{1,5}") {
        for raw in [format!("{a}..{b}"), format!("{a}/.{b}"), format!("{a}.")] {
            let key = KeyPath::new(raw.as_str()).unwrap();
            prop_assert_eq!(key.as_str(), raw.as_str());
            prop_assert!(key.ensure_well_formed().is_err());
        }
    }

    /// Decoding an encoded document yields the same entries, and encoding
    /// the result reproduces the bytes in alphabetical key order.
    #[test]
    fn encoded_documents_are_canonical(map in document(), compact in any::<bool>()) {
        let encoding = Encoding::from_compress(compact);
        let bytes = to_document(&map).encode(encoding);
        let decoded = Document::decode(&bytes).unwrap();

        let keys: Vec<&str> = decoded.keys().map(KeyPath::as_str).collect();
        let expected: Vec<&str> = map.keys().map(String::as_str).collect();
        prop_assert_eq!(keys, expected);
        prop_assert_eq!(decoded.encode(encoding), bytes);
    }

    /// After reconcile every language holds exactly the schema, values of
    /// schema keys survive, and a second pass writes nothing.
    #[test]
    fn reconcile_yields_schema_exactly(
        schema in prop::collection::btree_set(valid_key_path(), 0..8),
        en in document(),
        de in document(),
    ) {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::new(
            ProjectPaths::new(temp.path().to_path_buf(), "_schema"),
            Encoding::Pretty,
        );
        let ns = NamespaceId::new("common").unwrap();
        let languages = [LanguageId::new("en").unwrap(), LanguageId::new("de").unwrap()];
        store.create_language(&languages[0]).unwrap();
        store.create_language(&languages[1]).unwrap();
        store.save(&languages[0], &ns, &to_document(&en)).unwrap();
        store.save(&languages[1], &ns, &to_document(&de)).unwrap();

        let schema: BTreeSet<KeyPath> = schema
            .iter()
            .map(|k| KeyPath::new(k.as_str()).unwrap())
            .collect();
        let sync = Synchronizer::new(&store, true);
        let first = sync.reconcile(&ns, &schema, &languages);
        prop_assert!(first.failed.is_empty());

        for (lang, original) in languages.iter().zip([&en, &de]) {
            let doc = store.load(lang, &ns).unwrap();
            prop_assert_eq!(&doc.key_set(), &schema);
            for key in &schema {
                let before = original.get(key.as_str()).map(String::as_str).unwrap_or("");
                prop_assert_eq!(doc.get(key), Some(before));
            }
        }

        let second = sync.reconcile(&ns, &schema, &languages);
        prop_assert_eq!(second.writes(), 0);
    }
}
