//! engine::edits
//!
//! Staged value edits awaiting a flush.
//!
//! Value edits change a translated string, never the key structure. They
//! are buffered here and written by [`Project::flush`], either on demand
//! or from the auto-save timer. Structural operations keep the buffer in
//! step (renames move pending values, deletes drop them).
//!
//! [`Project::flush`]: super::project::Project::flush

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::document::Document;
use crate::core::types::{KeyPath, LanguageId, NamespaceId};

use super::outcome::TargetFailure;

/// Pending values for one namespace, by language then key.
pub type NamespaceEdits = BTreeMap<LanguageId, BTreeMap<KeyPath, String>>;

/// Buffer of staged value edits.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    pending: BTreeMap<NamespaceId, NamespaceEdits>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a value, replacing any earlier staged value for the same key.
    pub fn stage(&mut self, lang: &LanguageId, ns: &NamespaceId, key: &KeyPath, value: String) {
        self.pending
            .entry(ns.clone())
            .or_default()
            .entry(lang.clone())
            .or_default()
            .insert(key.clone(), value);
    }

    /// The staged value for a key, if any.
    pub fn get(&self, lang: &LanguageId, ns: &NamespaceId, key: &KeyPath) -> Option<&str> {
        self.pending
            .get(ns)
            .and_then(|by_lang| by_lang.get(lang))
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }

    /// Whether a key has an unsaved edit.
    pub fn is_modified(&self, lang: &LanguageId, ns: &NamespaceId, key: &KeyPath) -> bool {
        self.get(lang, ns, key).is_some()
    }

    /// Number of staged values.
    pub fn len(&self) -> usize {
        self.pending
            .values()
            .flat_map(|by_lang| by_lang.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Namespaces with staged values.
    pub fn namespaces(&self) -> Vec<NamespaceId> {
        self.pending.keys().cloned().collect()
    }

    /// Remove and return every staged value of a namespace.
    pub fn take_namespace(&mut self, ns: &NamespaceId) -> Option<NamespaceEdits> {
        self.pending.remove(ns)
    }

    /// Put back values taken by [`take_namespace`](Self::take_namespace).
    ///
    /// Values staged in the meantime are newer and win.
    pub fn restore(&mut self, ns: &NamespaceId, edits: NamespaceEdits) {
        let by_lang = self.pending.entry(ns.clone()).or_default();
        for (lang, values) in edits {
            let current = by_lang.entry(lang).or_default();
            for (key, value) in values {
                current.entry(key).or_insert(value);
            }
        }
    }

    /// Drop everything. Returns the number of values discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.len();
        self.pending.clear();
        count
    }

    pub fn discard_language(&mut self, lang: &LanguageId) {
        for by_lang in self.pending.values_mut() {
            by_lang.remove(lang);
        }
        self.pending.retain(|_, by_lang| !by_lang.is_empty());
    }

    pub fn discard_namespace(&mut self, ns: &NamespaceId) {
        self.pending.remove(ns);
    }

    pub fn rename_language(&mut self, from: &LanguageId, to: &LanguageId) {
        for by_lang in self.pending.values_mut() {
            if let Some(values) = by_lang.remove(from) {
                by_lang.insert(to.clone(), values);
            }
        }
    }

    pub fn rename_namespace(&mut self, from: &NamespaceId, to: &NamespaceId) {
        if let Some(edits) = self.pending.remove(from) {
            self.pending.insert(to.clone(), edits);
        }
    }

    /// Drop staged values for a key in every language.
    pub fn drop_key(&mut self, ns: &NamespaceId, key: &KeyPath) {
        if let Some(by_lang) = self.pending.get_mut(ns) {
            for values in by_lang.values_mut() {
                values.remove(key);
            }
            by_lang.retain(|_, values| !values.is_empty());
            if by_lang.is_empty() {
                self.pending.remove(ns);
            }
        }
    }

    /// Move staged values from one key to another in every language.
    pub fn rename_key(&mut self, ns: &NamespaceId, from: &KeyPath, to: &KeyPath) {
        if let Some(by_lang) = self.pending.get_mut(ns) {
            for values in by_lang.values_mut() {
                if let Some(value) = values.remove(from) {
                    values.insert(to.clone(), value);
                }
            }
        }
    }

    /// Move staged values of `key` from namespace `from` to `to` under `target`.
    pub fn move_key(
        &mut self,
        from: &NamespaceId,
        to: &NamespaceId,
        key: &KeyPath,
        target: &KeyPath,
    ) {
        let mut moved = Vec::new();
        if let Some(by_lang) = self.pending.get_mut(from) {
            for (lang, values) in by_lang.iter_mut() {
                if let Some(value) = values.remove(key) {
                    moved.push((lang.clone(), value));
                }
            }
        }
        self.drop_key(from, key);
        for (lang, value) in moved {
            self.stage(&lang, to, target, value);
        }
    }

    /// Apply the staged values of (`lang`, `ns`) on top of `doc`.
    pub fn overlay(&self, lang: &LanguageId, ns: &NamespaceId, doc: &mut Document) {
        if let Some(values) = self.pending.get(ns).and_then(|by_lang| by_lang.get(lang)) {
            for (key, value) in values {
                doc.insert(key.clone(), value.clone());
            }
        }
    }
}

/// What a flush did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Documents written.
    pub saved: usize,
    /// Namespaces skipped because a structural operation was in flight.
    pub deferred: Vec<NamespaceId>,
    /// Staged values discarded because their key left the schema.
    pub dropped: usize,
    pub failed: Vec<TargetFailure>,
}

impl FlushReport {
    /// Whether nothing is left to retry.
    pub fn is_settled(&self) -> bool {
        self.deferred.is_empty() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &str) -> LanguageId {
        LanguageId::new(s).unwrap()
    }

    fn ns(s: &str) -> NamespaceId {
        NamespaceId::new(s).unwrap()
    }

    fn key(s: &str) -> KeyPath {
        KeyPath::new(s).unwrap()
    }

    #[test]
    fn stage_tracks_modified() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "A".into());
        edits.stage(&lang("en"), &ns("common"), &key("a"), "AA".into());

        assert!(edits.is_modified(&lang("en"), &ns("common"), &key("a")));
        assert!(!edits.is_modified(&lang("de"), &ns("common"), &key("a")));
        assert_eq!(edits.get(&lang("en"), &ns("common"), &key("a")), Some("AA"));
        assert_eq!(edits.len(), 1);
    }

    #[test]
    fn restore_keeps_newer_values() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "old".into());
        let taken = edits.take_namespace(&ns("common")).unwrap();
        assert!(edits.is_empty());

        edits.stage(&lang("en"), &ns("common"), &key("a"), "new".into());
        edits.restore(&ns("common"), taken);

        assert_eq!(edits.get(&lang("en"), &ns("common"), &key("a")), Some("new"));
    }

    #[test]
    fn drop_key_prunes_empty_maps() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "A".into());
        edits.drop_key(&ns("common"), &key("a"));
        assert!(edits.namespaces().is_empty());
    }

    #[test]
    fn rename_key_moves_value() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "A".into());
        edits.rename_key(&ns("common"), &key("a"), &key("b"));
        assert_eq!(edits.get(&lang("en"), &ns("common"), &key("b")), Some("A"));
        assert!(!edits.is_modified(&lang("en"), &ns("common"), &key("a")));
    }

    #[test]
    fn move_key_crosses_namespaces() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("src"), &key("a"), "A".into());
        edits.move_key(&ns("src"), &ns("dst"), &key("a"), &key("src_a"));
        assert_eq!(edits.get(&lang("en"), &ns("dst"), &key("src_a")), Some("A"));
        assert_eq!(edits.namespaces(), vec![ns("dst")]);
    }

    #[test]
    fn discard_language_leaves_others() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "A".into());
        edits.stage(&lang("de"), &ns("common"), &key("a"), "Ä".into());
        edits.discard_language(&lang("en"));
        assert_eq!(edits.len(), 1);
        assert!(edits.is_modified(&lang("de"), &ns("common"), &key("a")));
    }

    #[test]
    fn overlay_replaces_values() {
        let mut edits = EditBuffer::new();
        edits.stage(&lang("en"), &ns("common"), &key("a"), "new".into());
        let mut doc = Document::new();
        doc.insert(key("a"), "old");
        doc.insert(key("b"), "kept");

        edits.overlay(&lang("en"), &ns("common"), &mut doc);

        assert_eq!(doc.get(&key("a")), Some("new"));
        assert_eq!(doc.get(&key("b")), Some("kept"));
    }
}
