//! core::tombstones
//!
//! Removals that some language documents have not caught up with.
//!
//! When a key or namespace is deleted (or renamed away) and a language
//! document cannot be written, that document keeps the stale content.
//! A [`Tombstone`] records the removal together with the languages still
//! holding it, so a later synchronization discards the content instead of
//! adopting it back into the schema.
//!
//! Tombstones are persisted in a hidden file inside the schema directory,
//! which the layout scan never reports as a namespace. The file is removed
//! once every tombstone has settled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::document::Document;
use super::types::{KeyPath, LanguageId, NamespaceId};

/// One pending removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone<T> {
    /// Where surviving content belongs, for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor: Option<T>,

    /// Languages whose documents still hold the removed content.
    pub pending: BTreeSet<LanguageId>,
}

/// Key tombstones of one namespace.
pub type KeyTombstones = BTreeMap<KeyPath, Tombstone<KeyPath>>;

/// Every pending removal of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tombstones {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    keys: BTreeMap<NamespaceId, KeyTombstones>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    namespaces: BTreeMap<NamespaceId, Tombstone<NamespaceId>>,
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.namespaces.is_empty()
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Record that `key` left `ns` while `pending` still hold it.
    ///
    /// Pending languages accumulate across calls. Returns `false` when
    /// `pending` is empty.
    pub fn retire_key(
        &mut self,
        ns: &NamespaceId,
        key: &KeyPath,
        successor: Option<&KeyPath>,
        pending: impl IntoIterator<Item = LanguageId>,
    ) -> bool {
        let pending: BTreeSet<LanguageId> = pending.into_iter().collect();
        if pending.is_empty() {
            return false;
        }
        let stone = self
            .keys
            .entry(ns.clone())
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| Tombstone {
                successor: None,
                pending: BTreeSet::new(),
            });
        stone.successor = successor.cloned();
        stone.pending.extend(pending);
        true
    }

    /// Key tombstones of `ns` (empty if none).
    pub fn keys(&self, ns: &NamespaceId) -> KeyTombstones {
        self.keys.get(ns).cloned().unwrap_or_default()
    }

    /// Point tombstones whose successor is `from` at `to` instead.
    ///
    /// `None` means the content no longer has anywhere to go.
    pub fn redirect_key(&mut self, ns: &NamespaceId, from: &KeyPath, to: Option<&KeyPath>) -> bool {
        let Some(stones) = self.keys.get_mut(ns) else {
            return false;
        };
        let mut changed = false;
        for stone in stones.values_mut() {
            if stone.successor.as_ref() == Some(from) {
                stone.successor = to.cloned();
                changed = true;
            }
        }
        changed
    }

    /// `lang`'s documents of `ns` no longer hold any removed key.
    pub fn settle_keys(&mut self, ns: &NamespaceId, lang: &LanguageId) -> bool {
        let Some(stones) = self.keys.get_mut(ns) else {
            return false;
        };
        let mut changed = false;
        stones.retain(|_, stone| {
            changed |= stone.pending.remove(lang);
            !stone.pending.is_empty()
        });
        if stones.is_empty() {
            self.keys.remove(ns);
        }
        changed
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Record that `ns` was removed while `pending` still have its file.
    pub fn retire_namespace(
        &mut self,
        ns: &NamespaceId,
        successor: Option<&NamespaceId>,
        pending: impl IntoIterator<Item = LanguageId>,
    ) -> bool {
        let pending: BTreeSet<LanguageId> = pending.into_iter().collect();
        if pending.is_empty() {
            return false;
        }
        let stone = self
            .namespaces
            .entry(ns.clone())
            .or_insert_with(|| Tombstone {
                successor: None,
                pending: BTreeSet::new(),
            });
        stone.successor = successor.cloned();
        stone.pending.extend(pending);
        true
    }

    /// Whether `ns` has straggler files waiting for removal.
    pub fn is_namespace_retired(&self, ns: &NamespaceId) -> bool {
        self.namespaces.contains_key(ns)
    }

    /// Every retired namespace with its tombstone.
    pub fn retired_namespaces(&self) -> Vec<(NamespaceId, Tombstone<NamespaceId>)> {
        self.namespaces
            .iter()
            .map(|(ns, stone)| (ns.clone(), stone.clone()))
            .collect()
    }

    /// `lang` no longer has a file for retired namespace `ns`.
    pub fn settle_namespace(&mut self, ns: &NamespaceId, lang: &LanguageId) -> bool {
        let Some(stone) = self.namespaces.get_mut(ns) else {
            return false;
        };
        let changed = stone.pending.remove(lang);
        if stone.pending.is_empty() {
            self.namespaces.remove(ns);
        }
        changed
    }

    /// Drop the namespace tombstone of `ns` outright.
    pub fn forget_namespace(&mut self, ns: &NamespaceId) -> bool {
        self.namespaces.remove(ns).is_some()
    }

    /// Follow a namespace rename or delete.
    ///
    /// Key tombstones move with the namespace (or go with it), and
    /// namespace tombstones pointing at `from` are redirected.
    pub fn move_namespace(&mut self, from: &NamespaceId, to: Option<&NamespaceId>) -> bool {
        let mut changed = false;
        if let Some(stones) = self.keys.remove(from) {
            if let Some(to) = to {
                self.keys.insert(to.clone(), stones);
            }
            changed = true;
        }
        for stone in self.namespaces.values_mut() {
            if stone.successor.as_ref() == Some(from) {
                stone.successor = to.cloned();
                changed = true;
            }
        }
        changed
    }

    // =========================================================================
    // Languages
    // =========================================================================

    /// Carry pending entries over to a renamed language.
    pub fn rename_language(&mut self, from: &LanguageId, to: &LanguageId) -> bool {
        let mut changed = false;
        for stone in self.pending_sets() {
            if stone.remove(from) {
                stone.insert(to.clone());
                changed = true;
            }
        }
        changed
    }

    /// Forget a deleted language.
    pub fn remove_language(&mut self, lang: &LanguageId) -> bool {
        let mut changed = false;
        for stone in self.pending_sets() {
            changed |= stone.remove(lang);
        }
        self.keys.retain(|_, stones| {
            stones.retain(|_, stone| !stone.pending.is_empty());
            !stones.is_empty()
        });
        self.namespaces.retain(|_, stone| !stone.pending.is_empty());
        changed
    }

    fn pending_sets(&mut self) -> impl Iterator<Item = &mut BTreeSet<LanguageId>> {
        self.keys
            .values_mut()
            .flat_map(|stones| stones.values_mut())
            .map(|stone| &mut stone.pending)
            .chain(self.namespaces.values_mut().map(|stone| &mut stone.pending))
    }
}

/// Remove stale keys from `lang`'s document.
///
/// A stale value moves to its key's successor unless that already holds
/// a non-empty value. Returns the number of keys removed.
pub fn discard_stale(stones: &KeyTombstones, lang: &LanguageId, doc: &mut Document) -> usize {
    let mut removed = 0;
    for (key, stone) in stones {
        if !stone.pending.contains(lang) {
            continue;
        }
        let Some(value) = doc.remove(key) else {
            continue;
        };
        removed += 1;
        if let Some(next) = &stone.successor {
            if !doc.is_filled(next) && !value.trim().is_empty() {
                doc.insert(next.clone(), value);
            }
        }
    }
    removed
}

/// Copy values of `stale` into `target` where `target` has none.
pub fn fold_into(stale: &Document, target: &mut Document) -> usize {
    let mut copied = 0;
    for (key, value) in stale.iter() {
        if !target.is_filled(key) && !value.trim().is_empty() {
            target.insert(key.clone(), value.clone());
            copied += 1;
        }
    }
    copied
}
