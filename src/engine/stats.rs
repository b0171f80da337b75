//! engine::stats
//!
//! Completion statistics over the language × namespace matrix.
//!
//! Statistics are computed on demand and never persisted. Only keys in
//! the namespace schema are counted; orphan keys left in a document do
//! not inflate the totals. Staged value edits count as the current value.
//!
//! Aggregates sum the counts of their cells and divide once, so a small
//! namespace weighs no more than its key count.

use serde::Serialize;

use crate::core::types::{KeyPath, LanguageId, NamespaceId, UtcTimestamp};

use super::outcome::TargetFailure;
use super::project::Project;

/// Key counts for one cell or aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub filled: usize,
    pub empty: usize,
}

impl Counts {
    /// Completion as a fraction in `0.0..=1.0`. An empty set is complete.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.filled as f64 / self.total as f64
        }
    }

    /// Completion as a percentage, unrounded.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.filled as f64 * 100.0 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.total
    }

    fn add(&mut self, other: Counts) {
        self.total += other.total;
        self.filled += other.filled;
        self.empty += other.empty;
    }
}

/// Counts for one (language, namespace) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub language: LanguageId,
    pub namespace: NamespaceId,
    pub counts: Counts,
}

/// Point-in-time completion statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub taken_at: UtcTimestamp,
    /// Cells ordered by language, then namespace.
    pub cells: Vec<Cell>,
    pub by_language: Vec<(LanguageId, Counts)>,
    pub by_namespace: Vec<(NamespaceId, Counts)>,
    pub overall: Counts,
    /// Documents that could not be read; their keys count as empty.
    pub unreadable: Vec<TargetFailure>,
}

impl Snapshot {
    /// Aggregate counts of one language.
    pub fn language(&self, lang: &LanguageId) -> Option<Counts> {
        self.by_language
            .iter()
            .find(|(l, _)| l == lang)
            .map(|(_, c)| *c)
    }

    /// Aggregate counts of one namespace.
    pub fn namespace(&self, ns: &NamespaceId) -> Option<Counts> {
        self.by_namespace
            .iter()
            .find(|(n, _)| n == ns)
            .map(|(_, c)| *c)
    }

    /// Counts of one (language, namespace) pair.
    pub fn cell(&self, lang: &LanguageId, ns: &NamespaceId) -> Option<Counts> {
        self.cells
            .iter()
            .find(|c| &c.language == lang && &c.namespace == ns)
            .map(|c| c.counts)
    }
}

/// A key without a translation in one language.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MissingTranslation {
    pub namespace: NamespaceId,
    pub key: KeyPath,
    pub language: LanguageId,
}

/// Compute a statistics snapshot. Does not modify the project.
pub fn snapshot(project: &Project) -> Snapshot {
    let languages = project.languages();
    let namespaces = project.namespaces();

    let mut cells = Vec::with_capacity(languages.len() * namespaces.len());
    let mut unreadable = Vec::new();
    let mut by_language = Vec::with_capacity(languages.len());
    let mut by_namespace: Vec<(NamespaceId, Counts)> =
        namespaces.iter().map(|ns| (ns.clone(), Counts::default())).collect();
    let mut overall = Counts::default();

    let schemas: Vec<_> = namespaces.iter().map(|ns| project.schema(ns)).collect();

    for lang in &languages {
        let mut lang_counts = Counts::default();
        for (idx, ns) in namespaces.iter().enumerate() {
            let schema = &schemas[idx];
            let counts = match project.load_with_edits(lang, ns) {
                Ok(doc) => {
                    let filled = schema.iter().filter(|k| doc.is_filled(k)).count();
                    Counts {
                        total: schema.len(),
                        filled,
                        empty: schema.len() - filled,
                    }
                }
                Err(err) => {
                    unreadable.push(TargetFailure::from_store(lang, ns, &err));
                    Counts {
                        total: schema.len(),
                        filled: 0,
                        empty: schema.len(),
                    }
                }
            };

            lang_counts.add(counts);
            by_namespace[idx].1.add(counts);
            cells.push(Cell {
                language: lang.clone(),
                namespace: ns.clone(),
                counts,
            });
        }
        overall.add(lang_counts);
        by_language.push((lang.clone(), lang_counts));
    }

    Snapshot {
        taken_at: UtcTimestamp::now(),
        cells,
        by_language,
        by_namespace,
        overall,
        unreadable,
    }
}

/// Every (namespace, key, language) whose value is empty or absent.
///
/// Ordered by namespace, then key, then language. Unreadable documents
/// are skipped.
pub fn missing_translations(project: &Project) -> Vec<MissingTranslation> {
    let languages = project.languages();
    let mut missing = Vec::new();

    for ns in project.namespaces() {
        let schema = project.schema(&ns);
        for lang in &languages {
            let doc = match project.load_with_edits(lang, &ns) {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable document");
                    continue;
                }
            };
            missing.extend(
                schema
                    .iter()
                    .filter(|k| !doc.is_filled(k))
                    .map(|k| MissingTranslation {
                        namespace: ns.clone(),
                        key: k.clone(),
                        language: lang.clone(),
                    }),
            );
        }
    }

    missing.sort();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_complete() {
        let counts = Counts::default();
        assert_eq!(counts.percent(), 100.0);
        assert_eq!(counts.ratio(), 1.0);
        assert!(counts.is_complete());
    }

    #[test]
    fn percent_is_exact() {
        let counts = Counts {
            total: 10,
            filled: 3,
            empty: 7,
        };
        assert_eq!(counts.percent(), 30.0);
    }

    #[test]
    fn aggregation_sums_counts() {
        let mut total = Counts::default();
        total.add(Counts {
            total: 1,
            filled: 1,
            empty: 0,
        });
        total.add(Counts {
            total: 99,
            filled: 0,
            empty: 99,
        });
        // Averaging percentages would give 50%.
        assert_eq!(total.percent(), 1.0);
    }
}
