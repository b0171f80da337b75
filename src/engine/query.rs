//! engine::query
//!
//! Read-only views for search and export.

use serde::Serialize;

use crate::core::document::Document;
use crate::core::types::{KeyPath, LanguageId, NamespaceId};

use super::outcome::MutationError;
use super::project::Project;

/// A key or value matching a search query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SearchHit {
    pub namespace: NamespaceId,
    pub key: KeyPath,
    pub language: LanguageId,
    pub value: String,
}

/// Find every entry whose key or value contains `query`.
///
/// Hits are ordered by namespace, key, then language. An empty query
/// matches nothing.
pub fn search(project: &Project, query: &str, case_sensitive: bool) -> Vec<SearchHit> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = if case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };
    let matches = |text: &str| {
        if case_sensitive {
            text.contains(&needle)
        } else {
            text.to_lowercase().contains(&needle)
        }
    };

    let languages = project.languages();
    let mut hits = Vec::new();
    for ns in project.namespaces() {
        for lang in &languages {
            let doc = match project.load_with_edits(lang, &ns) {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable document");
                    continue;
                }
            };
            for (key, value) in &doc {
                if matches(key.as_str()) || matches(value.as_str()) {
                    hits.push(SearchHit {
                        namespace: ns.clone(),
                        key: key.clone(),
                        language: lang.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
    }

    hits.sort();
    hits
}

/// A schema-complete document handed to an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub language: LanguageId,
    pub namespace: NamespaceId,
    pub document: Document,
}

/// Resolve the requested (language, namespace) pairs.
///
/// Each document holds exactly the namespace schema: missing keys are
/// filled with empty strings, orphan keys are dropped and staged edits
/// are applied. Nothing is written.
///
/// # Errors
///
/// - [`MutationError::NotFound`] for an unknown language or namespace
/// - [`MutationError::Io`] if a document cannot be read
pub fn resolved_documents(
    project: &Project,
    pairs: &[(LanguageId, NamespaceId)],
) -> Result<Vec<ResolvedDocument>, MutationError> {
    project.ensure_open()?;
    let mut resolved = Vec::with_capacity(pairs.len());

    for (lang, ns) in pairs {
        if !project.has_language(lang) {
            return Err(MutationError::NotFound(format!("language '{lang}'")));
        }
        if !project.has_namespace(ns) {
            return Err(MutationError::NotFound(format!("namespace '{ns}'")));
        }

        let schema = project.schema(ns);
        let mut document = project.load_with_edits(lang, ns)?;
        document.conform_to(&schema, true);
        resolved.push(ResolvedDocument {
            language: lang.clone(),
            namespace: ns.clone(),
            document,
        });
    }

    Ok(resolved)
}

/// Every (language, namespace) pair of the project, in order.
pub fn all_pairs(project: &Project) -> Vec<(LanguageId, NamespaceId)> {
    let namespaces = project.namespaces();
    project
        .languages()
        .into_iter()
        .flat_map(|lang| namespaces.iter().map(move |ns| (lang.clone(), ns.clone())))
        .collect()
}
