//! export command - Write schema-complete documents to a directory
//!
//! The output mirrors the project layout: `<out>/<language>/<namespace>.json`.
//! Every exported document holds exactly the namespace schema, with empty
//! strings for untranslated keys.

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::store::write_atomic;
use crate::core::types::{LanguageId, NamespaceId};
use crate::engine::query;
use crate::ui::output;

/// Export the selected languages and namespaces (all when empty).
pub fn export(
    ctx: &Context,
    out: &Path,
    languages: &[LanguageId],
    namespaces: &[NamespaceId],
) -> Result<()> {
    ctx.with_project(|project| {
        for lang in languages {
            if !project.has_language(lang) {
                bail!("Language '{}' does not exist", lang);
            }
        }
        for ns in namespaces {
            if !project.has_namespace(ns) {
                bail!("Namespace '{}' does not exist", ns);
            }
        }

        let pairs: Vec<_> = query::all_pairs(project)
            .into_iter()
            .filter(|(l, _)| languages.is_empty() || languages.contains(l))
            .filter(|(_, n)| namespaces.is_empty() || namespaces.contains(n))
            .collect();

        let encoding = project.store().encoding();
        let resolved = query::resolved_documents(project, &pairs)?;
        for doc in &resolved {
            let dir = out.join(doc.language.as_str());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(doc.namespace.file_name());
            write_atomic(&path, &doc.document.encode(encoding))?;
            output::debug(format!("wrote {}", path.display()), ctx.verbosity);
        }

        output::success(
            format!(
                "Exported {} document(s) to {}",
                resolved.len(),
                out.display()
            ),
            ctx.verbosity,
        );
        Ok(())
    })
}
