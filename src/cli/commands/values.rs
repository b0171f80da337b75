//! set and show commands - Edit and inspect translation values

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use crate::cli::Context;
use crate::core::types::{KeyPath, LanguageId, NamespaceId};
use crate::engine::query;
use crate::ui::output;

/// Stage a value; it is written when the project closes.
pub fn set(
    ctx: &Context,
    language: &LanguageId,
    namespace: &NamespaceId,
    key: &KeyPath,
    value: &str,
) -> Result<()> {
    ctx.with_project(|project| {
        project.set_value(language, namespace, key, value)?;
        if ctx.json {
            return Ok(());
        }
        output::success(
            format!("Set {}:{} [{}]", namespace, key, language),
            ctx.verbosity,
        );
        Ok(())
    })
}

#[derive(Debug, Serialize)]
struct ValueRow {
    language: LanguageId,
    key: KeyPath,
    value: String,
}

/// Print the values of a namespace, optionally narrowed to one key or language.
pub fn show(
    ctx: &Context,
    namespace: &NamespaceId,
    key: Option<&KeyPath>,
    language: Option<&LanguageId>,
) -> Result<()> {
    ctx.with_project(|project| {
        if let Some(key) = key {
            if !project.schema(namespace).contains(key) && project.has_namespace(namespace) {
                bail!("Key '{}' does not exist in namespace '{}'", key, namespace);
            }
        }

        let languages: Vec<_> = match language {
            Some(lang) => vec![lang.clone()],
            None => project.languages(),
        };
        let pairs: Vec<_> = languages
            .into_iter()
            .map(|lang| (lang, namespace.clone()))
            .collect();
        let resolved = query::resolved_documents(project, &pairs)
            .with_context(|| format!("Failed to read namespace '{}'", namespace))?;

        let rows: Vec<ValueRow> = resolved
            .iter()
            .flat_map(|r| {
                r.document
                    .iter()
                    .filter(move |(k, _)| key.map_or(true, |wanted| *k == wanted))
                    .map(move |(k, v)| ValueRow {
                        language: r.language.clone(),
                        key: k.clone(),
                        value: v.clone(),
                    })
            })
            .collect();

        if ctx.json {
            output::json(&rows)?;
            return Ok(());
        }

        for row in &rows {
            let marker = if project.is_modified(&row.language, namespace, &row.key) {
                "*"
            } else {
                " "
            };
            println!(
                "{}{:<8} {:<32} {}",
                marker,
                row.language.as_str(),
                row.key.as_str(),
                row.value
            );
        }
        Ok(())
    })
}
