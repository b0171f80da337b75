//! stats and missing commands - Completion statistics

use anyhow::Result;

use crate::cli::Context;
use crate::core::types::{LanguageId, NamespaceId};
use crate::engine::stats::{self, Counts};
use crate::ui::output;

/// Show completion per language and namespace.
pub fn stats(
    ctx: &Context,
    language: Option<&LanguageId>,
    namespace: Option<&NamespaceId>,
) -> Result<()> {
    ctx.with_project(|project| {
        let snapshot = stats::snapshot(project);

        if ctx.json {
            output::json(&snapshot)?;
            return Ok(());
        }

        for failure in &snapshot.unreadable {
            output::warn(format!("unreadable, counted as empty: {failure}"), ctx.verbosity);
        }

        println!(
            "{:<12} {:<24} {:>12} {:>8}",
            "LANGUAGE", "NAMESPACE", "FILLED", "DONE"
        );
        for cell in snapshot.cells.iter().filter(|c| {
            language.map_or(true, |l| &c.language == l) && namespace.map_or(true, |n| &c.namespace == n)
        }) {
            println!(
                "{:<12} {:<24} {:>12} {:>8}",
                cell.language.as_str(),
                cell.namespace.as_str(),
                ratio(&cell.counts),
                output::format_percent(cell.counts.percent())
            );
        }

        println!();
        for (lang, counts) in &snapshot.by_language {
            if language.map_or(true, |l| lang == l) {
                println!(
                    "{:<37} {:>12} {:>8}",
                    lang.as_str(),
                    ratio(counts),
                    output::format_percent(counts.percent())
                );
            }
        }
        println!(
            "{:<37} {:>12} {:>8}",
            "overall",
            ratio(&snapshot.overall),
            output::format_percent(snapshot.overall.percent())
        );
        Ok(())
    })
}

/// List keys that have no translation.
pub fn missing(
    ctx: &Context,
    language: Option<&LanguageId>,
    namespace: Option<&NamespaceId>,
) -> Result<()> {
    ctx.with_project(|project| {
        let missing: Vec<_> = stats::missing_translations(project)
            .into_iter()
            .filter(|m| language.map_or(true, |l| &m.language == l))
            .filter(|m| namespace.map_or(true, |n| &m.namespace == n))
            .collect();

        if ctx.json {
            output::json(&missing)?;
        } else if missing.is_empty() {
            output::success("Nothing missing", ctx.verbosity);
        } else {
            for m in &missing {
                println!("{}:{} [{}]", m.namespace, m.key, m.language);
            }
        }
        Ok(())
    })
}

fn ratio(counts: &Counts) -> String {
    format!("{}/{}", counts.filled, counts.total)
}
