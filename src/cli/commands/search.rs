//! search command - Find keys and values

use anyhow::Result;

use crate::cli::Context;
use crate::engine::query;
use crate::ui::output;

/// Search every document for `query` in keys and values.
pub fn search(ctx: &Context, query: &str, case_sensitive: bool) -> Result<()> {
    ctx.with_project(|project| {
        let hits = query::search(project, query, case_sensitive);

        if ctx.json {
            output::json(&hits)?;
        } else if hits.is_empty() {
            output::print(format!("No matches for '{}'", query), ctx.verbosity);
        } else {
            for hit in &hits {
                println!(
                    "{}:{} [{}] {}",
                    hit.namespace, hit.key, hit.language, hit.value
                );
            }
        }
        Ok(())
    })
}
