//! lang command - Add, rename, delete or list languages

use anyhow::Result;

use super::report_outcome;
use crate::cli::args::LangAction;
use crate::cli::Context;
use crate::ui::output;

/// Run a language subcommand.
pub fn run(ctx: &Context, action: LangAction) -> Result<()> {
    ctx.with_project(|project| {
        let coordinator = project.coordinator();
        match action {
            LangAction::Add { language } => {
                report_outcome(ctx, coordinator.add_language(&language)?)
            }
            LangAction::Rename { from, to } => {
                report_outcome(ctx, coordinator.rename_language(&from, &to)?)
            }
            LangAction::Delete { language } => {
                report_outcome(ctx, coordinator.delete_language(&language)?)
            }
            LangAction::List => {
                let languages = project.languages();
                if ctx.json {
                    output::json(&languages)?;
                } else if languages.is_empty() {
                    output::print("No languages", ctx.verbosity);
                } else {
                    println!("{}", output::format_list(&languages, ""));
                }
                Ok(())
            }
        }
    })
}
