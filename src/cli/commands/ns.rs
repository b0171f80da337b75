//! ns command - Add, rename, delete or list namespaces

use anyhow::Result;

use super::report_outcome;
use crate::cli::args::NsAction;
use crate::cli::Context;
use crate::ui::output;

/// Run a namespace subcommand.
pub fn run(ctx: &Context, action: NsAction) -> Result<()> {
    ctx.with_project(|project| {
        let coordinator = project.coordinator();
        match action {
            NsAction::Add { namespace } => {
                report_outcome(ctx, coordinator.add_namespace(&namespace)?)
            }
            NsAction::Rename { from, to } => {
                report_outcome(ctx, coordinator.rename_namespace(&from, &to)?)
            }
            NsAction::Delete { namespace } => {
                report_outcome(ctx, coordinator.delete_namespace(&namespace)?)
            }
            NsAction::List => {
                let namespaces = project.namespaces();
                if ctx.json {
                    output::json(&namespaces)?;
                } else if namespaces.is_empty() {
                    output::print("No namespaces", ctx.verbosity);
                } else {
                    for ns in &namespaces {
                        let keys = project.schema(ns).len();
                        println!("{:<24} {:>5} key(s)", ns.as_str(), keys);
                    }
                }
                Ok(())
            }
        }
    })
}
