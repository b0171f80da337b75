//! key command - Add, rename, delete or list keys

use anyhow::{bail, Result};

use super::report_outcome;
use crate::cli::args::KeyAction;
use crate::cli::Context;
use crate::ui::output;

/// Run a key subcommand.
pub fn run(ctx: &Context, action: KeyAction) -> Result<()> {
    ctx.with_project(|project| {
        let coordinator = project.coordinator();
        match action {
            KeyAction::Add { namespace, key } => {
                report_outcome(ctx, coordinator.add_key(&namespace, &key)?)
            }
            KeyAction::Rename {
                namespace,
                from,
                to,
            } => report_outcome(ctx, coordinator.rename_key(&namespace, &from, &to)?),
            KeyAction::Delete { namespace, key } => {
                report_outcome(ctx, coordinator.delete_key(&namespace, &key)?)
            }
            KeyAction::List { namespace } => {
                if !project.has_namespace(&namespace) {
                    bail!("Namespace '{}' does not exist", namespace);
                }
                let keys: Vec<_> = project.schema(&namespace).into_iter().collect();
                if ctx.json {
                    output::json(&keys)?;
                } else {
                    for key in &keys {
                        println!("{}", key);
                    }
                }
                Ok(())
            }
        }
    })
}
