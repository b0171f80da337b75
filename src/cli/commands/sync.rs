//! sync command - Rebuild schemas and reconcile every language

use anyhow::{bail, Result};

use super::report_outcome;
use crate::cli::Context;
use crate::core::types::NamespaceId;
use crate::ui::output;

/// Synchronize one namespace or all of them.
///
/// With `no_rebuild` documents are reconciled against the schema as is.
pub fn sync(ctx: &Context, namespace: Option<&NamespaceId>, no_rebuild: bool) -> Result<()> {
    ctx.with_project(|project| {
        let coordinator = project.coordinator();

        if let Some(ns) = namespace {
            let outcome = if no_rebuild {
                coordinator.reconcile(ns)?
            } else {
                coordinator.synchronize_namespace(ns)?
            };
            return report_outcome(ctx, outcome);
        }

        let report = if no_rebuild {
            let mut report = crate::engine::SyncReport::default();
            for ns in project.namespaces() {
                report.outcomes.push(coordinator.reconcile(&ns)?);
            }
            report
        } else {
            coordinator.synchronize_all()?
        };

        if ctx.json {
            output::json(&report)?;
        } else {
            output::success(
                format!(
                    "Synchronized {} namespace(s), {} document(s) updated",
                    report.outcomes.len(),
                    report.documents_touched()
                ),
                ctx.verbosity,
            );
            for failure in report.failures() {
                output::error(format!("not updated: {failure}"));
            }
            for err in &report.errors {
                output::error(format!("{}: {}", err.namespace, err.reason));
            }
        }

        if !report.is_complete() {
            bail!("Synchronization incomplete");
        }
        Ok(())
    })
}
