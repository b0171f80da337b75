//! move-keys command - Move keys between namespaces

use anyhow::Result;

use super::report_outcome;
use crate::cli::Context;
use crate::core::types::{KeyPath, NamespaceId};
use crate::engine::ConflictStrategy;

/// Move `keys` with their values from one namespace to another.
pub fn move_keys(
    ctx: &Context,
    from: &NamespaceId,
    to: &NamespaceId,
    keys: &[KeyPath],
    strategy: ConflictStrategy,
) -> Result<()> {
    ctx.with_project(|project| {
        let outcome = project.coordinator().move_keys(from, to, keys, strategy)?;
        report_outcome(ctx, outcome)
    })
}
