//! config command - Show the effective configuration

use anyhow::Result;
use serde::Serialize;

use crate::cli::Context;

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    schema_dir: String,
    compress_json: bool,
    prune_orphans: bool,
    auto_save_enabled: bool,
    auto_save_interval_secs: u64,
    global_config: Option<String>,
    project_config: Option<String>,
}

/// Print every setting with its effective value and the files it came from.
pub fn show(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let effective = EffectiveConfig {
        schema_dir: config.schema_dir_name().to_string(),
        compress_json: config.compress_json(),
        prune_orphans: config.prune_orphans(),
        auto_save_enabled: config.auto_save_enabled(),
        auto_save_interval_secs: config.auto_save_interval().as_secs(),
        global_config: config
            .global_config_loaded_from()
            .map(|p| p.display().to_string()),
        project_config: config
            .project_config_loaded_from()
            .map(|p| p.display().to_string()),
    };

    if ctx.json {
        crate::ui::output::json(&effective)?;
        return Ok(());
    }

    println!("schema_dir = {}", effective.schema_dir);
    println!("compress_json = {}", effective.compress_json);
    println!("prune_orphans = {}", effective.prune_orphans);
    println!("auto_save.enabled = {}", effective.auto_save_enabled);
    println!(
        "auto_save.interval_secs = {}",
        effective.auto_save_interval_secs
    );
    println!();
    println!(
        "# global: {}",
        effective.global_config.as_deref().unwrap_or("(none)")
    );
    println!(
        "# project: {}",
        effective.project_config.as_deref().unwrap_or("(none)")
    );
    Ok(())
}
