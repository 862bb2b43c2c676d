//! Init, Config and Templates commands.

use anyhow::{Context, bail};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use console::style;

use super::open_store;
use crate::config::Settings;
use crate::enforcer::Enforcer;
use crate::templates;

/// Run init command - create configuration file and bootstrap the store.
pub fn run_init(force: bool, template: Option<String>) -> anyhow::Result<()> {
    if let Some(name) = template.as_deref() {
        if templates::find(name).is_none() {
            bail!("Unknown template '{name}'. Run 'deskbucket templates' to list them.");
        }
    }

    let root = std::env::current_dir().context("Cannot determine current directory")?;
    let config_path = Settings::init_config_file(&root, force)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut settings =
        Settings::load_from(&config_path).map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    if template.is_some() {
        settings.bootstrap.template = template;
        settings
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to save configuration: {e}"))?;
    }
    settings.workspace_root = Some(root);

    println!(
        "{} configuration file at: {}",
        style("Created").green().bold(),
        config_path.display()
    );

    let store = open_store(&settings)?;
    let mut enforcer = Enforcer::load(store)?;
    match enforcer.bootstrap(settings.bootstrap.template.as_deref())? {
        Some(ids) => {
            println!("Bootstrapped {} buckets:", ids.len());
            for id in ids {
                if let Some(bucket) = enforcer.buckets().get(id) {
                    println!("  {} {}", style(id).dim(), bucket.name);
                }
            }
        }
        None => println!(
            "Bucket store already initialized ({} buckets)",
            enforcer.buckets().len()
        ),
    }
    println!("Edit this file to choose watch directories and timings.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Run templates command - list built-in templates.
pub fn run_templates() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Template", "Description", "Buckets"]);

    for template in templates::builtin() {
        let buckets = template
            .buckets
            .iter()
            .map(|b| b.name)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![template.name, template.description, buckets.as_str()]);
    }

    println!("{table}");
}
