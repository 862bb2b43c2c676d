//! deskbucket command-line entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use console::style;

use deskbucket::Settings;
use deskbucket::cli::commands::{self, rules::RuleChange};
use deskbucket::cli::{Cli, Commands};
use deskbucket::logging;

/// Settings from `--config`, or the layered workspace configuration.
fn load_settings(cli: &Cli) -> Settings {
    match &cli.config {
        Some(path) => {
            let mut settings = Settings::load_from(path).unwrap_or_else(|e| {
                eprintln!("Configuration error: {e}");
                Settings::default()
            });
            // <root>/.deskbucket/settings.toml
            if settings.workspace_root.is_none() {
                settings.workspace_root = path
                    .parent()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf);
            }
            settings
        }
        None => {
            let needs_config = !matches!(
                cli.command,
                Commands::Init { .. } | Commands::Templates | Commands::Config
            );
            if needs_config {
                if let Err(warning) = Settings::check_init() {
                    eprintln!("Warning: {warning}");
                    eprintln!("Using default configuration for now.");
                }
            }
            Settings::load().unwrap_or_else(|e| {
                eprintln!("Configuration error: {e}");
                Settings::default()
            })
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force, template } => commands::init::run_init(force, template),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Templates => {
            commands::init::run_templates();
            Ok(())
        }
        Commands::Apply { template } => commands::buckets::run_apply(&settings, &template).await,
        Commands::Buckets { action } => commands::buckets::run(&settings, action).await,
        Commands::Claim { bucket, extensions } => {
            commands::rules::run(&settings, &bucket, RuleChange::Claim(extensions)).await
        }
        Commands::Release { bucket, extensions } => {
            commands::rules::run(&settings, &bucket, RuleChange::Release(extensions)).await
        }
        Commands::Include { bucket, name } => {
            commands::rules::run(&settings, &bucket, RuleChange::Include(name)).await
        }
        Commands::Exclude { bucket, name } => {
            commands::rules::run(&settings, &bucket, RuleChange::Exclude(name)).await
        }
        Commands::Clear { bucket, name } => {
            commands::rules::run(&settings, &bucket, RuleChange::Clear(name)).await
        }
        Commands::Pattern {
            bucket,
            pattern,
            remove,
        } => {
            let change = if remove {
                RuleChange::RemovePattern(pattern)
            } else {
                RuleChange::AddPattern(pattern)
            };
            commands::rules::run(&settings, &bucket, change).await
        }
        Commands::Classify { dir, json } => commands::classify::run(&settings, dir, json),
        Commands::Status { json } => commands::watch::run_status(&settings, json).await,
        Commands::Watch { dirs, json } => commands::watch::run_watch(&settings, dirs, json).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli);

    if cli.info {
        settings.logging.default = "info".to_string();
    }
    logging::init_with_config(&settings.logging);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
