//! Watch and Status commands.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use console::style;

use super::Session;
use crate::config::Settings;
use crate::notifications::{BucketEvent, forward_events};
use crate::types::BucketId;
use crate::visibility::{JsonLinesSink, VisibilityDiff, VisibilitySink};
use crate::watcher::{DirectoryStatus, SyncPhase};

/// Prints diffs for a human watching the terminal.
struct ConsoleSink;

#[async_trait]
impl VisibilitySink for ConsoleSink {
    async fn apply(&self, diff: &VisibilityDiff) {
        println!("{}", style(diff.dir.display()).cyan().bold());
        for name in &diff.hide {
            println!("  {} {name}", style("hide").yellow());
        }
        for name in &diff.show {
            println!("  {} {name}", style("show").green());
        }
    }
}

fn ids(buckets: &[BucketId]) -> String {
    buckets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_event(event: &BucketEvent) -> Option<String> {
    match event {
        BucketEvent::MembershipChanged { buckets } if !buckets.is_empty() => {
            Some(format!("membership changed: {}", ids(buckets)))
        }
        BucketEvent::BucketsChanged { buckets } => Some(format!("buckets changed: {}", ids(buckets))),
        BucketEvent::DirectoryDegraded { dir, reason } => {
            Some(format!("{} unavailable: {reason}", dir.display()))
        }
        BucketEvent::DirectoryRecovered { dir } => Some(format!("{} recovered", dir.display())),
        _ => None,
    }
}

/// Run until Ctrl-C, applying visibility diffs to stdout.
pub async fn run_watch(settings: &Settings, dirs: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    if !dirs.is_empty() {
        settings.sync.watch_dirs = dirs;
    }

    let sink: Arc<dyn VisibilitySink> = if json {
        Arc::new(JsonLinesSink::stdout())
    } else {
        Arc::new(ConsoleSink)
    };
    let mut session = Session::start(&settings, sink, true)?;

    let forwarder = session.take_events().map(|events| {
        tokio::spawn(forward_events(events, move |event| {
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!("[watch] failed to serialize event: {e}"),
                }
            } else if let Some(line) = describe_event(&event) {
                eprintln!("{} {line}", style("event").dim());
            }
        }))
    });

    if !json {
        for dir in settings.sync.resolved_watch_dirs() {
            eprintln!("{} {}", style("Watching").green().bold(), dir.display());
        }
        eprintln!("Press Ctrl-C to stop");
    }

    tokio::signal::ctrl_c().await?;
    crate::log_event!("watch", "interrupted");

    session.close().await?;
    if let Some(forwarder) = forwarder {
        forwarder.abort();
    }
    Ok(())
}

/// Reload every configured directory once and print its state.
pub async fn run_status(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let session = Session::oneshot(settings)?;
    let result = session.handle().status().await;
    session.close().await?;
    let statuses = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }
    println!("{}", status_table(&statuses));
    Ok(())
}

fn status_table(statuses: &[DirectoryStatus]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Directory", "Phase", "Files", "Hidden", "Note"]);

    for status in statuses {
        let phase = match status.phase {
            SyncPhase::Degraded => Cell::new(status.phase).fg(Color::Red),
            _ => Cell::new(status.phase),
        };
        table.add_row(vec![
            Cell::new(status.dir.display()),
            phase,
            Cell::new(status.files),
            Cell::new(status.hidden),
            Cell::new(status.degraded_reason.as_deref().unwrap_or("")),
        ]);
    }
    table
}
