//! Dry-run classification of a directory.
//!
//! Reads the stored buckets and a fresh listing and prints who would own
//! each file. Nothing is written: a configuration that needs repair is
//! repaired in memory only.

use std::path::PathBuf;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use super::open_store;
use crate::bucket::BucketSet;
use crate::classify::Resolver;
use crate::config::Settings;
use crate::error::BucketError;
use crate::types::BucketId;
use crate::watcher::list_directory;

/// One row of a dry run.
#[derive(Debug, Serialize)]
pub struct Placement {
    pub dir: PathBuf,
    pub name: String,
    pub bucket: Option<BucketId>,
    pub bucket_name: Option<String>,
}

/// Classify every entry of `dirs` against `buckets`.
pub fn placements(
    buckets: &BucketSet,
    dirs: &[PathBuf],
    include_hidden: bool,
) -> Result<Vec<Placement>, BucketError> {
    let resolver = Resolver::new(buckets);
    let mut rows = Vec::new();
    for dir in dirs {
        for file in list_directory(dir, include_hidden)? {
            let bucket = resolver.classify(&file);
            rows.push(Placement {
                dir: dir.clone(),
                bucket_name: bucket.and_then(|id| buckets.get(id)).map(|b| b.name.clone()),
                bucket,
                name: file.name,
            });
        }
    }
    Ok(rows)
}

pub fn run(settings: &Settings, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let mut buckets = BucketSet::from_buckets(store.load_all().map_err(BucketError::LoadFailure)?);
    let repaired = buckets.repair();
    if !repaired.is_empty() {
        tracing::warn!(
            "[classify] stored configuration needs repair ({} buckets); showing repaired result",
            repaired.len()
        );
    }

    let dirs = match dir {
        Some(dir) => vec![dir],
        None => settings.sync.resolved_watch_dirs(),
    };
    let rows = placements(&buckets, &dirs, settings.sync.include_hidden)?;

    if json {
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["File", "Bucket", "Directory"]);

    for row in &rows {
        let bucket = match (&row.bucket, &row.bucket_name) {
            (Some(id), Some(name)) => Cell::new(format!("{name} ({id})")),
            _ => Cell::new("(desktop)").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&row.name),
            bucket,
            Cell::new(row.dir.display()),
        ]);
    }

    println!("{table}");
    Ok(())
}
