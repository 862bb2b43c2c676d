//! Bucket management commands (buckets list/show/create/..., apply).

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use console::style;

use super::{Session, describe_outcome};
use crate::bucket::Bucket;
use crate::cli::args::BucketAction;
use crate::config::Settings;
use crate::enforcer::NewBucket;
use crate::types::Extension;

pub async fn run(settings: &Settings, action: BucketAction) -> anyhow::Result<()> {
    let session = Session::oneshot(settings)?;
    let result = dispatch(&session, action).await;
    session.close().await?;
    result
}

async fn dispatch(session: &Session, action: BucketAction) -> anyhow::Result<()> {
    let handle = session.handle();
    match action {
        BucketAction::List { json } => list(session, json).await,
        BucketAction::Show { bucket } => show(session, &bucket).await,
        BucketAction::Create {
            name,
            ext,
            priority,
            catch_all,
        } => {
            let extensions = ext
                .iter()
                .map(|raw| Extension::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let mut new = NewBucket::new(name).with_extensions(extensions);
            if let Some(priority) = priority {
                new = new.with_priority(priority);
            }
            if catch_all {
                new = new.catch_all();
            }
            let (id, outcome) = handle.create_bucket(new).await?;
            println!("{} bucket {id}", style("Created").green().bold());
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
        BucketAction::Delete { bucket } => {
            let id = session.bucket(&bucket).await?;
            let outcome = handle.delete_bucket(id).await?;
            println!("{} bucket {id}", style("Deleted").green().bold());
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
        BucketAction::Rename { bucket, name } => {
            let id = session.bucket(&bucket).await?;
            let outcome = handle.rename(id, &name).await?;
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
        BucketAction::Visible { bucket, visible } => {
            let id = session.bucket(&bucket).await?;
            let outcome = handle.set_visible(id, visible).await?;
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
        BucketAction::Priority { bucket, priority } => {
            let id = session.bucket(&bucket).await?;
            let outcome = handle.set_priority(id, priority).await?;
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
    }
}

/// Apply a built-in template through the engine.
pub async fn run_apply(settings: &Settings, template: &str) -> anyhow::Result<()> {
    let session = Session::oneshot(settings)?;
    let result = session.handle().apply_template(template).await;
    session.close().await?;

    let (ids, outcome) = result?;
    println!(
        "{} template '{template}' ({} buckets)",
        style("Applied").green().bold(),
        ids.len()
    );
    println!("{}", describe_outcome(&outcome));
    Ok(())
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(" ")
}

fn rules_summary(bucket: &Bucket) -> String {
    if bucket.catch_all {
        return "everything unclaimed".to_string();
    }
    let mut parts = Vec::new();
    if !bucket.extensions.is_empty() {
        parts.push(join(bucket.extensions.iter().map(Extension::as_str)));
    }
    for pattern in &bucket.patterns {
        parts.push(format!("/{}/", pattern.as_str()));
    }
    parts.join(" ")
}

async fn list(session: &Session, json: bool) -> anyhow::Result<()> {
    let buckets = session.handle().buckets().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&buckets)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Name", "Priority", "Visible", "Rules", "Members"]);

    for bucket in &buckets {
        let members = session.handle().membership(bucket.id).await?;
        table.add_row(vec![
            Cell::new(bucket.id),
            Cell::new(&bucket.name),
            Cell::new(bucket.priority),
            Cell::new(if bucket.visible { "yes" } else { "no" }),
            Cell::new(rules_summary(bucket)),
            Cell::new(members.len()),
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn show(session: &Session, reference: &str) -> anyhow::Result<()> {
    let id = session.bucket(reference).await?;
    let buckets = session.handle().buckets().await?;
    let Some(bucket) = buckets.into_iter().find(|b| b.id == id) else {
        anyhow::bail!("Bucket {id} disappeared");
    };
    let members = session.handle().membership(id).await?;

    println!("{} {}", style(&bucket.name).cyan().bold(), style(id).dim());
    if bucket.catch_all {
        println!("  catch-all");
    }
    println!("  priority:   {}", bucket.priority);
    println!("  visible:    {}", bucket.visible);
    println!("  rules:      {}", rules_summary(&bucket));
    println!("  include:    {}", join(bucket.overrides.included()));
    println!("  exclude:    {}", join(bucket.overrides.excluded()));
    println!("  members ({}):", members.len());
    for name in &members {
        println!("    {name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::NamePattern;
    use crate::types::BucketId;

    #[test]
    fn test_rules_summary() {
        let mut bucket = Bucket::new(BucketId::first(), "Shots");
        bucket.extensions.insert(Extension::parse("png").unwrap());
        bucket.patterns.push(NamePattern::new("^screenshot").unwrap());
        assert_eq!(rules_summary(&bucket), ".png /^screenshot/");

        let others = Bucket::new_catch_all(BucketId::first().next().unwrap(), "Others");
        assert_eq!(rules_summary(&others), "everything unclaimed");
    }
}
