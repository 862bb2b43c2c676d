//! Ownership commands: extension claims, file overrides and name patterns.

use console::style;

use super::{Session, describe_outcome};
use crate::config::Settings;
use crate::engine::MutationOutcome;

/// A single ownership mutation requested on the command line.
pub enum RuleChange {
    Claim(Vec<String>),
    Release(Vec<String>),
    Include(String),
    Exclude(String),
    Clear(String),
    AddPattern(String),
    RemovePattern(String),
}

pub async fn run(settings: &Settings, bucket: &str, change: RuleChange) -> anyhow::Result<()> {
    let session = Session::oneshot(settings)?;
    let result = apply(&session, bucket, change).await;
    session.close().await?;

    let outcome = result?;
    println!("{}", describe_outcome(&outcome));
    Ok(())
}

async fn apply(
    session: &Session,
    reference: &str,
    change: RuleChange,
) -> anyhow::Result<MutationOutcome> {
    let handle = session.handle();
    let id = session.bucket(reference).await?;

    let outcome = match change {
        RuleChange::Claim(extensions) => {
            let mut total = MutationOutcome::default();
            for ext in &extensions {
                merge(&mut total, handle.claim_extension(id, ext).await?);
            }
            total
        }
        RuleChange::Release(extensions) => {
            let mut total = MutationOutcome::default();
            for ext in &extensions {
                merge(&mut total, handle.release_extension(id, ext).await?);
            }
            total
        }
        RuleChange::Include(name) => handle.force_include(id, &name).await?,
        RuleChange::Exclude(name) => handle.force_exclude(id, &name).await?,
        RuleChange::Clear(name) => handle.clear_override(id, &name).await?,
        RuleChange::AddPattern(pattern) => {
            let outcome = handle.add_pattern(id, &pattern).await?;
            println!("{} pattern on {id}", style("Added").green().bold());
            outcome
        }
        RuleChange::RemovePattern(pattern) => {
            let outcome = handle.remove_pattern(id, &pattern).await?;
            println!("{} pattern on {id}", style("Removed").green().bold());
            outcome
        }
    };
    Ok(outcome)
}

fn merge(total: &mut MutationOutcome, next: MutationOutcome) {
    total.changed_config.extend(next.changed_config);
    total.membership_changed.extend(next.membership_changed);
}
