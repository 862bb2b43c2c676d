//! Ownership enforcer: every mutation of the bucket configuration.
//!
//! The enforcer owns the [`BucketSet`] and the store handle. Each operation
//! runs as a transaction:
//!
//! 1. snapshot the set
//! 2. apply the change, migrating conflicting claims out of other buckets so
//!    no extension and no include entry is held by two buckets
//! 3. save every changed bucket (and delete removed ones) through the store
//!
//! If step 2 fails the snapshot is restored and nothing is written. If step 3
//! fails the snapshot is restored, the records written so far are put back
//! from the snapshot (best effort) and the caller gets
//! [`BucketError::PersistenceFailure`].
//!
//! The enforcer is not synchronized. Callers serialize access through the
//! engine's command queue.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::bucket::{Bucket, BucketSet, NamePattern};
use crate::error::{BucketError, BucketResult};
use crate::storage::{BucketStore, StorageError};
use crate::templates::{self, Template};
use crate::types::{BucketId, Extension, FileObservation};
use crate::{debug_event, log_event};

/// Buckets touched by one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    changed: BTreeSet<BucketId>,
    removed: BTreeSet<BucketId>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Buckets whose record was created or modified.
    pub fn changed(&self) -> &BTreeSet<BucketId> {
        &self.changed
    }

    /// Buckets that were deleted.
    pub fn removed(&self) -> &BTreeSet<BucketId> {
        &self.removed
    }

    /// Every bucket id touched, changed or removed.
    pub fn all(&self) -> BTreeSet<BucketId> {
        self.changed.union(&self.removed).copied().collect()
    }

    fn touch(&mut self, id: BucketId) {
        self.changed.insert(id);
    }

    fn remove(&mut self, id: BucketId) {
        self.changed.remove(&id);
        self.removed.insert(id);
    }
}

/// Parameters for [`Enforcer::create_bucket`].
#[derive(Debug, Clone, Default)]
pub struct NewBucket {
    pub name: String,
    pub extensions: Vec<Extension>,
    pub catch_all: bool,
    pub priority: i32,
}

impl NewBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn catch_all(mut self) -> Self {
        self.catch_all = true;
        self
    }
}

pub struct Enforcer {
    buckets: BucketSet,
    store: Arc<dyn BucketStore>,
}

impl Enforcer {
    pub fn new(buckets: BucketSet, store: Arc<dyn BucketStore>) -> Self {
        Self { buckets, store }
    }

    /// Load every record from the store and repair hand-edited conflicts.
    pub fn load(store: Arc<dyn BucketStore>) -> BucketResult<Self> {
        let records = store.load_all().map_err(BucketError::LoadFailure)?;
        let mut buckets = BucketSet::from_buckets(records);

        for violation in buckets.violations() {
            tracing::warn!("[enforcer] inconsistent store record: {violation:?}");
        }
        for id in buckets.repair() {
            if let Some(bucket) = buckets.get(id) {
                if let Err(e) = store.save_one(bucket) {
                    tracing::warn!("[enforcer] failed to save repaired bucket {id}: {e}");
                }
            }
        }

        log_event!("enforcer", "loaded", "{} buckets", buckets.len());
        Ok(Self { buckets, store })
    }

    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    /// Apply `template` when the store has never been initialized.
    ///
    /// Returns the bucket ids the template produced, or `None` when the store
    /// was already set up.
    pub fn bootstrap(&mut self, template: Option<&str>) -> BucketResult<Option<Vec<BucketId>>> {
        let initialized = self
            .store
            .is_initialized()
            .map_err(BucketError::LoadFailure)?;
        if initialized || !self.buckets.is_empty() {
            return Ok(None);
        }
        let Some(name) = template else {
            return Ok(None);
        };

        let (ids, _) = self.apply_template(name)?;
        self.store
            .mark_initialized()
            .map_err(BucketError::PersistenceFailure)?;
        log_event!("enforcer", "bootstrapped", "template '{name}'");
        Ok(Some(ids))
    }

    /// Give `ext` to `id`, evicting it from every other bucket.
    ///
    /// Claiming on the catch-all only evicts: the catch-all owns whatever no
    /// one else claims.
    pub fn claim_extension(&mut self, id: BucketId, ext: &Extension) -> BucketResult<Changes> {
        self.transact(|buckets, changes| claim(buckets, id, ext, changes))
            .map(|((), changes)| changes)
    }

    pub fn release_extension(&mut self, id: BucketId, ext: &Extension) -> BucketResult<Changes> {
        self.transact(|buckets, changes| {
            let bucket = require_mut(buckets, id)?;
            if bucket.extensions.remove(ext) {
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    /// Make `id` the only bucket including `name`.
    ///
    /// Other buckets lose their include entry, and those whose rules would
    /// still match the file get an exclude entry so it cannot drift back.
    pub fn force_include(&mut self, id: BucketId, name: &str) -> BucketResult<Changes> {
        let name = validate_file_name(name)?;
        self.transact(|buckets, changes| {
            let target = require_mut(buckets, id)?;
            if target.overrides.include(name) {
                changes.touch(id);
            }

            let file = FileObservation::file(name);
            for bucket in buckets.iter_mut().filter(|b| b.id != id) {
                if bucket.overrides.remove_include(name) {
                    changes.touch(bucket.id);
                }
                if !bucket.catch_all && bucket.rules_match(&file) && bucket.overrides.exclude(name)
                {
                    debug_event!("enforcer", "re-excluded", "{name} from {}", bucket.id);
                    changes.touch(bucket.id);
                }
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    /// Exclude `name` from `id` only. Other buckets are untouched.
    pub fn force_exclude(&mut self, id: BucketId, name: &str) -> BucketResult<Changes> {
        let name = validate_file_name(name)?;
        self.transact(|buckets, changes| {
            if require_mut(buckets, id)?.overrides.exclude(name) {
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    /// Drop both the include and the exclude entry for `name` in `id`.
    pub fn clear_override(&mut self, id: BucketId, name: &str) -> BucketResult<Changes> {
        let name = validate_file_name(name)?;
        self.transact(|buckets, changes| {
            if require_mut(buckets, id)?.overrides.clear(name) {
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn create_bucket(&mut self, new: NewBucket) -> BucketResult<(BucketId, Changes)> {
        self.transact(|buckets, changes| create(buckets, new, changes))
    }

    /// Delete `id` together with every override entry it held.
    pub fn delete_bucket(&mut self, id: BucketId) -> BucketResult<Changes> {
        self.transact(|buckets, changes| {
            buckets.remove(id).ok_or(BucketError::BucketNotFound(id))?;
            changes.remove(id);
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn rename(&mut self, id: BucketId, name: &str) -> BucketResult<Changes> {
        let name = validate_bucket_name(name)?;
        self.transact(|buckets, changes| {
            require_mut(buckets, id)?;
            if buckets
                .iter()
                .any(|b| b.id != id && b.name.eq_ignore_ascii_case(name))
            {
                return Err(BucketError::DuplicateName(name.to_string()));
            }
            let bucket = require_mut(buckets, id)?;
            if bucket.name != name {
                bucket.name = name.to_string();
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn set_visible(&mut self, id: BucketId, visible: bool) -> BucketResult<Changes> {
        self.transact(|buckets, changes| {
            let bucket = require_mut(buckets, id)?;
            if bucket.visible != visible {
                bucket.visible = visible;
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn set_priority(&mut self, id: BucketId, priority: i32) -> BucketResult<Changes> {
        self.transact(|buckets, changes| {
            let bucket = require_mut(buckets, id)?;
            if bucket.priority != priority {
                bucket.priority = priority;
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn add_pattern(&mut self, id: BucketId, pattern: &str) -> BucketResult<Changes> {
        let pattern = NamePattern::new(pattern)?;
        self.transact(|buckets, changes| {
            let bucket = require_mut(buckets, id)?;
            if !bucket.patterns.contains(&pattern) {
                bucket.patterns.push(pattern);
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    pub fn remove_pattern(&mut self, id: BucketId, pattern: &str) -> BucketResult<Changes> {
        self.transact(|buckets, changes| {
            let bucket = require_mut(buckets, id)?;
            let before = bucket.patterns.len();
            bucket.patterns.retain(|p| p.as_str() != pattern);
            if bucket.patterns.len() != before {
                changes.touch(id);
            }
            Ok(())
        })
        .map(|((), changes)| changes)
    }

    /// Create the buckets of a built-in template.
    ///
    /// Buckets whose name already exists are reused and receive the
    /// template's extension claims; an existing catch-all is kept.
    pub fn apply_template(&mut self, name: &str) -> BucketResult<(Vec<BucketId>, Changes)> {
        let template =
            templates::find(name).ok_or_else(|| BucketError::UnknownTemplate(name.to_string()))?;
        self.transact(|buckets, changes| apply(buckets, template, changes))
    }

    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut BucketSet, &mut Changes) -> BucketResult<T>,
    ) -> BucketResult<(T, Changes)> {
        let snapshot = self.buckets.clone();
        let mut changes = Changes::default();

        let value = match op(&mut self.buckets, &mut changes) {
            Ok(value) => value,
            Err(e) => {
                self.buckets = snapshot;
                return Err(e);
            }
        };

        if changes.is_empty() {
            return Ok((value, changes));
        }

        if let Err(e) = self.persist(&snapshot, &changes) {
            tracing::warn!("[enforcer] store write failed, rolling back: {e}");
            self.buckets = snapshot;
            return Err(BucketError::PersistenceFailure(e));
        }

        debug_event!("enforcer", "committed", "{:?}", changes.all());
        Ok((value, changes))
    }

    fn persist(&self, snapshot: &BucketSet, changes: &Changes) -> Result<(), StorageError> {
        let mut written = Vec::new();

        let saves = changes
            .changed
            .iter()
            .filter_map(|id| self.buckets.get(*id))
            .map(|bucket| (bucket.id, self.store.save_one(bucket)));
        let deletes = changes
            .removed
            .iter()
            .map(|id| (*id, self.store.delete_one(*id)));

        for (id, result) in saves.chain(deletes) {
            // A failed write may still have reached the record
            written.push(id);
            if let Err(e) = result {
                self.restore(snapshot, &written);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Put the snapshot version of each touched record back.
    fn restore(&self, snapshot: &BucketSet, written: &[BucketId]) {
        for id in written {
            let result = match snapshot.get(*id) {
                Some(bucket) => self.store.save_one(bucket),
                None => self.store.delete_one(*id),
            };
            if let Err(e) = result {
                tracing::warn!("[enforcer] failed to restore bucket {id}: {e}");
            }
        }
    }
}

fn require_mut(buckets: &mut BucketSet, id: BucketId) -> BucketResult<&mut Bucket> {
    buckets.get_mut(id).ok_or(BucketError::BucketNotFound(id))
}

fn claim(
    buckets: &mut BucketSet,
    id: BucketId,
    ext: &Extension,
    changes: &mut Changes,
) -> BucketResult<()> {
    let target_is_catch_all = require_mut(buckets, id)?.catch_all;

    for bucket in buckets.iter_mut().filter(|b| b.id != id && !b.catch_all) {
        if bucket.extensions.remove(ext) {
            debug_event!("enforcer", "evicted", "{ext} from {}", bucket.id);
            changes.touch(bucket.id);
        }
    }

    if !target_is_catch_all && require_mut(buckets, id)?.extensions.insert(ext.clone()) {
        changes.touch(id);
    }
    Ok(())
}

fn create(buckets: &mut BucketSet, new: NewBucket, changes: &mut Changes) -> BucketResult<BucketId> {
    let name = validate_bucket_name(&new.name)?;
    if buckets.find_by_name(name).is_some() {
        return Err(BucketError::DuplicateName(name.to_string()));
    }
    if new.catch_all {
        if let Some(existing) = buckets.catch_all() {
            return Err(BucketError::DuplicateCatchAll(existing.id));
        }
    }

    let id = buckets.next_id().ok_or(BucketError::IdsExhausted)?;
    if buckets.contains(id) {
        return Err(BucketError::IdInUse(id));
    }
    let mut bucket = if new.catch_all {
        Bucket::new_catch_all(id, name)
    } else {
        Bucket::new(id, name)
    };
    bucket.priority = new.priority;
    buckets.insert(bucket);
    changes.touch(id);

    for ext in &new.extensions {
        claim(buckets, id, ext, changes)?;
    }
    Ok(id)
}

fn apply(
    buckets: &mut BucketSet,
    template: &Template,
    changes: &mut Changes,
) -> BucketResult<Vec<BucketId>> {
    let mut ids = Vec::with_capacity(template.buckets.len());

    for entry in template.buckets {
        let existing = if entry.catch_all {
            buckets.catch_all().map(|b| b.id)
        } else {
            buckets.find_by_name(entry.name).map(|b| b.id)
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let mut new = NewBucket::new(entry.name).with_priority(entry.priority);
                new.catch_all = entry.catch_all;
                create(buckets, new, changes)?
            }
        };

        for raw in entry.extensions {
            claim(buckets, id, &Extension::parse(raw)?, changes)?;
        }
        ids.push(id);
    }

    Ok(ids)
}

fn validate_bucket_name(name: &str) -> BucketResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BucketError::InvalidName("name is empty".to_string()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(BucketError::InvalidName(format!(
            "'{}' contains control characters",
            trimmed.escape_debug()
        )));
    }
    Ok(trimmed)
}

/// Overrides are keyed by bare file name, never by path.
fn validate_file_name(name: &str) -> BucketResult<&str> {
    if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(BucketError::InvalidFileName(name.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::storage::MemoryStore;

    fn ext(raw: &str) -> Extension {
        Extension::parse(raw).unwrap()
    }

    fn enforcer() -> (Enforcer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Enforcer::new(BucketSet::new(), store.clone()), store)
    }

    fn create(enforcer: &mut Enforcer, name: &str, exts: &[&str]) -> BucketId {
        let new = NewBucket::new(name).with_extensions(exts.iter().map(|e| ext(e)));
        enforcer.create_bucket(new).unwrap().0
    }

    #[test]
    fn test_claim_migrates_extension() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[".zip"]);
        let b = create(&mut enforcer, "B", &[]);

        let changes = enforcer.claim_extension(b, &ext(".ZIP")).unwrap();
        assert_eq!(changes.changed(), &BTreeSet::from([a, b]));

        let buckets = enforcer.buckets();
        assert!(!buckets.get(a).unwrap().extensions.contains(&ext(".zip")));
        assert!(buckets.get(b).unwrap().extensions.contains(&ext(".zip")));
        assert_eq!(classify(&FileObservation::file("backup.zip"), buckets), Some(b));
    }

    #[test]
    fn test_repeated_claim_changes_nothing() {
        let (mut enforcer, store) = enforcer();
        let a = create(&mut enforcer, "A", &[".zip"]);
        let saves = store.save_count();

        let changes = enforcer.claim_extension(a, &ext(".zip")).unwrap();
        assert!(changes.is_empty());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_claim_on_catch_all_only_evicts() {
        let (mut enforcer, _) = enforcer();
        let docs = create(&mut enforcer, "Docs", &[".txt"]);
        let (others, _) = enforcer
            .create_bucket(NewBucket::new("Others").catch_all())
            .unwrap();

        enforcer.claim_extension(others, &ext(".txt")).unwrap();

        let buckets = enforcer.buckets();
        assert!(buckets.get(docs).unwrap().extensions.is_empty());
        assert!(buckets.get(others).unwrap().extensions.is_empty());
        assert_eq!(classify(&FileObservation::file("notes.txt"), buckets), Some(others));
    }

    #[test]
    fn test_force_include_steals_and_re_excludes() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[".log"]);
        let b = create(&mut enforcer, "B", &[]);
        enforcer.force_include(a, "x.log").unwrap();

        let changes = enforcer.force_include(b, "x.log").unwrap();
        assert_eq!(changes.changed(), &BTreeSet::from([a, b]));

        let buckets = enforcer.buckets();
        assert!(!buckets.get(a).unwrap().overrides.is_included("x.log"));
        assert!(buckets.get(a).unwrap().overrides.is_excluded("x.log"));
        assert!(buckets.get(b).unwrap().overrides.is_included("x.log"));

        // Excluding from B does not hand the file back to A
        enforcer.force_exclude(b, "x.log").unwrap();
        let buckets = enforcer.buckets();
        assert_eq!(classify(&FileObservation::file("x.log"), buckets), None);

        // Until A's exclude entry is cleared
        enforcer.clear_override(a, "x.log").unwrap();
        assert_eq!(classify(&FileObservation::file("x.log"), enforcer.buckets()), Some(a));
    }

    #[test]
    fn test_force_include_re_excludes_pattern_matches() {
        let (mut enforcer, _) = enforcer();
        let scans = create(&mut enforcer, "Scans", &[]);
        enforcer.add_pattern(scans, "^scan").unwrap();
        let docs = create(&mut enforcer, "Docs", &[]);

        enforcer.force_include(docs, "scan-001.png").unwrap();
        assert!(enforcer
            .buckets()
            .get(scans)
            .unwrap()
            .overrides
            .is_excluded("scan-001.png"));
    }

    #[test]
    fn test_force_include_never_excludes_from_catch_all() {
        let (mut enforcer, _) = enforcer();
        let (others, _) = enforcer
            .create_bucket(NewBucket::new("Others").catch_all())
            .unwrap();
        let a = create(&mut enforcer, "A", &[]);

        enforcer.force_include(a, "loose.bin").unwrap();
        assert!(enforcer.buckets().get(others).unwrap().overrides.is_empty());
    }

    #[test]
    fn test_force_exclude_is_local() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[".pdf"]);
        let b = create(&mut enforcer, "B", &[]);
        enforcer.force_include(b, "report.pdf").unwrap();

        let changes = enforcer.force_exclude(a, "manual.pdf").unwrap();
        assert_eq!(changes.changed(), &BTreeSet::from([a]));
        assert!(enforcer.buckets().get(b).unwrap().overrides.is_included("report.pdf"));
        assert_eq!(classify(&FileObservation::file("manual.pdf"), enforcer.buckets()), None);
    }

    #[test]
    fn test_unknown_bucket_is_a_no_op() {
        let (mut enforcer, store) = enforcer();
        create(&mut enforcer, "A", &[".pdf"]);
        let before = enforcer.buckets().clone();
        let saves = store.save_count();
        let missing = BucketId::new(42).unwrap();

        let err = enforcer.claim_extension(missing, &ext(".pdf")).unwrap_err();
        assert!(err.is_stale_reference());
        assert!(enforcer.force_include(missing, "a.txt").is_err());
        assert!(enforcer.force_exclude(missing, "a.txt").is_err());
        assert_eq!(enforcer.buckets(), &before);
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_create_validation() {
        let (mut enforcer, _) = enforcer();
        enforcer
            .create_bucket(NewBucket::new("Others").catch_all())
            .unwrap();

        assert!(matches!(
            enforcer.create_bucket(NewBucket::new("More").catch_all()),
            Err(BucketError::DuplicateCatchAll(_))
        ));
        assert!(matches!(
            enforcer.create_bucket(NewBucket::new("   ")),
            Err(BucketError::InvalidName(_))
        ));
        assert!(matches!(
            enforcer.create_bucket(NewBucket::new("others")),
            Err(BucketError::DuplicateName(_))
        ));
        assert!(matches!(
            enforcer.force_include(BucketId::first(), "dir/file.txt"),
            Err(BucketError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_create_evicts_existing_claims() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[".png", ".jpg"]);
        let b = create(&mut enforcer, "B", &[".jpg"]);

        let buckets = enforcer.buckets();
        assert_eq!(buckets.get(a).unwrap().extensions.len(), 1);
        assert!(buckets.get(b).unwrap().extensions.contains(&ext(".jpg")));
    }

    #[test]
    fn test_delete_releases_overrides() {
        let (mut enforcer, store) = enforcer();
        let a = create(&mut enforcer, "A", &[]);
        enforcer.force_include(a, "x.log").unwrap();

        let changes = enforcer.delete_bucket(a).unwrap();
        assert_eq!(changes.removed(), &BTreeSet::from([a]));
        assert!(store.get(a).is_none());
        assert!(crate::registry::OverrideIndex::new(enforcer.buckets())
            .includers_of("x.log")
            .is_empty());
    }

    #[test]
    fn test_rename_and_visibility() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[]);
        create(&mut enforcer, "B", &[]);

        assert!(matches!(enforcer.rename(a, "b"), Err(BucketError::DuplicateName(_))));
        enforcer.rename(a, "  Archive ").unwrap();
        assert_eq!(enforcer.buckets().get(a).unwrap().name, "Archive");

        assert!(!enforcer.set_visible(a, false).unwrap().is_empty());
        assert!(enforcer.set_visible(a, false).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let (mut enforcer, _) = enforcer();
        let a = create(&mut enforcer, "A", &[]);
        assert!(matches!(
            enforcer.add_pattern(a, "(unclosed"),
            Err(BucketError::InvalidPattern { .. })
        ));
        enforcer.add_pattern(a, "^invoice").unwrap();
        assert!(enforcer.remove_pattern(a, "^invoice").unwrap().changed().contains(&a));
    }

    #[test]
    fn test_persistence_failure_rolls_back() {
        let (mut enforcer, store) = enforcer();
        let a = create(&mut enforcer, "A", &[".zip"]);
        let b = create(&mut enforcer, "B", &[]);
        let before = enforcer.buckets().clone();

        // The first of the two saves goes through, the second fails
        store.fail_once_after(1);
        let err = enforcer.claim_extension(b, &ext(".zip")).unwrap_err();
        assert!(matches!(err, BucketError::PersistenceFailure(_)));
        assert_eq!(enforcer.buckets(), &before);
        assert_eq!(store.get(a).as_ref(), before.get(a));
        assert_eq!(store.get(b).as_ref(), before.get(b));
    }

    #[test]
    fn test_apply_template_twice_reuses_buckets() {
        let (mut enforcer, _) = enforcer();
        let (first, _) = enforcer.apply_template("standard").unwrap();
        let (second, changes) = enforcer.apply_template("Standard").unwrap();

        assert_eq!(first, second);
        assert!(changes.is_empty());
        assert!(enforcer.buckets().violations().is_empty());
    }

    #[test]
    fn test_overlapping_templates_keep_exclusivity() {
        let (mut enforcer, _) = enforcer();
        enforcer.apply_template("standard").unwrap();
        enforcer.apply_template("developer").unwrap();

        let buckets = enforcer.buckets();
        assert!(buckets.violations().is_empty());
        assert_eq!(buckets.iter().filter(|b| b.catch_all).count(), 1);
        let logs = buckets.find_by_name("Logs").unwrap().id;
        assert_eq!(classify(&FileObservation::file("notes.txt"), buckets), Some(logs));
    }

    #[test]
    fn test_unknown_template() {
        let (mut enforcer, _) = enforcer();
        assert!(matches!(
            enforcer.apply_template("gamer"),
            Err(BucketError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_bootstrap_runs_once() {
        let (mut enforcer, store) = enforcer();
        assert_eq!(enforcer.bootstrap(None).unwrap(), None);

        let ids = enforcer.bootstrap(Some("designer")).unwrap().unwrap();
        assert_eq!(ids.len(), 5);
        assert!(store.is_initialized().unwrap());

        for id in ids {
            enforcer.delete_bucket(id).unwrap();
        }
        assert_eq!(enforcer.bootstrap(Some("designer")).unwrap(), None);
    }

    #[test]
    fn test_load_repairs_store() {
        let mut a = Bucket::new(BucketId::new(1).unwrap(), "A");
        a.extensions.insert(ext(".zip"));
        let mut b = Bucket::new(BucketId::new(2).unwrap(), "B");
        b.extensions.insert(ext(".zip"));
        let store = Arc::new(MemoryStore::with_buckets([a, b]));

        let enforcer = Enforcer::load(store.clone()).unwrap();
        assert!(enforcer.buckets().violations().is_empty());
        assert!(store.get(BucketId::first()).unwrap().extensions.is_empty());
    }
}
