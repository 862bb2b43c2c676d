//! The JSON bucket store as the source of truth across restarts.

use std::fs;
use std::sync::Arc;

use deskbucket::storage::BucketStore;
use deskbucket::{Bucket, BucketError, BucketId, Enforcer, Extension, JsonBucketStore, NewBucket};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<JsonBucketStore> {
    Arc::new(JsonBucketStore::open(dir.path().join("buckets")).unwrap())
}

#[test]
fn test_configuration_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    let (images, docs) = {
        let mut enforcer = Enforcer::load(open(&temp_dir)).unwrap();
        let (images, _) = enforcer
            .create_bucket(NewBucket::new("Images").with_extensions([Extension::parse("jpg").unwrap()]))
            .unwrap();
        let (docs, _) = enforcer.create_bucket(NewBucket::new("Docs")).unwrap();
        enforcer.force_include(docs, "scan.jpg").unwrap();
        enforcer.add_pattern(images, "^screenshot").unwrap();
        enforcer.set_visible(docs, false).unwrap();
        (images, docs)
    };

    let enforcer = Enforcer::load(open(&temp_dir)).unwrap();
    let buckets = enforcer.buckets();
    assert_eq!(buckets.len(), 2);

    let reloaded_images = buckets.get(images).unwrap();
    assert!(reloaded_images.extensions.contains(&Extension::parse(".jpg").unwrap()));
    assert!(reloaded_images.overrides.is_excluded("scan.jpg"));
    assert_eq!(reloaded_images.patterns[0].as_str(), "^screenshot");

    let reloaded_docs = buckets.get(docs).unwrap();
    assert!(reloaded_docs.overrides.is_included("scan.jpg"));
    assert!(!reloaded_docs.visible);
}

#[test]
fn test_deleted_bucket_record_is_removed() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);

    let mut enforcer = Enforcer::load(store.clone()).unwrap();
    let (id, _) = enforcer.create_bucket(NewBucket::new("Scratch")).unwrap();
    assert_eq!(store.load_all().unwrap().len(), 1);

    enforcer.delete_bucket(id).unwrap();
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn test_bootstrap_runs_only_on_first_start() {
    let temp_dir = TempDir::new().unwrap();

    let mut enforcer = Enforcer::load(open(&temp_dir)).unwrap();
    let ids = enforcer.bootstrap(Some("standard")).unwrap().unwrap();
    assert!(!ids.is_empty());

    // The user deletes everything; a restart must not bring the template back
    for id in ids {
        enforcer.delete_bucket(id).unwrap();
    }
    let mut enforcer = Enforcer::load(open(&temp_dir)).unwrap();
    assert!(enforcer.bootstrap(Some("standard")).unwrap().is_none());
    assert!(enforcer.buckets().is_empty());
}

#[test]
fn test_corrupt_record_fails_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);
    fs::write(store.base_path().join("bucket-1.json"), "{ not json").unwrap();

    let err = Enforcer::load(store).err().unwrap();
    assert!(matches!(err, BucketError::LoadFailure(_)));
}

#[test]
fn test_conflicting_records_are_repaired_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);
    let record = |id: u32, name: &str| {
        format!(r#"{{"id": {id}, "name": "{name}", "extensions": [".pdf"]}}"#)
    };
    fs::write(store.base_path().join("bucket-1.json"), record(1, "Old")).unwrap();
    fs::write(store.base_path().join("bucket-2.json"), record(2, "New")).unwrap();

    let enforcer = Enforcer::load(store.clone()).unwrap();
    assert!(enforcer.buckets().violations().is_empty());

    // The repaired configuration was written back
    let pdf = Extension::parse("pdf").unwrap();
    let owners: Vec<_> = store
        .load_all()
        .unwrap()
        .into_iter()
        .filter(|b| b.extensions.contains(&pdf))
        .map(|b| b.name)
        .collect();
    assert_eq!(owners, vec!["New"]);
}

#[test]
fn test_failed_write_leaves_store_matching_memory() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);

    let mut enforcer = Enforcer::load(store.clone()).unwrap();
    let (a, _) = enforcer.create_bucket(NewBucket::new("A")).unwrap();

    // The record lands on disk but the metadata update after it fails
    let meta = store.base_path().join("store.meta");
    fs::remove_file(&meta).unwrap();
    fs::create_dir(&meta).unwrap();

    let zip = Extension::parse("zip").unwrap();
    let err = enforcer.claim_extension(a, &zip).unwrap_err();
    assert!(matches!(err, BucketError::PersistenceFailure(_)));
    assert!(enforcer.buckets().get(a).unwrap().extensions.is_empty());

    let stored = store.load_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].extensions.contains(&zip));
}

#[test]
fn test_create_never_replaces_bucket_at_top_id() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(&temp_dir);
    let top = BucketId::new(u32::MAX).unwrap();
    store.save_one(&Bucket::new(top, "Top")).unwrap();

    let mut enforcer = Enforcer::load(store.clone()).unwrap();
    let (id, _) = enforcer.create_bucket(NewBucket::new("New")).unwrap();
    assert_ne!(id, top);

    let mut names: Vec<String> = store.load_all().unwrap().into_iter().map(|b| b.name).collect();
    names.sort();
    assert_eq!(names, vec!["New", "Top"]);
    assert_eq!(enforcer.buckets().get(top).unwrap().name, "Top");
}
