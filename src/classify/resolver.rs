//! Classification resolver: file + bucket configuration -> owning bucket.
//!
//! Within one bucket the precedence is fixed: an exclude entry rejects the
//! file, an include entry claims it regardless of extension, then the
//! bucket's rules are tried. Across ordinary buckets the strongest claim wins
//! ([`Claim`] order); equal claims fall back to `(priority, id)`. With the
//! exclusivity invariant in place only name patterns can tie. Files no
//! ordinary bucket claims are offered to the catch-all projector.
//!
//! Resolution is pure: no I/O, no randomness, identical output for identical
//! input.

use std::collections::BTreeSet;

use crate::bucket::{Bucket, BucketSet, RuleKind};
use crate::registry::ExtensionRegistry;
use crate::types::{BucketId, Extension, FileObservation};

use super::catch_all::catch_all_claims;
use super::membership::Membership;

/// How strongly a bucket claims a file. Later variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Claim {
    Pattern,
    Extension,
    Included,
}

/// Evaluate one bucket against one file.
pub fn bucket_claim(bucket: &Bucket, file: &FileObservation) -> Option<Claim> {
    if bucket.overrides.is_excluded(&file.name) {
        return None;
    }
    if bucket.overrides.is_included(&file.name) {
        return Some(Claim::Included);
    }
    bucket.rules().find_map(|rule| match rule {
        RuleKind::ExtensionSet(set) => set
            .matches(file.extension.as_ref())
            .then_some(Claim::Extension),
        RuleKind::NamePattern(pattern) => pattern.is_match(&file.name).then_some(Claim::Pattern),
    })
}

/// A resolver bound to one bucket configuration.
///
/// Caches the claimed-extension union so a whole listing resolves against
/// a single snapshot.
pub struct Resolver<'a> {
    buckets: &'a BucketSet,
    claimed: BTreeSet<&'a Extension>,
}

impl<'a> Resolver<'a> {
    pub fn new(buckets: &'a BucketSet) -> Self {
        Self {
            buckets,
            claimed: ExtensionRegistry::new(buckets).claimed_union(),
        }
    }

    /// The bucket owning `file`, or `None` when it stays on the desktop.
    pub fn classify(&self, file: &FileObservation) -> Option<BucketId> {
        let best = self
            .buckets
            .ordinary()
            .filter_map(|bucket| bucket_claim(bucket, file).map(|claim| (claim, bucket)))
            .min_by(|(ca, a), (cb, b)| {
                cb.cmp(ca)
                    .then(a.priority.cmp(&b.priority))
                    .then(a.id.cmp(&b.id))
            });

        if let Some((_, bucket)) = best {
            return Some(bucket.id);
        }

        self.buckets
            .catch_all()
            .filter(|others| catch_all_claims(file, &self.claimed, others))
            .map(|others| others.id)
    }

    /// Resolve every observation into a membership map.
    pub fn resolve_all(&self, files: &[FileObservation]) -> Membership {
        files
            .iter()
            .map(|file| (file.name.clone(), self.classify(file)))
            .collect()
    }
}

/// One-shot classification of a single file.
pub fn classify(file: &FileObservation, buckets: &BucketSet) -> Option<BucketId> {
    Resolver::new(buckets).classify(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::NamePattern;

    fn id(value: u32) -> BucketId {
        BucketId::new(value).unwrap()
    }

    fn bucket(value: u32, name: &str, exts: &[&str]) -> Bucket {
        let mut bucket = Bucket::new(id(value), name);
        for e in exts {
            bucket.extensions.insert(Extension::parse(e).unwrap());
        }
        bucket
    }

    fn scenario() -> BucketSet {
        BucketSet::from_buckets([
            bucket(1, "Images", &[".jpg"]),
            bucket(2, "Docs", &[".pdf"]),
            Bucket::new_catch_all(id(3), "Others"),
        ])
    }

    #[test]
    fn test_scenario_membership() {
        let buckets = scenario();
        let files = vec![
            FileObservation::file("a.jpg"),
            FileObservation::file("b.pdf"),
            FileObservation::file("c.txt"),
        ];

        let membership = Resolver::new(&buckets).resolve_all(&files);
        assert_eq!(membership.owner_of("a.jpg"), Some(id(1)));
        assert_eq!(membership.owner_of("b.pdf"), Some(id(2)));
        assert_eq!(membership.owner_of("c.txt"), Some(id(3)));
    }

    #[test]
    fn test_exclude_beats_include_beats_extension() {
        let mut docs = bucket(1, "Docs", &[".pdf"]);
        docs.overrides.exclude("report.pdf");
        docs.overrides.include("readme.md");
        let buckets = BucketSet::from_buckets([docs]);

        assert_eq!(classify(&FileObservation::file("report.pdf"), &buckets), None);
        assert_eq!(classify(&FileObservation::file("readme.md"), &buckets), Some(id(1)));
        assert_eq!(classify(&FileObservation::file("other.pdf"), &buckets), Some(id(1)));
    }

    #[test]
    fn test_include_in_one_bucket_beats_extension_in_another() {
        let mut a = bucket(1, "A", &[]);
        a.overrides.include("x.log");
        let b = bucket(2, "B", &[".log"]);
        let buckets = BucketSet::from_buckets([a, b]);

        assert_eq!(classify(&FileObservation::file("x.log"), &buckets), Some(id(1)));
        assert_eq!(classify(&FileObservation::file("y.log"), &buckets), Some(id(2)));
    }

    #[test]
    fn test_pattern_ties_break_on_priority_then_id() {
        let mut a = bucket(1, "A", &[]);
        a.patterns.push(NamePattern::new("^scan").unwrap());
        a.priority = 5;
        let mut b = bucket(2, "B", &[]);
        b.patterns.push(NamePattern::new("scan").unwrap());
        b.priority = 1;
        let mut c = bucket(3, "C", &[]);
        c.patterns.push(NamePattern::new("scan").unwrap());
        c.priority = 1;
        let buckets = BucketSet::from_buckets([a, b, c]);

        assert_eq!(classify(&FileObservation::file("scan01.png"), &buckets), Some(id(2)));
    }

    #[test]
    fn test_extension_beats_pattern() {
        let mut a = bucket(1, "A", &[]);
        a.patterns.push(NamePattern::new("invoice").unwrap());
        let b = bucket(2, "B", &[".pdf"]);
        let buckets = BucketSet::from_buckets([a, b]);

        assert_eq!(classify(&FileObservation::file("invoice.pdf"), &buckets), Some(id(2)));
        assert_eq!(classify(&FileObservation::file("invoice.txt"), &buckets), Some(id(1)));
    }

    #[test]
    fn test_unclaimed_without_catch_all() {
        let buckets = BucketSet::from_buckets([bucket(1, "Docs", &[".pdf"])]);
        assert_eq!(classify(&FileObservation::file("song.mp3"), &buckets), None);
    }

    #[test]
    fn test_excluded_rule_match_is_not_offered_to_catch_all() {
        let mut docs = bucket(1, "Docs", &[".pdf"]);
        docs.overrides.exclude("report.pdf");
        let buckets = BucketSet::from_buckets([docs, Bucket::new_catch_all(id(2), "Others")]);

        assert_eq!(classify(&FileObservation::file("report.pdf"), &buckets), None);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let buckets = scenario();
        let files = vec![
            FileObservation::file("a.jpg"),
            FileObservation::file("z.bin"),
            FileObservation::directory("stuff"),
        ];
        let resolver = Resolver::new(&buckets);
        assert_eq!(resolver.resolve_all(&files), resolver.resolve_all(&files));
    }
}
