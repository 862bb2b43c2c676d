//! Extension claims and the global exclusivity invariant.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::bucket::BucketSet;
use crate::types::{BucketId, Extension};

/// The set of extensions one bucket claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionSet(BTreeSet<Extension>);

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the extension was not already claimed.
    pub fn insert(&mut self, ext: Extension) -> bool {
        self.0.insert(ext)
    }

    /// Returns true if the extension was claimed.
    pub fn remove(&mut self, ext: &Extension) -> bool {
        self.0.remove(ext)
    }

    pub fn contains(&self, ext: &Extension) -> bool {
        self.0.contains(ext)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether a file with this (possibly missing) extension matches.
    pub fn matches(&self, ext: Option<&Extension>) -> bool {
        ext.is_some_and(|e| self.0.contains(e))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Extension> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Cross-bucket view over extension claims.
pub struct ExtensionRegistry<'a> {
    buckets: &'a BucketSet,
}

impl<'a> ExtensionRegistry<'a> {
    pub fn new(buckets: &'a BucketSet) -> Self {
        Self { buckets }
    }

    /// Non-catch-all buckets currently claiming `ext`, in id order.
    pub fn owners_of(&self, ext: &Extension) -> Vec<BucketId> {
        self.buckets
            .ordinary()
            .filter(|b| b.extensions.contains(ext))
            .map(|b| b.id)
            .collect()
    }

    /// The owner of `ext`, if any. Under the invariant there is at most one.
    pub fn owner_of(&self, ext: &Extension) -> Option<BucketId> {
        self.owners_of(ext).into_iter().next()
    }

    /// Union of every non-catch-all bucket's claimed extensions.
    pub fn claimed_union(&self) -> BTreeSet<&'a Extension> {
        self.buckets
            .ordinary()
            .flat_map(|b| b.extensions.iter())
            .collect()
    }

    /// Extensions claimed by more than one non-catch-all bucket.
    ///
    /// Empty at every quiescent state reached through the enforcer; a
    /// non-empty result means the store was edited by hand.
    pub fn conflicts(&self) -> BTreeMap<Extension, Vec<BucketId>> {
        let mut owners: BTreeMap<Extension, Vec<BucketId>> = BTreeMap::new();
        for bucket in self.buckets.ordinary() {
            for ext in bucket.extensions.iter() {
                owners.entry(ext.clone()).or_default().push(bucket.id);
            }
        }
        owners.retain(|_, ids| ids.len() > 1);
        owners
    }
}
