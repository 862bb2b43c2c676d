//! Per-bucket include/exclude overrides.
//!
//! Overrides are keyed by file name (not path) and take precedence over every
//! rule. A bucket's include and exclude sets are kept disjoint by the
//! mutators below.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::bucket::BucketSet;
use crate::types::BucketId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    included: BTreeSet<String>,
    #[serde(default)]
    excluded: BTreeSet<String>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `name`, dropping any exclude entry. Returns true on change.
    pub fn include(&mut self, name: &str) -> bool {
        let unexcluded = self.excluded.remove(name);
        let included = self.included.insert(name.to_string());
        unexcluded || included
    }

    /// Exclude `name`, dropping any include entry. Returns true on change.
    pub fn exclude(&mut self, name: &str) -> bool {
        let unincluded = self.included.remove(name);
        let excluded = self.excluded.insert(name.to_string());
        unincluded || excluded
    }

    /// Drop the include entry only. Returns true on change.
    pub fn remove_include(&mut self, name: &str) -> bool {
        self.included.remove(name)
    }

    /// Drop both entries for `name`. Returns true on change.
    pub fn clear(&mut self, name: &str) -> bool {
        let a = self.included.remove(name);
        let b = self.excluded.remove(name);
        a || b
    }

    pub fn is_included(&self, name: &str) -> bool {
        self.included.contains(name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.included.iter().map(String::as_str)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Resolve entries present in both sets in favour of the exclude.
    ///
    /// Only needed for records that did not go through the mutators (a
    /// hand-edited store). Returns the names that were dropped from the
    /// include set.
    pub fn normalize(&mut self) -> Vec<String> {
        let overlap: Vec<String> = self
            .included
            .intersection(&self.excluded)
            .cloned()
            .collect();
        for name in &overlap {
            self.included.remove(name);
        }
        overlap
    }
}

/// Cross-bucket view over include entries.
pub struct OverrideIndex<'a> {
    buckets: &'a BucketSet,
}

impl<'a> OverrideIndex<'a> {
    pub fn new(buckets: &'a BucketSet) -> Self {
        Self { buckets }
    }

    /// Buckets whose include set contains `name`, in id order.
    pub fn includers_of(&self, name: &str) -> Vec<BucketId> {
        self.buckets
            .iter()
            .filter(|b| b.overrides.is_included(name))
            .map(|b| b.id)
            .collect()
    }

    /// File names included by more than one bucket.
    pub fn conflicts(&self) -> BTreeMap<String, Vec<BucketId>> {
        let mut includers: BTreeMap<String, Vec<BucketId>> = BTreeMap::new();
        for bucket in self.buckets.iter() {
            for name in bucket.overrides.included() {
                includers.entry(name.to_string()).or_default().push(bucket.id);
            }
        }
        includers.retain(|_, ids| ids.len() > 1);
        includers
    }
}
