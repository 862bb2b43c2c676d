use std::collections::{BTreeMap, BTreeSet};

use crate::types::BucketId;

/// Derived mapping from file name to owning bucket for one directory.
///
/// Membership is a view: it is rebuilt from the bucket configuration and a
/// fresh listing on every pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    owners: BTreeMap<String, Option<BucketId>>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_of(&self, name: &str) -> Option<BucketId> {
        self.owners.get(name).copied().flatten()
    }

    pub fn contains_file(&self, name: &str) -> bool {
        self.owners.contains_key(name)
    }

    /// Members of `bucket`, ordered by name.
    pub fn members_of(&self, bucket: BucketId) -> BTreeSet<String> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == Some(bucket))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Files no bucket owns.
    pub fn unclaimed(&self) -> BTreeSet<String> {
        self.owners
            .iter()
            .filter(|(_, owner)| owner.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<BucketId>)> {
        self.owners.iter().map(|(name, owner)| (name.as_str(), *owner))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Buckets whose member set differs between `self` and `previous`.
    pub fn changed_buckets(&self, previous: &Membership) -> BTreeSet<BucketId> {
        let mut changed = BTreeSet::new();
        let names: BTreeSet<&String> = self.owners.keys().chain(previous.owners.keys()).collect();
        for name in names {
            let now = self.owners.get(name).copied().flatten();
            let before = previous.owners.get(name).copied().flatten();
            if now != before {
                changed.extend(now);
                changed.extend(before);
            }
        }
        changed
    }
}

impl FromIterator<(String, Option<BucketId>)> for Membership {
    fn from_iter<I: IntoIterator<Item = (String, Option<BucketId>)>>(iter: I) -> Self {
        Self {
            owners: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> BucketId {
        BucketId::new(value).unwrap()
    }

    #[test]
    fn test_members_and_unclaimed() {
        let membership: Membership = [
            ("a.jpg".to_string(), Some(id(1))),
            ("b.jpg".to_string(), Some(id(1))),
            ("c.txt".to_string(), None),
        ]
        .into_iter()
        .collect();

        assert_eq!(membership.members_of(id(1)).len(), 2);
        assert_eq!(membership.unclaimed().len(), 1);
        assert!(membership.contains_file("c.txt"));
        assert_eq!(membership.owner_of("c.txt"), None);
    }

    #[test]
    fn test_changed_buckets() {
        let before: Membership = [
            ("a.jpg".to_string(), Some(id(1))),
            ("x.log".to_string(), Some(id(2))),
        ]
        .into_iter()
        .collect();
        let after: Membership = [
            ("a.jpg".to_string(), Some(id(1))),
            ("x.log".to_string(), Some(id(3))),
            ("new.txt".to_string(), None),
        ]
        .into_iter()
        .collect();

        let changed = after.changed_buckets(&before);
        assert_eq!(changed, BTreeSet::from([id(2), id(3)]));
    }
}
