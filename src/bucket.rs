//! Bucket configuration records and the owned set of all buckets.

use std::collections::BTreeMap;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::BucketError;
use crate::registry::{ExtensionRegistry, ExtensionSet, OverrideIndex, Overrides};
use crate::types::{BucketId, FileObservation};

/// Visual fields persisted with a bucket. The core never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_color")]
    pub color_hex: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_width() -> f64 {
    250.0
}
fn default_height() -> f64 {
    300.0
}
fn default_color() -> String {
    "#CC1E293B".to_string()
}
fn default_opacity() -> f64 {
    0.85
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: default_width(),
            height: default_height(),
            color_hex: default_color(),
            opacity: default_opacity(),
        }
    }
}

/// Case-insensitive regular expression matched against a file name.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(source: &str) -> Result<Self, BucketError> {
        if source.trim().is_empty() {
            return Err(BucketError::InvalidPattern {
                pattern: source.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| BucketError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamePattern").field(&self.source).finish()
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NamePattern {}

impl TryFrom<String> for NamePattern {
    type Error = BucketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<NamePattern> for String {
    fn from(value: NamePattern) -> Self {
        value.source
    }
}

/// A rule a bucket matches files with, as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub enum RuleKind<'a> {
    ExtensionSet(&'a ExtensionSet),
    NamePattern(&'a NamePattern),
}

/// A named collection of files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub name: String,
    /// The complement bucket ("Others").
    #[serde(default)]
    pub catch_all: bool,
    /// Lower wins when name patterns of two buckets match the same file.
    #[serde(default)]
    pub priority: i32,
    /// Whether members are hidden from the desktop and shown in the bucket.
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub extensions: ExtensionSet,
    #[serde(default)]
    pub patterns: Vec<NamePattern>,
    #[serde(flatten)]
    pub overrides: Overrides,
    #[serde(default)]
    pub appearance: Appearance,
}

fn default_visible() -> bool {
    true
}

impl Bucket {
    pub fn new(id: BucketId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            catch_all: false,
            priority: 0,
            visible: true,
            extensions: ExtensionSet::new(),
            patterns: Vec::new(),
            overrides: Overrides::new(),
            appearance: Appearance::default(),
        }
    }

    pub fn new_catch_all(id: BucketId, name: impl Into<String>) -> Self {
        Self {
            catch_all: true,
            ..Self::new(id, name)
        }
    }

    /// Rule-based matchers, strongest first.
    pub fn rules(&self) -> impl Iterator<Item = RuleKind<'_>> {
        std::iter::once(RuleKind::ExtensionSet(&self.extensions))
            .chain(self.patterns.iter().map(RuleKind::NamePattern))
    }

    /// Whether any rule (ignoring overrides) would claim the file.
    pub fn rules_match(&self, file: &FileObservation) -> bool {
        self.rules().any(|rule| match rule {
            RuleKind::ExtensionSet(set) => set.matches(file.extension.as_ref()),
            RuleKind::NamePattern(pattern) => pattern.is_match(&file.name),
        })
    }
}

/// An inconsistency found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    SharedExtension { extension: String, buckets: Vec<BucketId> },
    SharedInclude { name: String, buckets: Vec<BucketId> },
    IncludeExcludeOverlap { bucket: BucketId, name: String },
    MultipleCatchAll { buckets: Vec<BucketId> },
}

/// Every bucket, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSet {
    buckets: BTreeMap<BucketId, Bucket>,
}

impl BucketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buckets(buckets: impl IntoIterator<Item = Bucket>) -> Self {
        Self {
            buckets: buckets.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    pub fn get(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(&id)
    }

    pub fn get_mut(&mut self, id: BucketId) -> Option<&mut Bucket> {
        self.buckets.get_mut(&id)
    }

    pub fn contains(&self, id: BucketId) -> bool {
        self.buckets.contains_key(&id)
    }

    pub fn insert(&mut self, bucket: Bucket) -> Option<Bucket> {
        self.buckets.insert(bucket.id, bucket)
    }

    pub fn remove(&mut self, id: BucketId) -> Option<Bucket> {
        self.buckets.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bucket> {
        self.buckets.values_mut()
    }

    /// Every bucket except the catch-all.
    pub fn ordinary(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values().filter(|b| !b.catch_all)
    }

    pub fn catch_all(&self) -> Option<&Bucket> {
        self.buckets.values().find(|b| b.catch_all)
    }

    pub fn ids(&self) -> Vec<BucketId> {
        self.buckets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// One past the highest id, or the lowest free id once the top is taken.
    pub fn next_id(&self) -> Option<BucketId> {
        let Some(last) = self.buckets.keys().next_back() else {
            return Some(BucketId::first());
        };
        if let Some(next) = last.next() {
            return Some(next);
        }
        let mut candidate = BucketId::first();
        for id in self.buckets.keys() {
            if *id != candidate {
                return Some(candidate);
            }
            candidate = candidate.next()?;
        }
        None
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Bucket> {
        self.buckets
            .values()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a user-supplied reference: a numeric id (`3` or `#3`) or a name.
    pub fn resolve_ref(&self, reference: &str) -> Result<BucketId, BucketError> {
        let trimmed = reference.trim().trim_start_matches('#');
        if let Some(id) = trimmed.parse::<u32>().ok().and_then(BucketId::new) {
            return if self.contains(id) {
                Ok(id)
            } else {
                Err(BucketError::BucketNotFound(id))
            };
        }
        self.find_by_name(reference.trim())
            .map(|b| b.id)
            .ok_or_else(|| BucketError::BucketNameNotFound(reference.to_string()))
    }

    /// Every invariant violation present in the set.
    pub fn violations(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for (ext, buckets) in ExtensionRegistry::new(self).conflicts() {
            violations.push(InvariantViolation::SharedExtension {
                extension: ext.to_string(),
                buckets,
            });
        }
        for (name, buckets) in OverrideIndex::new(self).conflicts() {
            violations.push(InvariantViolation::SharedInclude { name, buckets });
        }
        for bucket in self.iter() {
            for name in bucket.overrides.included() {
                if bucket.overrides.is_excluded(name) {
                    violations.push(InvariantViolation::IncludeExcludeOverlap {
                        bucket: bucket.id,
                        name: name.to_string(),
                    });
                }
            }
        }
        let catch_alls: Vec<BucketId> = self.iter().filter(|b| b.catch_all).map(|b| b.id).collect();
        if catch_alls.len() > 1 {
            violations.push(InvariantViolation::MultipleCatchAll { buckets: catch_alls });
        }

        violations
    }

    /// Bring a loaded set back into a consistent state.
    ///
    /// Shared claims are kept by the newest (highest id) bucket, matching the
    /// "newest claim wins" rule of the enforcer; include/exclude overlaps are
    /// resolved in favour of the exclude. Extra catch-all flags are cleared on
    /// all but the oldest catch-all before any claim is repaired, and the kept
    /// catch-all drops stored extensions. Returns the ids of buckets that changed.
    pub fn repair(&mut self) -> Vec<BucketId> {
        let mut changed = std::collections::BTreeSet::new();

        // Catch-all flags first, so demoted buckets take part in claim repair
        let mut seen_catch_all = false;
        for bucket in self.buckets.values_mut() {
            if bucket.catch_all {
                if seen_catch_all {
                    bucket.catch_all = false;
                    changed.insert(bucket.id);
                } else if !bucket.extensions.is_empty() {
                    bucket.extensions.clear();
                    changed.insert(bucket.id);
                }
                seen_catch_all = true;
            }
        }

        let shared_extensions = ExtensionRegistry::new(self).conflicts();
        for (ext, owners) in shared_extensions {
            for id in &owners[..owners.len() - 1] {
                if let Some(bucket) = self.buckets.get_mut(id) {
                    bucket.extensions.remove(&ext);
                    changed.insert(*id);
                }
            }
        }

        let shared_includes = OverrideIndex::new(self).conflicts();
        for (name, includers) in shared_includes {
            for id in &includers[..includers.len() - 1] {
                if let Some(bucket) = self.buckets.get_mut(id) {
                    bucket.overrides.remove_include(&name);
                    changed.insert(*id);
                }
            }
        }

        for bucket in self.buckets.values_mut() {
            if !bucket.overrides.normalize().is_empty() {
                changed.insert(bucket.id);
            }
        }


        changed.into_iter().collect()
    }
}
