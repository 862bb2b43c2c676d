//! Leaf registries: who claims which extension, who overrides which file.
//!
//! Both registries are plain data owned by each [`Bucket`](crate::Bucket);
//! the cross-bucket queries here read a whole [`BucketSet`](crate::BucketSet)
//! and are used by the enforcer and by the invariant checks.

pub mod extensions;
pub mod overrides;

pub use extensions::{ExtensionRegistry, ExtensionSet};
pub use overrides::{OverrideIndex, Overrides};
