//! Classification: deciding which bucket owns each observed file.
//!
//! ```text
//! FileObservation --+--> Resolver (ordinary buckets: exclude > include > extension > pattern)
//!                   |         |
//!                   |      unclaimed
//!                   |         v
//!                   +--> Catch-all projector (complement of every claimed extension)
//!                             |
//!                             v
//!                        Membership (name -> owner)
//! ```

pub mod catch_all;
mod membership;
pub mod resolver;

pub use catch_all::{catch_all_claims, project_others};
pub use membership::Membership;
pub use resolver::{Claim, Resolver, classify};
