//! Live sync: keeps each watched directory's membership and visibility
//! projection up to date.
//!
//! # Architecture
//!
//! ```text
//! notify (per directory, non-recursive)
//!         |
//!         v
//!    Debouncer (keyed by directory, trailing edge)
//!         |
//!         v
//!   SyncController::reload
//!     list -> resolve -> project -> diff -> VisibilitySink
//! ```
//!
//! The engine owns all of these and drives them from its command loop.

mod controller;
mod debouncer;
mod directory;
mod error;
mod listing;

pub use controller::{DirectoryStatus, ReloadOutcome, SyncController, SyncPhase};
pub use debouncer::Debouncer;
pub use directory::{DirectoryWatcher, affects_listing};
pub use error::WatchError;
pub use listing::list_directory;
