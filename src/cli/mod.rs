//! Command-line interface for deskbucket.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{BucketAction, Cli, Commands};
