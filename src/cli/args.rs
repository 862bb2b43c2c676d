//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const QUICK_START: &str = "Quick Start:
  $ deskbucket init                         # Create .deskbucket with the standard buckets
  $ deskbucket buckets list                 # Buckets, rules and current members
  $ deskbucket claim Images .heic           # Move an extension to a bucket
  $ deskbucket include Documents notes.md   # Pin a single file to a bucket
  $ deskbucket watch --json                 # Follow the desktop and print visibility diffs";

/// Rule-based desktop file buckets
#[derive(Parser)]
#[command(
    name = "deskbucket",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rule-based desktop file buckets",
    long_about = "Classify desktop files into buckets by extension, name pattern and per-file overrides, and keep the visible desktop in sync.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = QUICK_START
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show info-level logs on stderr
    #[arg(long, global = true)]
    pub info: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize workspace
    #[command(about = "Set up .deskbucket directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Template to bootstrap buckets from (see `deskbucket templates`)
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .deskbucket/settings.toml")]
    Config,

    /// List the built-in bucket templates
    #[command(about = "List built-in bucket templates")]
    Templates,

    /// Merge a template's buckets into the configuration
    #[command(
        about = "Apply a bucket template",
        after_help = "Buckets that already exist under a template name are reused.\nTemplate extensions are claimed, moving them away from other buckets."
    )]
    Apply {
        /// Template name: standard, developer, designer
        template: String,
    },

    /// Create, inspect and edit buckets
    #[command(about = "Manage buckets")]
    Buckets {
        #[command(subcommand)]
        action: BucketAction,
    },

    /// Give a bucket ownership of extensions
    #[command(
        about = "Claim extensions for a bucket",
        after_help = "Examples:\n  deskbucket claim Images .heic .avif\n  deskbucket claim 3 PDF\n\nAn extension has at most one owner: claiming it removes it from every other bucket."
    )]
    Claim {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// Extensions, with or without the leading dot
        #[arg(required = true)]
        extensions: Vec<String>,
    },

    /// Remove extensions from a bucket
    #[command(about = "Release extensions from a bucket")]
    Release {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        #[arg(required = true)]
        extensions: Vec<String>,
    },

    /// Always put a file in a bucket
    #[command(about = "Force-include a file in a bucket")]
    Include {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// Exact file name
        name: String,
    },

    /// Never put a file in a bucket
    #[command(about = "Force-exclude a file from a bucket")]
    Exclude {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// Exact file name
        name: String,
    },

    /// Drop any include or exclude override for a file
    #[command(about = "Clear a file override")]
    Clear {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// Exact file name
        name: String,
    },

    /// Add or remove a case-insensitive name pattern
    #[command(
        about = "Manage bucket name patterns",
        after_help = "Examples:\n  deskbucket pattern Screenshots '^Screenshot '\n  deskbucket pattern Screenshots '^Screenshot ' --remove"
    )]
    Pattern {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// Regular expression matched against the file name
        pattern: String,
        /// Remove the pattern instead of adding it
        #[arg(long)]
        remove: bool,
    },

    /// Show how a directory would be classified without changing anything
    #[command(about = "Dry-run classification of a directory")]
    Classify {
        /// Directory to classify (defaults to the configured watch directories)
        dir: Option<PathBuf>,

        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show sync state of every watched directory
    #[command(about = "Show watched directory status")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch directories and apply visibility changes until interrupted
    #[command(
        about = "Watch directories and keep visibility in sync",
        after_help = "Examples:\n  deskbucket watch\n  deskbucket watch ~/Downloads --json\n\nWith --json every visibility diff is printed to stdout as one JSON object per line."
    )]
    Watch {
        /// Directories to watch (defaults to sync.watch_dirs, then the desktop)
        dirs: Vec<PathBuf>,

        /// Print visibility diffs and events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

/// Bucket management subcommands
#[derive(Subcommand)]
pub enum BucketAction {
    /// List buckets with their rules and member counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one bucket and its current members
    Show {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
    },

    /// Create a bucket
    Create {
        name: String,

        /// Extensions to claim, comma separated
        #[arg(short, long, value_delimiter = ',')]
        ext: Vec<String>,

        /// Pattern tie-break priority (lower wins)
        #[arg(short, long, allow_negative_numbers = true)]
        priority: Option<i32>,

        /// Create the catch-all bucket
        #[arg(long, conflicts_with = "ext")]
        catch_all: bool,
    },

    /// Delete a bucket
    Delete {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
    },

    /// Rename a bucket
    Rename {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        name: String,
    },

    /// Show or hide a bucket's members on the desktop
    Visible {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        /// true/false, yes/no, on/off
        #[arg(
            action = clap::ArgAction::Set,
            value_parser = clap::builder::BoolishValueParser::new()
        )]
        visible: bool,
    },

    /// Change a bucket's pattern tie-break priority
    Priority {
        /// Bucket id (`3`, `#3`) or name
        bucket: String,
        #[arg(allow_negative_numbers = true)]
        priority: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_claim_with_global_config() {
        let cli = Cli::try_parse_from([
            "deskbucket",
            "claim",
            "Images",
            ".heic",
            "avif",
            "--config",
            "/tmp/settings.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.toml")));
        match cli.command {
            Commands::Claim { bucket, extensions } => {
                assert_eq!(bucket, "Images");
                assert_eq!(extensions, vec![".heic", "avif"]);
            }
            _ => panic!("expected claim"),
        }
    }

    #[test]
    fn test_parse_create_with_extension_list() {
        let cli = Cli::try_parse_from([
            "deskbucket",
            "buckets",
            "create",
            "Books",
            "--ext",
            "epub,mobi",
            "--priority",
            "-1",
        ])
        .unwrap();

        match cli.command {
            Commands::Buckets {
                action:
                    BucketAction::Create {
                        name,
                        ext,
                        priority,
                        catch_all,
                    },
            } => {
                assert_eq!(name, "Books");
                assert_eq!(ext, vec!["epub", "mobi"]);
                assert_eq!(priority, Some(-1));
                assert!(!catch_all);
            }
            _ => panic!("expected buckets create"),
        }
    }

    #[test]
    fn test_parse_visible_accepts_boolish_values() {
        let cli = Cli::try_parse_from(["deskbucket", "buckets", "visible", "2", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Buckets {
                action: BucketAction::Visible { visible: false, .. }
            }
        ));
    }

    #[test]
    fn test_claim_requires_an_extension() {
        assert!(Cli::try_parse_from(["deskbucket", "claim", "Images"]).is_err());
    }
}
