//! Configuration for deskbucket.
//!
//! Layered settings:
//! - Default values
//! - `.deskbucket/settings.toml` (searched from the current directory up)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DESKBUCKET_` and use double
//! underscores to separate nested levels:
//! - `DESKBUCKET_SYNC__DEBOUNCE_MS=50` sets `sync.debounce_ms`
//! - `DESKBUCKET_STORE__PATH=/tmp/buckets` sets `store.path`
//! - `DESKBUCKET_BOOTSTRAP__TEMPLATE=developer` sets `bootstrap.template`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".deskbucket";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DESKBUCKET_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding `.deskbucket` (detected when not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory of bucket records, relative to the workspace root
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SyncConfig {
    /// Directories to organize. Empty means the user's desktop.
    #[serde(default)]
    pub watch_dirs: Vec<PathBuf>,

    /// Quiet period before a burst of changes triggers a reload
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Fallback re-listing of degraded or unwatched directories
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Classify dot-files and hidden/system entries too
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BootstrapConfig {
    /// Template applied when the store has never been initialized.
    /// An empty string disables it.
    #[serde(default = "default_template")]
    pub template: Option<String>,
}

/// Logging levels, globally and per module.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `engine = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_store_path() -> PathBuf {
    PathBuf::from(".deskbucket/buckets")
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_poll_interval_ms() -> u64 {
    5000
}
fn default_template() -> Option<String> {
    Some("standard".to_string())
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            bootstrap: BootstrapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            include_hidden: false,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    /// Configured directories with `~` expanded, or the desktop when none
    /// are configured.
    pub fn resolved_watch_dirs(&self) -> Vec<PathBuf> {
        if self.watch_dirs.is_empty() {
            return dirs::desktop_dir().into_iter().collect();
        }
        self.watch_dirs.iter().map(|dir| expand_home(dir)).collect()
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// `DESKBUCKET_A__B` -> `a.b`
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into())
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(env_provider())
    }

    /// Find `.deskbucket/settings.toml` from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// The nearest ancestor of the current directory holding `.deskbucket`
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check that a settings file exists and parses
    pub fn check_init() -> Result<PathBuf, String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        if !config_path.exists() {
            return Err("No configuration file found. Run 'deskbucket init' first.".to_string());
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Cannot read configuration file: {e}"))?;
        toml::from_str::<Settings>(&content).map_err(|e| {
            format!("Configuration file is corrupted: {e}\nRun 'deskbucket init --force' to regenerate.")
        })?;

        Ok(config_path)
    }

    /// Record directory, resolved against the workspace root when relative
    pub fn store_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.store.path.is_relative() => root.join(&self.store.path),
            _ => self.store.path.clone(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create `.deskbucket/settings.toml` under `root`
    pub fn init_config_file(root: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
