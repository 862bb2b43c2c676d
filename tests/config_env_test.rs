//! Environment overrides for settings. Kept to a single test so no other
//! test in this binary observes the variables.

use deskbucket::Settings;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_env_overrides_nested_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "[sync]\ndebounce_ms = 100\npoll_interval_ms = 2000\n",
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("DESKBUCKET_SYNC__DEBOUNCE_MS", "42");
        env::set_var("DESKBUCKET_BOOTSTRAP__TEMPLATE", "developer");
        env::set_var("DESKBUCKET_STORE__PATH", "/var/lib/deskbucket");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("DESKBUCKET_SYNC__DEBOUNCE_MS");
        env::remove_var("DESKBUCKET_BOOTSTRAP__TEMPLATE");
        env::remove_var("DESKBUCKET_STORE__PATH");
    }

    // Environment beats the file, the file beats defaults
    assert_eq!(settings.sync.debounce_ms, 42);
    assert_eq!(settings.sync.poll_interval_ms, 2000);
    assert_eq!(settings.bootstrap.template.as_deref(), Some("developer"));
    assert_eq!(settings.store.path, PathBuf::from("/var/lib/deskbucket"));
    assert_eq!(settings.logging.default, "warn");
}
