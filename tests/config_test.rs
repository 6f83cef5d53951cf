//! Integration tests for Settings config loading.
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use reltree::application::ApplicationError;
use reltree::config::{local_config_path, Settings};
use reltree::domain::ChangePolicy;

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".reltree.toml"),
        r#"
catalog = "/srv/releases/catalog.toml"
policy = "subtract"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.catalog, PathBuf::from("/srv/releases/catalog.toml"));
    assert_eq!(settings.policy, ChangePolicy::Subtract);
}

#[test]
fn given_local_config_with_only_policy_when_load_then_keeps_default_catalog() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "policy = \"strict\"\n").unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.policy, ChangePolicy::Strict);
    assert!(settings.catalog.to_string_lossy().ends_with("catalog.toml"));
}

#[test]
fn given_tilde_catalog_in_local_config_when_load_then_expanded() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "catalog = \"~/reltree-test/catalog.toml\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    let home = std::env::var("HOME").expect("HOME should be set");
    assert!(settings.catalog.starts_with(&home));
}

#[test]
fn given_unknown_policy_in_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "policy = \"lenient\"\n").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    match err {
        ApplicationError::Config { message } => assert!(message.contains(".reltree.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_no_local_config_when_load_then_uses_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert!(settings.catalog.to_string_lossy().ends_with("catalog.toml"));
}

#[test]
fn given_settings_when_to_toml_then_reloadable_as_local_config() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        catalog: dir.path().join("catalog.toml"),
        policy: ChangePolicy::Subtract,
    };
    fs::write(local_config_path(dir.path()), settings.to_toml().unwrap()).unwrap();

    let loaded = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(loaded, settings);
}
