//! Configuration loading and store path resolution
//!
//! Uses serial_test: tests that manipulate PAXREG_DATABASE are marked
//! #[serial] so they never observe each other's environment.

use paxreg_common::config::{
    config_file_path, default_database_path, resolve_database_path, TomlConfig,
    DATABASE_ENV_VAR,
};
use paxreg_common::{Error, SourceKind};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(DATABASE_ENV_VAR, "/tmp/paxreg-env.db");
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/paxreg-toml.db")),
        ..Default::default()
    };

    let path = resolve_database_path(Some(Path::new("/tmp/paxreg-cli.db")), &config);
    assert_eq!(path, PathBuf::from("/tmp/paxreg-cli.db"));

    env::remove_var(DATABASE_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(DATABASE_ENV_VAR, "/tmp/paxreg-env.db");
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/tmp/paxreg-toml.db")),
        ..Default::default()
    };

    let path = resolve_database_path(None, &config);
    assert_eq!(path, PathBuf::from("/tmp/paxreg-env.db"));

    env::remove_var(DATABASE_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_then_compiled_default() {
    env::remove_var(DATABASE_ENV_VAR);

    let config = TomlConfig {
        database_path: Some(PathBuf::from("DataBase.db")),
        ..Default::default()
    };
    assert_eq!(resolve_database_path(None, &config), PathBuf::from("DataBase.db"));

    let path = resolve_database_path(None, &TomlConfig::default());
    assert_eq!(path, default_database_path());
    assert!(path.ends_with("registry.db"));
}

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
database_path = "passengers.db"

[logging]
level = "debug"

[consolidation]
source_order = ["skyteam", "pointz"]

[merge]
vacuum = false
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.database_path, Some(PathBuf::from("passengers.db")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.consolidation.source_order,
        vec![SourceKind::Skyteam, SourceKind::Pointz]
    );
    assert!(!config.merge.vacuum);
}

#[test]
fn test_load_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = TomlConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_config_file_path_reports_explicit_file() {
    let path = Path::new("/tmp/paxreg-explicit.toml");
    assert_eq!(config_file_path(Some(path)), Some(path.to_path_buf()));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_config_file_path_finds_platform_file() {
    let dir = tempfile::tempdir().unwrap();
    let saved = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    assert_eq!(config_file_path(None), None);

    let file = dir.path().join("paxreg").join("config.toml");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "[merge]\nvacuum = false\n").unwrap();
    assert_eq!(config_file_path(None), Some(file));
    assert!(!TomlConfig::load(None).unwrap().merge.vacuum);

    match saved {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_unknown_source_is_error() {
    let result = TomlConfig::from_toml_str(
        r#"
[consolidation]
source_order = ["boarding", "yaml"]
"#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
