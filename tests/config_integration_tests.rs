//! Integration tests for ConfigManager and the settings file
//!
//! These tests verify:
//! - Missing settings file yields defaults
//! - Settings survive a save/load round trip under the ConfigBridge_Settings key
//! - Partial files are completed with defaults
//! - Malformed YAML is reported, not silently replaced

use camino::Utf8PathBuf;
use configbridge::config::{SETTINGS_FILE_NAME, apply_overrides, settings_environment};
use configbridge::{BridgeSettings, ConfigManager, UserConfig};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager_creates_directory() {
    let (_temp_dir, base) = create_test_config_dir();
    let config_dir = base.join("ConfigBridge Data");

    let manager = ConfigManager::new(&config_dir).unwrap();

    assert!(config_dir.is_dir());
    assert_eq!(manager.config_dir(), &config_dir);
    assert_eq!(manager.settings_path(), config_dir.join(SETTINGS_FILE_NAME).as_path());
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_user_config().unwrap().settings;

    assert_eq!(settings.game_app_id, "570");
    assert_eq!(settings.config_subdirs.len(), 3);
    assert_eq!(settings.avatar_timeout_secs, 5);
    assert_eq!(settings.connectivity_timeout_secs, 3);
    assert!(!settings.debug_mode);
}

#[test]
fn test_save_and_reload() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut config = UserConfig::default();
    config.settings.steam_userdata_paths = vec![Utf8PathBuf::from("/games/steam/userdata")];
    config.settings.debug_mode = true;
    manager.save_user_config(&config).unwrap();

    let text = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(text.contains("ConfigBridge_Settings:"));

    assert_eq!(manager.load_user_config().unwrap(), config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "ConfigBridge_Settings:\n  avatar_dir: cache/avatars\n",
    )
    .unwrap();

    let settings = manager.load_user_config().unwrap().settings;
    assert_eq!(settings.avatar_dir, Utf8PathBuf::from("cache/avatars"));
    assert_eq!(settings.save_file, BridgeSettings::default().save_file);
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "ConfigBridge_Settings: [unclosed").unwrap();

    assert!(manager.load_user_config().is_err());
}

#[test]
fn test_file_then_environment_layering() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "ConfigBridge_Settings:\n  avatar_timeout_secs: 8\n  connectivity_timeout_secs: 9\n",
    )
    .unwrap();

    let mut vars = config::Map::new();
    vars.insert(
        "CONFIGBRIDGE_SETTINGS__CONNECTIVITY_TIMEOUT_SECS".to_string(),
        "1".to_string(),
    );

    let file_settings = manager.load_user_config().unwrap().settings;
    let settings = apply_overrides(&file_settings, settings_environment().source(Some(vars))).unwrap();

    assert_eq!(settings.avatar_timeout_secs, 8);
    assert_eq!(settings.connectivity_timeout_secs, 1);
}

#[test]
fn test_write_file_settings_keeps_overrides_out() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "ConfigBridge_Settings:\n  avatar_timeout_secs: 8\n",
    )
    .unwrap();

    // effective settings carry an override the file must not pick up
    let mut vars = config::Map::new();
    vars.insert(
        "CONFIGBRIDGE_SETTINGS__DEBUG_MODE".to_string(),
        "true".to_string(),
    );
    let file_settings = manager.load_user_config().unwrap().settings;
    let effective = apply_overrides(&file_settings, settings_environment().source(Some(vars))).unwrap();
    assert!(effective.debug_mode);

    let written = manager.write_file_settings().unwrap();

    assert_eq!(written.settings.avatar_timeout_secs, 8);
    assert!(!written.settings.debug_mode);
    let text = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(text.contains("config_subdirs"));
    assert_eq!(manager.load_user_config().unwrap(), written);
}
