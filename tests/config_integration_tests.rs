//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Defaults when no settings file exists
//! - Partial YAML files merged over defaults
//! - Environment overrides on top of the file
//! - Integration with StateManager

use camino::Utf8PathBuf;
use config::Environment;
use costsheet::config::ENV_PREFIX;
use costsheet::services::{ExportOptions, ImportOptions};
use costsheet::{ConfigManager, StateManager, UserConfig};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn env(vars: &[(&str, &str)]) -> Environment {
    let source: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Environment::with_prefix(ENV_PREFIX).source(Some(source))
}

#[test]
fn test_create_config_manager_creates_directory() {
    let (_temp_dir, base) = create_test_config_dir();
    let config_dir = base.join("CostSheet Data");

    let manager = ConfigManager::new(&config_dir).unwrap();

    assert!(config_dir.exists());
    assert_eq!(manager.config_dir(), &config_dir);
}

#[test]
fn test_defaults_without_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let config = manager.load_with_environment(env(&[])).unwrap();

    assert_eq!(config.rates.exchange_rate, 36.0);
    assert_eq!(config.rates.shipping_rate, 50000.0);
    assert_eq!(config.import.header_scan_limit, 20);
    assert_eq!(config.columns.price, "Price(RMB)");
    assert!(config.export.output_dir.is_none());
}

#[test]
fn test_partial_file_merges_with_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.user_config_path(),
        "rates:\n  exchange_rate: 38.2\ncolumns:\n  price: \"Unit Price\"\nexport:\n  output_dir: /srv/exports\n",
    )
    .unwrap();

    let config = manager.load_with_environment(env(&[])).unwrap();

    assert_eq!(config.rates.exchange_rate, 38.2);
    assert_eq!(config.rates.shipping_rate, 50000.0);
    assert_eq!(config.rates.currency, "DZD");
    assert_eq!(config.columns.price, "Unit Price");
    assert_eq!(config.columns.item, "ITEM");
    assert_eq!(config.export.output_dir, Some(Utf8PathBuf::from("/srv/exports")));

    let import = ImportOptions::from(&config);
    assert_eq!(import.labels.price, "Unit Price");
    let export = ExportOptions::from_config(&config);
    assert_eq!(export.output_dir, Utf8PathBuf::from("/srv/exports"));
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.user_config_path(), "rates:\n  exchange_rate: 38.2\n").unwrap();

    let config = manager
        .load_with_environment(env(&[
            ("COSTSHEET_RATES__EXCHANGE_RATE", "41.5"),
            ("COSTSHEET_LOGGING__DEBUG_MODE", "true"),
        ]))
        .unwrap();

    assert_eq!(config.rates.exchange_rate, 41.5);
    assert!(config.logging.debug_mode);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.user_config_path(), "rates: [not, a, map").unwrap();

    assert!(manager.load_with_environment(env(&[])).is_err());
}

#[test]
fn test_save_then_load_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut config = UserConfig::default();
    config.rates.shipping_rate = 42000.0;
    config.rates.currency = "EUR".to_string();
    manager.save_user_config(&config).unwrap();

    let loaded = manager.load_with_environment(env(&[])).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_seeds_state_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        manager.user_config_path(),
        "rates:\n  exchange_rate: 37.0\n  shipping_rate: 52000\n  currency: MAD\n",
    )
    .unwrap();

    let config = manager.load_with_environment(env(&[])).unwrap();
    let state = StateManager::new();
    state.load_from_user_config(&config);

    let snapshot = state.snapshot();
    assert_eq!(snapshot.rates.exchange_rate(), 37.0);
    assert_eq!(snapshot.rates.shipping_rate(), 52000.0);
    assert_eq!(snapshot.currency, "MAD");
}
