//! Integration tests for environment-driven configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use birth_registry_app::{
    API_URL_ENV, AppConfig, AppError, DEFAULT_POLL_INTERVAL, POLL_INTERVAL_ENV, STATE_DIR_ENV,
    is_https_endpoint,
};

fn resolve(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    AppConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn config_tests_falls_back_to_local_development_defaults() {
    let config = resolve(&[]).expect("defaults");

    assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/");
    assert_eq!(config.state_dir, PathBuf::from(".birth-registry"));
    assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
}

#[test]
fn config_tests_blank_values_count_as_unset() {
    let config = resolve(&[(API_URL_ENV, "  "), (STATE_DIR_ENV, "")]).expect("defaults");
    assert_eq!(config, resolve(&[]).expect("defaults"));
}

#[test]
fn config_tests_overrides_apply() {
    let config = resolve(&[
        (API_URL_ENV, "https://registry.example.test/api"),
        (STATE_DIR_ENV, "/var/lib/birth-registry"),
        (POLL_INTERVAL_ENV, "30"),
    ])
    .expect("overrides");

    assert!(is_https_endpoint(config.api_base_url.as_str()));
    assert_eq!(config.api_base_url.path(), "/api");
    assert_eq!(config.state_dir, PathBuf::from("/var/lib/birth-registry"));
    assert_eq!(config.poll_interval, Duration::from_secs(30));
}

#[test]
fn config_tests_rejects_invalid_values() {
    for pairs in [
        [(API_URL_ENV, "ftp://registry.example.test")],
        [(API_URL_ENV, "registry.example.test")],
        [(POLL_INTERVAL_ENV, "0")],
        [(POLL_INTERVAL_ENV, "ten")],
    ] {
        let error = resolve(&pairs).expect_err("invalid config");
        assert!(matches!(error, AppError::Config(_)), "{error}");
    }
}

#[test]
fn config_tests_https_check_is_scheme_based() {
    assert!(is_https_endpoint("https://registry.example.test"));
    assert!(!is_https_endpoint("http://registry.example.test"));
    assert!(!is_https_endpoint("not a url"));
}
