/*!
 * Tests for client configuration functionality
 */

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use vtranslate::app_config::{API_VERSION_ENV_VAR, ENDPOINT_ENV_VAR, SCOPE_ENV_VAR};
use vtranslate::{Backoff, Config, ConfigError, LogLevel};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.endpoint, "");
    assert_eq!(config.api_version, "2024-05-20-preview");
    assert_eq!(config.token_scope, "https://cognitiveservices.azure.com/.default");
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.polling.interval_secs, 5);
    assert_eq!(config.polling.max_wait_secs, 7200);
    assert_eq!(config.defaults.subtitle_max_char_count_per_segment, 32);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test loading a partial file: missing fields take their defaults
#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "endpoint": "https://westus.api.cognitive.microsoft.com/videotranslation",
            "polling": { "interval_secs": 2, "backoff_multiplier": 2.0, "max_interval_secs": 16 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.api_version, "2024-05-20-preview");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.polling.max_polls, 2000);

    let policy = config.poll_policy();
    assert_eq!(policy.interval, Duration::from_secs(2));
    assert_eq!(
        policy.backoff,
        Backoff::Exponential {
            multiplier: 2.0,
            max_interval: Duration::from_secs(16)
        }
    );
    assert_eq!(policy.delay_after_poll(4), Duration::from_secs(16));
    Ok(())
}

/// Test that a saved configuration loads back unchanged
#[test]
fn test_save_then_load_shouldPreserveValues() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::new("https://svc.example.com/videotranslation");
    config.defaults.speaker_count = Some(2);
    config.polling.jitter_ratio = 0.1;
    config.save(&path)?;

    let loaded = Config::load(Some(path.as_path()))?;
    assert_eq!(loaded.endpoint, config.endpoint);
    assert_eq!(loaded.defaults, config.defaults);
    assert_eq!(loaded.polling, config.polling);
    Ok(())
}

#[test]
fn test_from_file_withMalformedJson_shouldReportPath() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json")?;

    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{err}").contains("broken.json"));
    Ok(())
}

#[test]
fn test_env_overrides_withLookup_shouldReplaceNonBlankValues() {
    let vars: HashMap<&str, &str> = HashMap::from([
        (ENDPOINT_ENV_VAR, "https://override.example.com/vt"),
        (API_VERSION_ENV_VAR, "2025-01-01"),
        (SCOPE_ENV_VAR, "   "),
    ]);

    let mut config = Config::new("https://file.example.com/vt");
    config.apply_env_overrides_from(|name| vars.get(name).map(|v| v.to_string()));

    assert_eq!(config.endpoint, "https://override.example.com/vt");
    assert_eq!(config.api_version, "2025-01-01");
    assert_eq!(config.token_scope, "https://cognitiveservices.azure.com/.default");
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let valid = Config::new("https://svc.example.com/videotranslation");
    assert!(valid.validate().is_ok());

    let mut config = valid.clone();
    config.endpoint = "ftp://svc.example.com".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "endpoint", .. })));

    let mut config = valid.clone();
    config.polling.backoff_multiplier = 0.5;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field: "polling.backoff_multiplier", .. })
    ));

    let mut config = valid.clone();
    config.polling.max_interval_secs = 1;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.defaults.subtitle_max_char_count_per_segment = 0;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.polling.max_polls = 0;
    assert!(config.validate().is_err());

    let mut config = valid;
    config.api_version = " ".to_string();
    assert!(config.validate().is_err());
}
