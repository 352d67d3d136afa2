use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;
use crate::model::translation::{MAX_SUBTITLE_MAX_CHAR_COUNT, MIN_SUBTITLE_MAX_CHAR_COUNT};
use crate::model::{TranslationInput, DEFAULT_SUBTITLE_MAX_CHAR_COUNT};
use crate::polling::{Backoff, PollPolicy};

// Client configuration module
// Loads, validates and saves the settings a `VideoTranslationClient` is
// built from. Values come from a JSON file, then environment overrides.

/// Environment variable overriding `endpoint`
pub const ENDPOINT_ENV_VAR: &str = "VIDEO_TRANSLATION_ENDPOINT";

/// Environment variable overriding `api_version`
pub const API_VERSION_ENV_VAR: &str = "API_VERSION";

/// Environment variable overriding `token_scope`
pub const SCOPE_ENV_VAR: &str = "VIDEO_TRANSLATION_SCOPE";

/// Represents the client configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Service endpoint, e.g. "https://<resource>.cognitiveservices.azure.com/videotranslation"
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Value of the `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// OAuth scope requested from credential providers
    #[serde(default = "default_token_scope")]
    pub token_scope: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Status polling behaviour
    #[serde(default)]
    pub polling: PollingConfig,

    /// Values filled into translation inputs that leave them unset
    #[serde(default)]
    pub defaults: SubmissionDefaults,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Status polling configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Delay after the first poll in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Growth factor between polls (1.0 polls at a fixed interval)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Longest delay between polls in seconds
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// Random spread applied to delays, 0.0 to 1.0
    #[serde(default)]
    pub jitter_ratio: f64,

    /// Give up waiting after this many seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Give up waiting after this many status requests
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Consecutive transient failures tolerated per wait
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,

    /// Base delay after a transient failure in milliseconds, doubled on each retry
    #[serde(default = "default_transient_backoff_ms")]
    pub transient_backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_secs: default_max_interval_secs(),
            jitter_ratio: 0.0,
            max_wait_secs: default_max_wait_secs(),
            max_polls: default_max_polls(),
            max_transient_retries: default_max_transient_retries(),
            transient_backoff_ms: default_transient_backoff_ms(),
        }
    }
}

impl PollingConfig {
    /// Convert into the policy used by the polling engine
    pub fn to_policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.interval_secs);
        let backoff = if self.backoff_multiplier > 1.0 {
            Backoff::Exponential {
                multiplier: self.backoff_multiplier,
                max_interval: Duration::from_secs(self.max_interval_secs),
            }
        } else {
            Backoff::Fixed
        };

        PollPolicy::fixed(interval, Duration::from_secs(self.max_wait_secs))
            .with_backoff(backoff)
            .with_jitter(self.jitter_ratio)
            .with_max_polls(self.max_polls)
            .with_transient_retries(self.max_transient_retries, Duration::from_millis(self.transient_backoff_ms))
    }
}

/// Defaults for optional translation input fields
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubmissionDefaults {
    /// Maximum characters per subtitle segment
    #[serde(default = "default_subtitle_max_char_count")]
    pub subtitle_max_char_count_per_segment: u32,

    /// Number of speakers, when known for every video
    #[serde(default)]
    pub speaker_count: Option<u32>,

    /// Burn subtitles into output videos
    #[serde(default)]
    pub export_subtitle_in_video: Option<bool>,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            subtitle_max_char_count_per_segment: default_subtitle_max_char_count(),
            speaker_count: None,
            export_subtitle_in_video: None,
        }
    }
}

impl SubmissionDefaults {
    /// Fill unset optional fields of `input`; explicit values win
    pub fn apply(&self, mut input: TranslationInput) -> TranslationInput {
        if input.subtitle_max_char_count_per_segment.is_none() {
            input.subtitle_max_char_count_per_segment = Some(self.subtitle_max_char_count_per_segment);
        }
        if input.speaker_count.is_none() {
            input.speaker_count = self.speaker_count;
        }
        if input.export_subtitle_in_video.is_none() {
            input.export_subtitle_in_video = self.export_subtitle_in_video;
        }
        input
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_api_version() -> String {
    "2024-05-20-preview".to_string()
}

fn default_token_scope() -> String {
    "https://cognitiveservices.azure.com/.default".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    5
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_interval_secs() -> u64 {
    30
}

fn default_max_wait_secs() -> u64 {
    2 * 60 * 60 // Long videos take hours to translate
}

fn default_max_polls() -> u32 {
    2000
}

fn default_max_transient_retries() -> u32 {
    5
}

fn default_transient_backoff_ms() -> u64 {
    2000
}

fn default_subtitle_max_char_count() -> u32 {
    DEFAULT_SUBTITLE_MAX_CHAR_COUNT
}

impl Config {
    /// Configuration for `endpoint` with every other value defaulted
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Default configuration file location, `<config dir>/vtranslate/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vtranslate").join("config.json"))
    }

    /// Read a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load, apply environment overrides and validate.
    ///
    /// Without an explicit path the default location is used if it exists,
    /// otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::from_file(default)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Override values from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// Override values from `lookup`; blank values are ignored
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(endpoint) = value(ENDPOINT_ENV_VAR) {
            self.endpoint = endpoint;
        }
        if let Some(api_version) = value(API_VERSION_ENV_VAR) {
            self.api_version = api_version;
        }
        if let Some(scope) = value(SCOPE_ENV_VAR) {
            self.token_scope = scope;
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(invalid(
                "endpoint",
                format!("an endpoint is required (set it in the config file or {})", ENDPOINT_ENV_VAR),
            ));
        }
        match Url::parse(self.endpoint.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => return Err(invalid("endpoint", format!("'{}' is not an http(s) URL", self.endpoint))),
        }
        if self.api_version.trim().is_empty() {
            return Err(invalid("api_version", "must not be empty".to_string()));
        }
        if self.token_scope.trim().is_empty() {
            return Err(invalid("token_scope", "must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be positive".to_string()));
        }

        let polling = &self.polling;
        if polling.interval_secs == 0 {
            return Err(invalid("polling.interval_secs", "must be positive".to_string()));
        }
        if !polling.backoff_multiplier.is_finite() || polling.backoff_multiplier < 1.0 {
            return Err(invalid(
                "polling.backoff_multiplier",
                format!("must be at least 1.0, got {}", polling.backoff_multiplier),
            ));
        }
        if polling.max_interval_secs < polling.interval_secs {
            return Err(invalid(
                "polling.max_interval_secs",
                "must not be smaller than interval_secs".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&polling.jitter_ratio) {
            return Err(invalid(
                "polling.jitter_ratio",
                format!("must be within 0.0..=1.0, got {}", polling.jitter_ratio),
            ));
        }
        if polling.max_wait_secs == 0 {
            return Err(invalid("polling.max_wait_secs", "must be positive".to_string()));
        }
        if polling.max_polls == 0 {
            return Err(invalid("polling.max_polls", "must be positive".to_string()));
        }

        let subtitle = self.defaults.subtitle_max_char_count_per_segment;
        if !(MIN_SUBTITLE_MAX_CHAR_COUNT..=MAX_SUBTITLE_MAX_CHAR_COUNT).contains(&subtitle) {
            return Err(invalid(
                "defaults.subtitle_max_char_count_per_segment",
                format!(
                    "must be within {}..={}, got {}",
                    MIN_SUBTITLE_MAX_CHAR_COUNT, MAX_SUBTITLE_MAX_CHAR_COUNT, subtitle
                ),
            ));
        }
        if self.defaults.speaker_count == Some(0) {
            return Err(invalid("defaults.speaker_count", "must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Poll policy described by the `polling` section
    pub fn poll_policy(&self) -> PollPolicy {
        self.polling.to_policy()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: String::new(),
            api_version: default_api_version(),
            token_scope: default_token_scope(),
            request_timeout_secs: default_request_timeout_secs(),
            polling: PollingConfig::default(),
            defaults: SubmissionDefaults::default(),
            log_level: LogLevel::default(),
        }
    }
}
