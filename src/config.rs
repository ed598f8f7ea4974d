use fitquest_core::{DEFAULT_MAX_SLOTS, DEFAULT_SETTLE_DELAY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn default_of(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Backend base URL (e.g., "http://localhost:3000")
    pub server_url: ConfigValue<String>,
    /// API key sent as a bearer token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound on glasses drawn in the hydration row
    pub max_glasses: ConfigValue<u32>,
    /// How long a glass stays filling/emptying before settling
    pub glass_delay_ms: ConfigValue<u64>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: ConfigValue<u64>,
    /// Ring the terminal bell on fills, goals and failures
    pub sound: ConfigValue<bool>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    api_key: Option<String>,
    max_glasses: Option<u32>,
    glass_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    sound: Option<bool>,
}

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self {
            server_url: ConfigValue::default_of(DEFAULT_SERVER_URL.to_string()),
            api_key: None,
            max_glasses: ConfigValue::default_of(DEFAULT_MAX_SLOTS),
            glass_delay_ms: ConfigValue::default_of(DEFAULT_SETTLE_DELAY.as_millis() as u64),
            request_timeout_secs: ConfigValue::default_of(DEFAULT_REQUEST_TIMEOUT_SECS),
            sound: ConfigValue::default_of(false),
            config_file: None,
        };

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config.config_file = Some(path);
            config.apply_file(file_config);
        }

        // Apply environment variable overrides
        config.apply_env()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.server_url {
            self.server_url = ConfigValue::new(url, ConfigSource::File);
        }
        if let Some(key) = file.api_key {
            self.api_key = Some(key);
        }
        if let Some(max) = file.max_glasses {
            self.max_glasses = ConfigValue::new(max, ConfigSource::File);
        }
        if let Some(delay) = file.glass_delay_ms {
            self.glass_delay_ms = ConfigValue::new(delay, ConfigSource::File);
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = ConfigValue::new(timeout, ConfigSource::File);
        }
        if let Some(sound) = file.sound {
            self.sound = ConfigValue::new(sound, ConfigSource::File);
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("FITQUEST_SERVER_URL") {
            self.server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("FITQUEST_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(max) = env_parse("FITQUEST_MAX_GLASSES")? {
            self.max_glasses = ConfigValue::new(max, ConfigSource::Environment);
        }
        if let Some(delay) = env_parse("FITQUEST_GLASS_DELAY_MS")? {
            self.glass_delay_ms = ConfigValue::new(delay, ConfigSource::Environment);
        }
        if let Some(timeout) = env_parse("FITQUEST_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = ConfigValue::new(timeout, ConfigSource::Environment);
        }
        if let Some(sound) = env_parse("FITQUEST_SOUND")? {
            self.sound = ConfigValue::new(sound, ConfigSource::Environment);
        }
        Ok(())
    }

    pub fn glass_delay(&self) -> Duration {
        Duration::from_millis(self.glass_delay_ms.value)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// First characters of the API key, for display.
    pub fn api_key_hint(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|key| format!("{}...", key.chars().take(8).collect::<String>()))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitquest/
    /// - macOS: ~/Library/Application Support/fitquest/
    /// - Windows: %APPDATA%/fitquest/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitquest")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv(name, raw)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value '{}' for environment variable {}", value, name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
