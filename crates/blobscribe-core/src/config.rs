use crate::error::ConfigError;
use crate::types::DEFAULT_CHUNK_SIZE;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Recognition engine selection and credentials.
///
/// Keys not listed here are collected into [`options`](Self::options) and
/// passed through to the engine.
#[derive(Deserialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub subscription_key: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(flatten)]
    pub options: toml::Value,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            subscription_key: None,
            region: default_region(),
            language: default_language(),
            options: toml::Value::Table(Default::default()),
        }
    }
}

// Keeps the subscription key out of logs.
impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("engine", &self.engine)
            .field(
                "subscription_key",
                &self.subscription_key.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("language", &self.language)
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Push the whole blob before recognition starts.
    #[default]
    DrainFirst,
    /// Start recognition first and feed audio alongside it.
    Concurrent,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Seconds to wait for a terminal event; `0` waits forever.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    #[serde(default)]
    pub ingest_mode: IngestMode,
}

impl SessionConfig {
    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.wait_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            wait_timeout_secs: default_wait_timeout_secs(),
            ingest_mode: IngestMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TriggerConfig {
    #[serde(default = "default_trigger_path")]
    pub path: PathBuf,

    /// Accepted file extensions, case-insensitive. Empty accepts everything.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Quiet period after the last write before a blob is picked up.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub process_existing: bool,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl TriggerConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            path: default_trigger_path(),
            extensions: Vec::new(),
            settle_ms: default_settle_ms(),
            process_existing: false,
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_engine() -> String {
    "null".to_string()
}

fn default_region() -> String {
    "eastus".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_wait_timeout_secs() -> u64 {
    600
}

fn default_trigger_path() -> PathBuf {
    PathBuf::from("audio-files")
}

fn default_settle_ms() -> u64 {
    500
}

fn default_max_concurrent() -> usize {
    4
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let mut result = input.to_string();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let val = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &val);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speech.engine.trim().is_empty() {
            return Err(ConfigError::Invalid("speech.engine must not be empty".to_string()));
        }
        if self.session.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "session.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.trigger.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "trigger.max_concurrent must be greater than zero".to_string(),
            ));
        }
        if let Some(key) = &self.speech.subscription_key {
            if key.trim().is_empty() {
                tracing::warn!("speech.subscription_key is set but empty");
            }
        }
        Ok(())
    }
}
