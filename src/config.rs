use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "coachd".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. "sqlite:coachd.db"
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:coachd.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    /// The companion assistant is optional; analysis degrades without it
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub domain: String,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_key: String::new(),
            domain: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    /// Flush as soon as this many entries are unsaved
    pub min_unsaved_entries: usize,

    /// Flush any unsaved entries after this long without a save
    pub max_save_interval_secs: u64,

    /// Sweep cadence for check_and_save_all_sessions
    pub sweep_interval_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_unsaved_entries: 10,
            max_save_interval_secs: 120,
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CleanupConfig {
    /// Cadence of the session/analysis eviction sweep
    pub interval_secs: u64,

    /// Age cutoff for evicting idle sessions and stale analyses
    pub max_age_hours: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_age_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `COACHD_*` environment
    /// overrides; missing values fall back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("COACHD").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl BatchConfig {
    pub fn max_save_interval(&self) -> Duration {
        Duration::from_secs(self.max_save_interval_secs)
    }
}
