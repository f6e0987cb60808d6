//! Configuration management for calorie-log
//!
//! Config stored at: ~/.config/calorie-log/config.json
//!
//! This is installation-level plumbing (where data lives, timeouts, model
//! overrides). The user's target, reset hour, provider and API key are the
//! `UserSettings` record owned by the accounting engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use calorie_types::{ConfigError, OutputFormat, Provider, Result};
use calorie_vision::AnalyzerConfig;

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "CALORIE_LOG_DATA_DIR";
/// Fallback key for OpenAI when none is stored
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
/// Fallback key for Claude when none is stored
pub const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Subdirectory of the data dir holding entries.json and settings.json
pub const STORE_DIR: &str = "store";
/// Subdirectory of the data dir shared with the display process
pub const SHARED_DIR: &str = "shared";

const APP_DIR: &str = "calorie-log";
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory override (entries, settings, shared snapshot)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Per-request timeout for provider calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between the snapshot write and the display refresh signal
    #[serde(default = "default_refresh_settle_ms")]
    pub refresh_settle_ms: u64,

    /// tracing filter used when RUST_LOG is unset
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default)]
    pub openai_model: Option<String>,

    #[serde(default)]
    pub claude_model: Option<String>,

    #[serde(default)]
    pub openai_base_url: Option<String>,

    #[serde(default)]
    pub claude_base_url: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_refresh_settle_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            request_timeout_secs: default_request_timeout_secs(),
            refresh_settle_ms: default_refresh_settle_ms(),
            log_filter: None,
            output_format: OutputFormat::default(),
            openai_model: None,
            claude_model: None,
            openai_base_url: None,
            claude_base_url: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join(APP_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Data directory: `CALORIE_LOG_DATA_DIR`, then `data_dir`, then the
    /// platform data dir
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join(APP_DIR);
        Ok(data_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
        )
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_settle_ms)
    }

    /// Log filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("calorie=info")
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::default()
            .with_timeout(self.request_timeout())
            .with_openai_model(self.openai_model.clone())
            .with_claude_model(self.claude_model.clone())
            .with_openai_url(self.openai_base_url.clone())
            .with_claude_url(self.claude_base_url.clone())
    }

    /// Set a field by its config key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |what: &str| ConfigError::InvalidValue(format!("{key}: {what}"));
        let optional = |v: &str| (!v.trim().is_empty()).then(|| v.trim().to_string());

        match key {
            "data_dir" => self.data_dir = optional(value).map(PathBuf::from),
            "request_timeout_secs" => {
                let secs: u64 = value.parse().map_err(|_| invalid("expected seconds"))?;
                self.request_timeout_secs = secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
            }
            "refresh_settle_ms" => {
                self.refresh_settle_ms =
                    value.parse().map_err(|_| invalid("expected milliseconds"))?;
            }
            "log_filter" => self.log_filter = optional(value),
            "output_format" => {
                self.output_format = match value.to_ascii_lowercase().as_str() {
                    "table" => OutputFormat::Table,
                    "json" => OutputFormat::Json,
                    _ => return Err(invalid("expected table or json").into()),
                }
            }
            "openai_model" => self.openai_model = optional(value),
            "claude_model" => self.claude_model = optional(value),
            "openai_base_url" => self.openai_base_url = optional(value),
            "claude_base_url" => self.claude_base_url = optional(value),
            _ => return Err(ConfigError::InvalidValue(format!("unknown key: {key}")).into()),
        }
        Ok(())
    }
}

/// API key from the environment for `provider`, if set
pub fn env_api_key(provider: Provider) -> Option<String> {
    let var = match provider {
        Provider::OpenAi => OPENAI_KEY_ENV,
        Provider::Claude => ANTHROPIC_KEY_ENV,
    };
    std::env::var(var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Calorie Log Configuration")?;
        writeln!(f, "=========================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Data dir:         {}",
            self.data_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Request timeout:  {}s", self.request_timeout().as_secs())?;
        writeln!(f, "Refresh settle:   {}ms", self.refresh_settle_ms)?;
        writeln!(f, "Log filter:       {}", self.log_filter())?;
        writeln!(f, "Output format:    {}", self.output_format)?;
        writeln!(
            f,
            "OpenAI model:     {}",
            self.openai_model.as_deref().unwrap_or("(default)")
        )?;
        writeln!(
            f,
            "Claude model:     {}",
            self.claude_model.as_deref().unwrap_or("(default)")
        )?;
        if let Some(ref url) = self.openai_base_url {
            writeln!(f, "OpenAI endpoint:  {url}")?;
        }
        if let Some(ref url) = self.claude_base_url {
            writeln!(f, "Claude endpoint:  {url}")?;
        }

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:      {}", path.display())?;
        }

        Ok(())
    }
}
