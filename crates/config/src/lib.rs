//! Configuration loading, validation, and management for the Linksort assistant.
//!
//! Loads configuration from `~/.linksort/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.linksort/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key. Usually supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Assistant and model settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("assistant", &self.assistant)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Max tokens per model call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Model calls allowed per user message
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Upper bound on one model call, streaming included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Events buffered for a slow live consumer
    #[serde(default = "default_live_buffer")]
    pub live_buffer: usize,

    /// How long a publish may wait before the live consumer is dropped
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Replaces the built-in system prompt. The folder tree is still appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_rounds() -> u32 {
    25
}
fn default_request_timeout_secs() -> u64 {
    300
}
fn default_live_buffer() -> usize {
    64
}
fn default_publish_timeout_ms() -> u64 {
    500
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_rounds: default_max_rounds(),
            request_timeout_secs: default_request_timeout_secs(),
            live_buffer: default_live_buffer(),
            publish_timeout_ms: default_publish_timeout_ms(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "linksort_agent=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.linksort/config.toml).
    ///
    /// Environment overrides:
    /// - `LINKSORT_API_KEY`, then `ANTHROPIC_API_KEY` (only if no key is configured)
    /// - `LINKSORT_MODEL`
    /// - `LINKSORT_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("LINKSORT_API_KEY").or_else(|| non_empty("ANTHROPIC_API_KEY"));
        }
        if let Some(model) = non_empty("LINKSORT_MODEL") {
            self.assistant.model = model;
        }
        if let Some(url) = non_empty("LINKSORT_BASE_URL") {
            self.assistant.base_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".linksort")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.assistant;
        if !(0.0..=1.0).contains(&a.temperature) {
            return Err(ConfigError::ValidationError(
                "assistant.temperature must be between 0.0 and 1.0".into(),
            ));
        }
        if a.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_tokens must be > 0".into(),
            ));
        }
        if a.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_rounds must be > 0".into(),
            ));
        }
        if a.live_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.live_buffer must be > 0".into(),
            ));
        }
        if a.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "assistant.model must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
