//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bot API endpoint, token and destination chat
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Retry, backoff and timeout settings for outbound sends
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Shared HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Which built-in predicate and formatter to use
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load and validate configuration, failing fast on any invalid value.
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path).map_err(|e| {
            AppError::config(format!("failed to load {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.telegram.validate()?;
        self.resilience.validate()?;
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(AppError::validation("http.connect_timeout_secs must be > 0"));
        }
        self.policy.validate()?;
        Ok(())
    }
}

/// Static Telegram destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base URL, HTTPS only
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Opaque bot token
    #[serde(default)]
    pub bot_token: String,

    /// Destination chat, negative for group chats
    #[serde(default)]
    pub chat_id: i64,
}

impl TelegramConfig {
    pub fn new(base_url: impl Into<String>, bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            base_url: base_url.into(),
            bot_token: bot_token.into(),
            chat_id,
        }
    }

    /// Validate the destination.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::validation("telegram.base_url is empty"));
        }
        let url = Url::parse(&self.base_url).map_err(|e| {
            AppError::validation(format!(
                "telegram.base_url '{}' is not an absolute URL: {e}",
                self.base_url
            ))
        })?;
        if url.scheme() != "https" {
            return Err(AppError::validation(format!(
                "telegram.base_url must use https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(AppError::validation("telegram.base_url has no host"));
        }
        if self.bot_token.trim().is_empty() {
            return Err(AppError::validation("telegram.bot_token is empty"));
        }
        if self.chat_id == 0 {
            return Err(AppError::validation("telegram.chat_id must be non-zero"));
        }
        Ok(())
    }

    /// Token with everything but the bot id hidden, for display.
    pub fn redacted_token(&self) -> String {
        match self.bot_token.split_once(':') {
            Some((id, _)) => format!("{id}:***"),
            None => "***".to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            bot_token: String::new(),
            chat_id: 0,
        }
    }
}

/// Retry/backoff/timeout policy applied to each outbound send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Total attempts including the first one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each retry
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Random spread applied to each delay, as a fraction (0.0 - 1.0)
    #[serde(default = "defaults::jitter")]
    pub jitter: f64,

    /// Time budget for one attempt
    #[serde(default = "defaults::attempt_timeout")]
    pub attempt_timeout_secs: u64,
}

impl ResilienceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AppError::validation("resilience.max_attempts must be > 0"));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(AppError::validation(
                "resilience.attempt_timeout_secs must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(AppError::validation(
                "resilience.jitter must be between 0.0 and 1.0",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(AppError::validation(
                "resilience.max_delay_ms must be >= base_delay_ms",
            ));
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
            jitter: defaults::jitter(),
            attempt_timeout_secs: defaults::attempt_timeout(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for Bot API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// TCP connect timeout in seconds
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            connect_timeout_secs: defaults::connect_timeout(),
        }
    }
}

/// Names of the built-in predicate and formatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// `always`, `on_change` or `not_healthy`
    #[serde(default = "defaults::predicate")]
    pub predicate: String,

    /// `status` or `detailed`
    #[serde(default = "defaults::formatter")]
    pub formatter: String,
}

impl PolicyConfig {
    pub const PREDICATES: [&'static str; 3] = ["always", "on_change", "not_healthy"];
    pub const FORMATTERS: [&'static str; 2] = ["status", "detailed"];

    pub fn validate(&self) -> Result<()> {
        if !Self::PREDICATES.contains(&self.predicate.as_str()) {
            return Err(AppError::validation(format!(
                "policy.predicate '{}' is not one of {:?}",
                self.predicate,
                Self::PREDICATES
            )));
        }
        if !Self::FORMATTERS.contains(&self.formatter.as_str()) {
            return Err(AppError::validation(format!(
                "policy.formatter '{}' is not one of {:?}",
                self.formatter,
                Self::FORMATTERS
            )));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            predicate: defaults::predicate(),
            formatter: defaults::formatter(),
        }
    }
}

mod defaults {
    // Telegram defaults
    pub fn base_url() -> String {
        "https://api.telegram.org".into()
    }

    // Resilience defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn base_delay() -> u64 {
        2000
    }
    pub fn max_delay() -> u64 {
        30_000
    }
    pub fn jitter() -> f64 {
        0.25
    }
    pub fn attempt_timeout() -> u64 {
        30
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        concat!("telegram-health-publisher/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn connect_timeout() -> u64 {
        10
    }

    // Policy defaults
    pub fn predicate() -> String {
        "always".into()
    }
    pub fn formatter() -> String {
        "status".into()
    }
}
