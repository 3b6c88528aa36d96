//! Runtime configuration.
//!
//! Defaults cover the common case; a TOML file and `TSCOPE_*` environment
//! variables can override individual fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScopeError, ScopeResult};
use crate::logging::{LogFormat, LoggingConfig};

pub const ENV_PREFIX: &str = "TSCOPE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Upper bound on concurrent per-entry stats during a listing.
    pub stat_fan_out: usize,
    /// Timeout for the external identity lookup, in milliseconds.
    pub identity_timeout_ms: u64,
    pub history_limit: usize,
    pub stream_buffer_chars: usize,
    pub logging: LoggingConfig,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            stat_fan_out: 16,
            identity_timeout_ms: 1000,
            history_limit: 100,
            stream_buffer_chars: 1000,
            logging: LoggingConfig::default(),
        }
    }
}

impl ScopeConfig {
    pub fn from_toml_str(text: &str) -> ScopeResult<Self> {
        let config: ScopeConfig =
            toml::from_str(text).map_err(|e| ScopeError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ScopeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ScopeError::from_io("read_config", path, e))?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> ScopeResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `get` as the variable source.
    pub fn apply_env_from<F>(&mut self, get: F) -> ScopeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| get(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("STAT_FAN_OUT") {
            self.stat_fan_out = parse_number("STAT_FAN_OUT", &v)?;
        }
        if let Some(v) = var("IDENTITY_TIMEOUT_MS") {
            self.identity_timeout_ms = parse_number("IDENTITY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("HISTORY_LIMIT") {
            self.history_limit = parse_number("HISTORY_LIMIT", &v)?;
        }
        if let Some(v) = var("STREAM_BUFFER_CHARS") {
            self.stream_buffer_chars = parse_number("STREAM_BUFFER_CHARS", &v)?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("LOG_FORMAT") {
            self.logging.format = match v.to_ascii_lowercase().as_str() {
                "plain" => LogFormat::Plain,
                "compact" => LogFormat::Compact,
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => return Err(ScopeError::config(format!("{ENV_PREFIX}LOG_FORMAT: unknown format '{other}'"))),
            };
        }
        self.validate()
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.stat_fan_out == 0 {
            return Err(ScopeError::config("stat_fan_out must be at least 1"));
        }
        if self.identity_timeout_ms == 0 {
            return Err(ScopeError::config("identity_timeout_ms must be positive"));
        }
        if self.history_limit == 0 {
            return Err(ScopeError::config("history_limit must be at least 1"));
        }
        if self.stream_buffer_chars == 0 {
            return Err(ScopeError::config("stream_buffer_chars must be at least 1"));
        }
        Ok(())
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ScopeResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ScopeError::config(format!("{ENV_PREFIX}{name}: expected a number, got '{value}'")))
}
