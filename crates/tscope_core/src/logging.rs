//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; hosts that want them on
//! stderr call [`init`] once. `TSCOPE_LOG` overrides the configured filter.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV_VAR: &str = "TSCOPE_LOG";

static INITIALIZED: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Plain,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &LoggingConfig) -> Result<()> {
    INITIALIZED
        .get_or_try_init(|| -> Result<()> {
            let filter = build_filter(config)?;
            let registry = tracing_subscriber::registry().with(filter);
            let writer = std::io::stderr;
            match config.format {
                LogFormat::Plain => registry.with(fmt::layer().with_writer(writer)).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact().with_writer(writer)).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty().with_writer(writer)).try_init(),
                LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).try_init(),
            }
            .context("failed to install tracing subscriber")?;
            tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
            Ok(())
        })
        .map(|_| ())
}

pub fn init_default() -> Result<()> {
    init(&LoggingConfig::default())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("failed to create log filter")
}
