//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::{DEFAULT_BLOCK_TEMPLATE_ROOT, DEFAULT_EXPIRATION_SECS, DEFAULT_MAX_ENTRIES};

pub use cli::{BlockArgs, CliArgs, Command, PageArgs, RenderArgs, SettingsOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "viewcache";
const ENV_PREFIX: &str = "VIEWCACHE";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Zero means requests without their own TTL are never cached.
    pub default_expiration: Duration,
    pub device_partitioning: bool,
    pub block_template_root: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub max_entries: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    store: RawStoreSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.default_expiration_seconds {
            self.render.default_expiration_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.device_partitioning {
            self.render.device_partitioning = Some(enabled);
        }
        if let Some(root) = overrides.block_template_root.as_ref() {
            self.render.block_template_root = Some(root.clone());
        }
        if let Some(max) = overrides.store_max_entries {
            self.store.max_entries = Some(max);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            store,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            store: build_store_settings(store)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let default_expiration = Duration::from_secs(
        render
            .default_expiration_seconds
            .unwrap_or(DEFAULT_EXPIRATION_SECS),
    );

    let block_template_root = render
        .block_template_root
        .unwrap_or_else(|| DEFAULT_BLOCK_TEMPLATE_ROOT.to_string());
    let trimmed = block_template_root.trim();
    if trimmed.contains("..") {
        return Err(LoadError::invalid(
            "render.block_template_root",
            "path must not contain `..`",
        ));
    }

    Ok(RenderSettings {
        default_expiration,
        device_partitioning: render.device_partitioning.unwrap_or(false),
        block_template_root: trimmed.to_string(),
    })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let value = store.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES as u64);
    let value: usize = value.try_into().map_err(|_| {
        LoadError::invalid(
            "store.max_entries",
            "value exceeds supported range for usize",
        )
    })?;
    let max_entries = NonZeroUsize::new(value)
        .ok_or_else(|| LoadError::invalid("store.max_entries", "must be greater than zero"))?;

    Ok(StoreSettings { max_entries })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    default_expiration_seconds: Option<u64>,
    device_partitioning: Option<bool>,
    block_template_root: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    max_entries: Option<u64>,
}

#[cfg(test)]
mod tests;
