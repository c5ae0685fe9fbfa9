use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use serde_json::Value;

use crate::application::render::DataMap;

/// Command-line arguments for the viewcache binary.
#[derive(Debug, Parser)]
#[command(name = "viewcache", version, about = "Render cached pages and blocks")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VIEWCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a page template under `pages/`.
    Page(PageArgs),
    /// Render a block through its registered producer.
    Block(BlockArgs),
}

impl Command {
    pub fn overrides(&self) -> &SettingsOverrides {
        match self {
            Command::Page(args) => &args.render.overrides,
            Command::Block(args) => &args.render.overrides,
        }
    }
}

/// Arguments shared by every render command.
#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: SettingsOverrides,

    /// Cache tag; repeat for several.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Expiration in seconds; 0 renders without caching.
    #[arg(long, value_name = "SECONDS")]
    pub ttl: Option<u64>,

    /// Device variant of the simulated request.
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// User data of the simulated request, as a JSON object.
    #[arg(long, value_name = "JSON", value_parser = parse_object, default_value = "{}")]
    pub user: DataMap,

    /// Render this many times against the same store.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}

#[derive(Debug, Args, Clone)]
pub struct PageArgs {
    /// Page path, rendered from `pages/<PATH>`.
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Template data as a JSON object.
    #[arg(long, value_name = "JSON", value_parser = parse_object, default_value = "{}")]
    pub data: DataMap,

    #[command(flatten)]
    pub render: RenderArgs,
}

#[derive(Debug, Args, Clone)]
pub struct BlockArgs {
    /// Block path, rendered from `<block_template_root>/<PATH>`.
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Explicit producer name instead of the one derived from the path.
    #[arg(long = "class-name", value_name = "NAME")]
    pub class_name: Option<String>,

    /// Query mapping as a JSON object; each entry becomes a cache tag.
    #[arg(long, value_name = "JSON", value_parser = parse_value)]
    pub query: Option<Value>,

    /// Values merged over the producer's data, as a JSON object.
    #[arg(long, value_name = "JSON", value_parser = parse_object, default_value = "{}")]
    pub locals: DataMap,

    /// Links served by the built-in recent block, as a JSON array of `{label, href}`.
    #[arg(long, value_name = "JSON", default_value = "[]")]
    pub links: String,

    #[command(flatten)]
    pub render: RenderArgs,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the default expiration applied when no TTL is given.
    #[arg(long = "render-default-expiration-seconds", value_name = "SECONDS")]
    pub default_expiration_seconds: Option<u64>,

    /// Toggle device-partitioned caching.
    #[arg(
        long = "render-device-partitioning",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub device_partitioning: Option<bool>,

    /// Override the block template root.
    #[arg(long = "render-block-template-root", value_name = "PATH")]
    pub block_template_root: Option<String>,

    /// Override the in-memory store capacity.
    #[arg(long = "store-max-entries", value_name = "COUNT")]
    pub store_max_entries: Option<u64>,
}

fn parse_value(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid JSON: {err}"))
}

fn parse_object(raw: &str) -> Result<DataMap, String> {
    match parse_value(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("expected a JSON object".to_string()),
    }
}
