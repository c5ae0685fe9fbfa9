//! Render cache configuration.
//!
//! Controls expiration defaults, device partitioning and the in-memory store
//! via the `[render]` and `[store]` sections of `viewcache.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

pub(crate) const DEFAULT_EXPIRATION_SECS: u64 = 3600;
pub(crate) const DEFAULT_BLOCK_TEMPLATE_ROOT: &str = "blocks";
pub(crate) const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Process-wide render cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiration applied when a request does not carry its own TTL.
    /// Zero disables caching for such requests.
    pub default_expiration_secs: u64,
    /// Fold the request's device variant into the cache kind.
    pub device_partitioning: bool,
    /// Template directory that block paths are joined onto.
    pub block_template_root: String,
    /// Maximum entries held by the in-memory store.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration_secs: DEFAULT_EXPIRATION_SECS,
            device_partitioning: false,
            block_template_root: DEFAULT_BLOCK_TEMPLATE_ROOT.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            default_expiration_secs: settings.render.default_expiration.as_secs(),
            device_partitioning: settings.render.device_partitioning,
            block_template_root: settings.render.block_template_root.clone(),
            max_entries: settings.store.max_entries.get(),
        }
    }
}

impl CacheConfig {
    /// Request TTL, falling back to the configured default.
    pub fn resolve_ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.unwrap_or(self.default_expiration_secs)
    }

    /// Device token to fold into the kind, if partitioning is on.
    pub fn device_variant<'a>(&self, device: Option<&'a str>) -> Option<&'a str> {
        if self.device_partitioning {
            device
        } else {
            None
        }
    }

    /// Template identifier for a block path under the configured root.
    pub fn block_template(&self, path: &str) -> String {
        let root = self.block_template_root.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if root.is_empty() {
            path.to_string()
        } else {
            format!("{root}/{path}")
        }
    }

    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_secs)
    }

    /// Returns the store limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.default_expiration_secs, 3600);
        assert!(!config.device_partitioning);
        assert_eq!(config.block_template_root, "blocks");
        assert_eq!(config.max_entries, 1024);
        assert_eq!(config.default_expiration(), Duration::from_secs(3600));
    }

    #[test]
    fn resolve_ttl_prefers_request_value() {
        let config = CacheConfig::default();
        assert_eq!(config.resolve_ttl(Some(0)), 0);
        assert_eq!(config.resolve_ttl(Some(60)), 60);
        assert_eq!(config.resolve_ttl(None), 3600);
    }

    #[test]
    fn device_variant_requires_partitioning() {
        let mut config = CacheConfig::default();
        assert_eq!(config.device_variant(Some("mobile")), None);

        config.device_partitioning = true;
        assert_eq!(config.device_variant(Some("mobile")), Some("mobile"));
        assert_eq!(config.device_variant(None), None);
    }

    #[test]
    fn block_template_joins_root() {
        let mut config = CacheConfig::default();
        assert_eq!(config.block_template("index/index"), "blocks/index/index");

        config.block_template_root = "views/blocks/".to_string();
        assert_eq!(config.block_template("/nav"), "views/blocks/nav");

        config.block_template_root = String::new();
        assert_eq!(config.block_template("nav"), "nav");
    }

    #[test]
    fn built_from_resolved_settings() {
        use crate::config::{LogFormat, LoggingSettings, RenderSettings, Settings, StoreSettings};
        use tracing::level_filters::LevelFilter;

        let settings = Settings {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            render: RenderSettings {
                default_expiration: Duration::from_secs(90),
                device_partitioning: true,
                block_template_root: "partials".to_string(),
            },
            store: StoreSettings {
                max_entries: NonZeroUsize::new(8).expect("non-zero"),
            },
        };

        let config = CacheConfig::from(&settings);
        assert_eq!(config.default_expiration_secs, 90);
        assert!(config.device_partitioning);
        assert_eq!(config.block_template_root, "partials");
        assert_eq!(config.max_entries, 8);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }
}
