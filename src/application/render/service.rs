use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, instrument};

use crate::cache::{CacheConfig, CacheKey, CacheStore, Kind, build_key, derive_tags};

use super::blocks::{BlockContext, BlockRegistry, block_class_name};
use super::engine::ContentProducer;
use super::types::{
    BlockDataOptions, BlockOptions, DataMap, PageOptions, RenderError, RequestContext,
    merge_locals,
};

const PAGE_TEMPLATE_ROOT: &str = "pages";
/// Metric label for keys supplied directly to `fetch_or_render`.
const CALLER_KEY_LABEL: &str = "caller";
const METRIC_CACHE_HIT: &str = "viewcache_render_cache_hit_total";
const METRIC_CACHE_MISS: &str = "viewcache_render_cache_miss_total";
const METRIC_CACHE_BYPASS: &str = "viewcache_render_cache_bypass_total";

/// Render-or-fetch facade over a cache store and a content producer.
///
/// Every operation is synchronous. Concurrent misses on one key are not
/// coordinated: both callers render and the store keeps the last write.
pub struct RenderCache {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    producer: Arc<dyn ContentProducer>,
    blocks: BlockRegistry,
}

impl RenderCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn CacheStore>,
        producer: Arc<dyn ContentProducer>,
        blocks: BlockRegistry,
    ) -> Self {
        Self {
            config,
            store,
            producer,
            blocks,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    /// Render without consulting the cache.
    pub fn render_content(&self, template: &str, data: &DataMap) -> Result<String, RenderError> {
        Ok(self.producer.render(template, data)?)
    }

    /// Serve `key` from the store, or render and store it for `ttl` seconds.
    ///
    /// A miss performs exactly one store write. Nothing is written when
    /// rendering fails. Hits and misses are counted under the `caller` kind.
    #[instrument(skip_all, fields(key = %key, template = template, ttl = ttl))]
    pub fn fetch_or_render(
        &self,
        key: &CacheKey,
        template: &str,
        data: &DataMap,
        ttl: u64,
    ) -> Result<String, RenderError> {
        self.fetch_or_render_counted(CALLER_KEY_LABEL, key, template, data, ttl)
    }

    /// Render `pages/<path>`, cached under the page kind.
    #[instrument(skip_all, fields(path = %options.path))]
    pub fn render_page(
        &self,
        ctx: &RequestContext,
        options: &PageOptions,
    ) -> Result<String, RenderError> {
        let ttl = self.config.resolve_ttl(options.ttl);
        let path = content_path(&options.path);
        let template = page_template(path);

        if ttl == 0 {
            record_bypass(Kind::Page.as_str());
            return self.render_content(&template, &options.data);
        }

        let key = self.key_for(Kind::Page, ctx, path, &options.tags);
        self.fetch_or_render_counted(Kind::Page.as_str(), &key, &template, &options.data, ttl)
    }

    /// Render a block whose data comes from its registered producer.
    ///
    /// Returns `Ok(None)` when no producer is registered under the explicit
    /// `class_name` or the name derived from the path. A cache hit returns
    /// without resolving the producer at all.
    #[instrument(skip_all, fields(path = %options.path))]
    pub fn render_block(
        &self,
        ctx: &RequestContext,
        options: &BlockOptions,
    ) -> Result<Option<String>, RenderError> {
        let ttl = self.config.resolve_ttl(options.ttl);
        let path = content_path(&options.path);
        let tags = block_tags(&options.tags, options.query.as_ref());
        let key = (ttl > 0).then(|| self.key_for(Kind::Block, ctx, path, &tags));

        if let Some(key) = key.as_ref() {
            if let Some(cached) = self.lookup(key)? {
                record_hit(Kind::Block.as_str());
                return Ok(Some(cached));
            }
        }

        let producer = options
            .class_name
            .clone()
            .unwrap_or_else(|| block_class_name(path));
        let Some(block) = self.blocks.resolve(&producer) else {
            debug!(
                producer = %producer,
                outcome = "producer_not_found",
                "no block producer registered"
            );
            return Ok(None);
        };

        let block_ctx = BlockContext {
            user: &ctx.user,
            query: options.query.as_ref(),
            locals: &options.locals,
        };
        let data = block
            .get_data(&block_ctx)
            .map_err(|source| RenderError::block(producer.as_str(), source))?;
        let data = merge_locals(data, options.locals.clone());
        let template = self.config.block_template(path);

        let output = match key {
            Some(key) => {
                record_miss(Kind::Block.as_str());
                self.render_and_store(&key, &template, &data, ttl)?
            }
            None => {
                record_bypass(Kind::Block.as_str());
                self.render_content(&template, &data)?
            }
        };
        Ok(Some(output))
    }

    /// Render a block from caller-supplied data, skipping producer lookup.
    #[instrument(skip_all, fields(path = %options.path))]
    pub fn render_block_with_data(
        &self,
        ctx: &RequestContext,
        options: &BlockDataOptions,
    ) -> Result<String, RenderError> {
        let ttl = self.config.resolve_ttl(options.ttl);
        let path = content_path(&options.path);
        let template = self.config.block_template(path);
        let data = merge_locals(options.data.clone(), options.locals.clone());

        if ttl == 0 {
            record_bypass(Kind::Block.as_str());
            return self.render_content(&template, &data);
        }

        let tags = block_tags(&options.tags, options.query.as_ref());
        let key = self.key_for(Kind::Block, ctx, path, &tags);
        self.fetch_or_render_counted(Kind::Block.as_str(), &key, &template, &data, ttl)
    }

    /// Same contract as [`RenderCache::render_block`].
    pub fn render_component(
        &self,
        ctx: &RequestContext,
        options: &BlockOptions,
    ) -> Result<Option<String>, RenderError> {
        self.render_block(ctx, options)
    }

    /// Render a block with no tags and no device partition.
    ///
    /// Uses the configured default expiration; a default of zero renders
    /// without touching the store.
    #[instrument(skip(self, data))]
    pub fn render_static_block(&self, path: &str, data: &DataMap) -> Result<String, RenderError> {
        let ttl = self.config.default_expiration_secs;
        let path = content_path(path);
        let template = self.config.block_template(path);

        if ttl == 0 {
            record_bypass(Kind::Block.as_str());
            return self.render_content(&template, data);
        }

        let key = build_key(Kind::Block.as_str(), path, &[]);
        self.fetch_or_render_counted(Kind::Block.as_str(), &key, &template, data, ttl)
    }

    /// Same contract as [`RenderCache::render_static_block`].
    pub fn render_static_component(
        &self,
        path: &str,
        data: &DataMap,
    ) -> Result<String, RenderError> {
        self.render_static_block(path, data)
    }

    /// Top-level page entry: a cache-only read first, then the full page path on a miss.
    #[instrument(skip_all, fields(path = %options.path))]
    pub fn get_html(
        &self,
        ctx: &RequestContext,
        options: &PageOptions,
    ) -> Result<String, RenderError> {
        let ttl = self.config.resolve_ttl(options.ttl);
        if ttl > 0 {
            let path = content_path(&options.path);
            let key = self.key_for(Kind::Page, ctx, path, &options.tags);
            if let Some(cached) = self.lookup(&key)? {
                record_hit(Kind::Page.as_str());
                return Ok(cached);
            }
        }
        self.render_page(ctx, options)
    }

    fn key_for(
        &self,
        kind: Kind,
        ctx: &RequestContext,
        path: &str,
        tags: &[String],
    ) -> CacheKey {
        let label = kind.label(self.config.device_variant(ctx.device()));
        build_key(&label, path, tags)
    }

    /// Cache-only read.
    fn lookup(&self, key: &CacheKey) -> Result<Option<String>, RenderError> {
        if !self.store.exists(key)? {
            debug!(cache = "render", key = %key, outcome = "miss");
            return Ok(None);
        }
        let cached = self.store.get(key)?;
        let outcome = if cached.is_some() { "hit" } else { "vanished" };
        debug!(cache = "render", key = %key, outcome);
        Ok(cached)
    }

    fn fetch_or_render_counted(
        &self,
        kind: &'static str,
        key: &CacheKey,
        template: &str,
        data: &DataMap,
        ttl: u64,
    ) -> Result<String, RenderError> {
        if let Some(cached) = self.lookup(key)? {
            record_hit(kind);
            return Ok(cached);
        }
        record_miss(kind);
        self.render_and_store(key, template, data, ttl)
    }

    fn render_and_store(
        &self,
        key: &CacheKey,
        template: &str,
        data: &DataMap,
        ttl: u64,
    ) -> Result<String, RenderError> {
        let output = self.render_content(template, data)?;
        self.store
            .set(key, output.clone(), Duration::from_secs(ttl))?;
        debug!(cache = "render", key = %key, ttl, outcome = "stored");
        Ok(output)
    }
}

/// Path as used for both the cache key and the template id.
fn content_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn page_template(path: &str) -> String {
    format!("{PAGE_TEMPLATE_ROOT}/{}", content_path(path))
}

/// Explicit tags followed by query-derived tags; duplicates are kept.
fn block_tags(tags: &[String], query: Option<&serde_json::Value>) -> Vec<String> {
    let mut all = tags.to_vec();
    all.extend(derive_tags(query));
    all
}

fn record_hit(kind: &'static str) {
    counter!(METRIC_CACHE_HIT, "kind" => kind).increment(1);
}

fn record_miss(kind: &'static str) {
    counter!(METRIC_CACHE_MISS, "kind" => kind).increment(1);
}

fn record_bypass(kind: &'static str) {
    counter!(METRIC_CACHE_BYPASS, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_template_prefixes_root() {
        assert_eq!(page_template("home"), "pages/home");
        assert_eq!(page_template("/news/list"), "pages/news/list");
    }

    #[test]
    fn content_path_drops_leading_slashes() {
        assert_eq!(content_path("/home"), "home");
        assert_eq!(content_path("//news/list"), "news/list");
        assert_eq!(content_path("nav"), "nav");
    }

    #[test]
    fn block_tags_appends_query_tags() {
        let tags = block_tags(
            &["lang-en".to_string(), "a-1".to_string()],
            Some(&json!({"a": 1, "page": 2})),
        );
        assert_eq!(tags, vec!["lang-en", "a-1", "a-1", "page-2"]);
    }
}
