//! View rendering helpers with a tagged, keyed render cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod presentation;

pub use application::render::{
    Block, BlockContext, BlockDataOptions, BlockError, BlockOptions, BlockRegistry,
    ContentProducer, DataMap, PageOptions, RenderCache, RenderError, RequestContext,
    TemplateError, TemplateSet,
};
pub use cache::{CacheConfig, CacheKey, CacheStore, MemoryStore, StoreError};
