//! Page and block rendering with a tagged, keyed output cache.
//!
//! [`RenderCache`] decides per request whether a view is served from the
//! cache store or produced by the template engine and memoized. A TTL of
//! zero renders directly and never touches the store.

mod blocks;
mod engine;
mod service;
mod types;

pub use blocks::{Block, BlockContext, BlockError, BlockRegistry, block_class_name};
pub use engine::{ContentProducer, TemplateError, TemplateSet};
pub use service::RenderCache;
pub use types::{
    BlockDataOptions, BlockOptions, DataMap, PageOptions, RenderError, RequestContext,
};
