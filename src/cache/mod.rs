//! Render cache primitives.
//!
//! - **Keys**: deterministic derivation of cache keys from kind, path and tags
//! - **Store**: the [`CacheStore`] seam plus an LRU-bounded in-memory store
//!
//! ## Configuration
//!
//! ```toml
//! [render]
//! default_expiration_seconds = 3600
//! device_partitioning = false
//! block_template_root = "blocks"
//!
//! [store]
//! max_entries = 1024
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub(crate) use config::{DEFAULT_BLOCK_TEMPLATE_ROOT, DEFAULT_EXPIRATION_SECS, DEFAULT_MAX_ENTRIES};
pub use keys::{CacheKey, Kind, build_key, derive_tags};
pub use store::{CacheStore, MemoryStore, StoreError};
