use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::cache::StoreError;

use super::blocks::BlockError;
use super::engine::TemplateError;

/// Data handed to templates and returned by blocks.
pub type DataMap = Map<String, Value>;

/// Per-request state that partitions or feeds rendering.
///
/// Passed explicitly into every render operation that needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Device class of the requester, e.g. `mobile`.
    pub device: Option<String>,
    /// Data describing the current user, forwarded to blocks.
    pub user: DataMap,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_user(mut self, user: DataMap) -> Self {
        self.user = user;
        self
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

/// Options for rendering a page under `pages/<path>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    pub path: String,
    pub data: DataMap,
    pub tags: Vec<String>,
    /// Expiration in seconds; `None` uses the configured default, `Some(0)` bypasses caching.
    pub ttl: Option<u64>,
}

impl PageOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Options for rendering a block whose data comes from a registered producer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlockOptions {
    pub path: String,
    /// Explicit producer name; derived from `path` when absent.
    pub class_name: Option<String>,
    pub tags: Vec<String>,
    /// Query mapping, turned into extra `<key>-<value>` tags.
    pub query: Option<Value>,
    pub ttl: Option<u64>,
    /// Values merged over the producer's data, winning on collision.
    pub locals: DataMap,
}

impl BlockOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_locals(mut self, locals: DataMap) -> Self {
        self.locals = locals;
        self
    }
}

/// Options for rendering a block from caller-supplied data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlockDataOptions {
    pub path: String,
    pub data: DataMap,
    pub tags: Vec<String>,
    pub query: Option<Value>,
    pub ttl: Option<u64>,
    pub locals: DataMap,
}

impl BlockDataOptions {
    pub fn new(path: impl Into<String>, data: DataMap) -> Self {
        Self {
            path: path.into(),
            data,
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_locals(mut self, locals: DataMap) -> Self {
        self.locals = locals;
        self
    }
}

/// Failure while rendering or caching a view.
///
/// A missing block producer is not an error; see `RenderCache::render_block`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("block producer `{producer}` failed")]
    Block {
        producer: String,
        #[source]
        source: BlockError,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl RenderError {
    pub fn block(producer: impl Into<String>, source: BlockError) -> Self {
        Self::Block {
            producer: producer.into(),
            source,
        }
    }
}

/// Overlay `locals` onto `data`; locals win on key collision.
pub(crate) fn merge_locals(mut data: DataMap, locals: DataMap) -> DataMap {
    for (key, value) in locals {
        data.insert(key, value);
    }
    data
}
