//! Block producers and the registry that resolves them by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::types::DataMap;

const BLOCK_SUFFIX: &str = "Block";

/// Inputs a block sees when fetching its data.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub user: &'a DataMap,
    pub query: Option<&'a Value>,
    pub locals: &'a DataMap,
}

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block data unavailable: {message}")]
    Unavailable { message: String },
    #[error("block input invalid: {message}")]
    InvalidInput { message: String },
}

impl BlockError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Supplies the data mapping a block template renders from.
pub trait Block: Send {
    fn get_data(&self, ctx: &BlockContext<'_>) -> Result<DataMap, BlockError>;
}

type BlockFactory = Arc<dyn Fn() -> Box<dyn Block> + Send + Sync>;

/// Name → factory mapping, populated at startup.
#[derive(Clone, Default)]
pub struct BlockRegistry {
    factories: HashMap<String, BlockFactory>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same name replaces the earlier one.
    pub fn register<F, B>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Block + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || Box::new(factory()) as Box<dyn Block>),
        );
        self
    }

    pub fn with<F, B>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Block + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh producer, or `None` when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<Box<dyn Block>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("BlockRegistry").field("blocks", &names).finish()
    }
}

/// Producer name for a block path: `index/index` → `IndexIndexBlock`.
///
/// Segments are split on `/`, `-` and `_`, and each is capitalized.
pub fn block_class_name(path: &str) -> String {
    let mut name = String::with_capacity(path.len() + BLOCK_SUFFIX.len());
    for segment in path
        .split(['/', '-', '_'])
        .filter(|segment| !segment.is_empty())
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name.push_str(BLOCK_SUFFIX);
    name
}
