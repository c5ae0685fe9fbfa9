//! Site-level block producers.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::application::render::{Block, BlockContext, BlockError, BlockRegistry, DataMap};
use crate::presentation::views::LinkView;

pub const RECENT_BLOCK: &str = "RecentBlock";

/// Lists the most recent links, newest first, honouring a `limit` query value.
#[derive(Clone, Debug)]
pub struct RecentBlock {
    links: Arc<Vec<LinkView>>,
}

impl RecentBlock {
    pub fn new(links: Arc<Vec<LinkView>>) -> Self {
        Self { links }
    }
}

impl Block for RecentBlock {
    fn get_data(&self, ctx: &BlockContext<'_>) -> Result<DataMap, BlockError> {
        let limit = match ctx.query.and_then(|query| query.get("limit")) {
            None => self.links.len(),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|value| usize::try_from(value).ok())
                .ok_or_else(|| BlockError::invalid_input("limit must be a positive integer"))?,
            Some(Value::String(text)) => text
                .parse()
                .map_err(|_| BlockError::invalid_input(format!("limit `{text}` is not a number")))?,
            Some(_) => return Err(BlockError::invalid_input("limit must be a number")),
        };

        let items: Vec<Value> = self
            .links
            .iter()
            .take(limit)
            .map(|link| json!({"label": link.label, "href": link.href}))
            .collect();

        let mut data = DataMap::new();
        data.insert("items".to_string(), Value::Array(items));
        if let Some(name) = ctx.user.get("name").and_then(Value::as_str) {
            data.insert("heading".to_string(), json!(format!("Recent for {name}")));
        }
        Ok(data)
    }
}

/// Registry holding the site's built-in blocks.
pub fn block_registry(links: Vec<LinkView>) -> BlockRegistry {
    let links = Arc::new(links);
    BlockRegistry::new().with(RECENT_BLOCK, move || RecentBlock::new(Arc::clone(&links)))
}
