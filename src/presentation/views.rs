use askama::Template;
use serde::Deserialize;
use serde_json::Value;

use crate::application::render::{DataMap, TemplateError, TemplateSet};
use crate::cache::CacheConfig;

pub const HOME_PAGE: &str = "pages/home";
pub const RECENT_BLOCK_PATH: &str = "recent";
const DEFAULT_RECENT_HEADING: &str = "Recent";

/// Render an askama template, tagging failures with the template identifier.
pub fn render_template<T: Template>(id: &str, template: T) -> Result<String, TemplateError> {
    template
        .render()
        .map_err(|err| TemplateError::render(id, err))
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomePageTemplate {
    pub title: String,
    pub intro: Option<String>,
}

impl HomePageTemplate {
    pub fn from_data(data: &DataMap) -> Result<Self, TemplateError> {
        Ok(Self {
            title: required_str(data, HOME_PAGE, "title")?,
            intro: optional_str(data, "intro"),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LinkView {
    pub label: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "blocks/recent.html")]
pub struct RecentBlockTemplate {
    pub heading: String,
    pub items: Vec<LinkView>,
}

impl RecentBlockTemplate {
    pub fn from_data(id: &str, data: &DataMap) -> Result<Self, TemplateError> {
        let items = match data.get("items") {
            Some(value) => Vec::<LinkView>::deserialize(value)
                .map_err(|_| TemplateError::missing_field(id, "items"))?,
            None => Vec::new(),
        };
        Ok(Self {
            heading: optional_str(data, "heading")
                .unwrap_or_else(|| DEFAULT_RECENT_HEADING.to_string()),
            items,
        })
    }
}

/// Built-in templates, with block templates placed under the configured root.
pub fn builtin_templates(config: &CacheConfig) -> TemplateSet {
    let recent = config.block_template(RECENT_BLOCK_PATH);
    let recent_id = recent.clone();

    TemplateSet::new()
        .with(HOME_PAGE, |data: &DataMap| {
            render_template(HOME_PAGE, HomePageTemplate::from_data(data)?)
        })
        .with(recent, move |data: &DataMap| {
            render_template(&recent_id, RecentBlockTemplate::from_data(&recent_id, data)?)
        })
}

fn required_str(data: &DataMap, id: &str, field: &'static str) -> Result<String, TemplateError> {
    optional_str(data, field).ok_or_else(|| TemplateError::missing_field(id, field))
}

fn optional_str(data: &DataMap, field: &str) -> Option<String> {
    match data.get(field) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}
