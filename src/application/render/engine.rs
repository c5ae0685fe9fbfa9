//! Template engine seam.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::types::DataMap;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{template}` is not registered")]
    Unknown { template: String },
    #[error("template `{template}` is missing field `{field}`")]
    MissingField {
        template: String,
        field: &'static str,
    },
    #[error("template `{template}` failed to render")]
    Render {
        template: String,
        #[source]
        source: askama::Error,
    },
}

impl TemplateError {
    pub fn unknown(template: impl Into<String>) -> Self {
        Self::Unknown {
            template: template.into(),
        }
    }

    pub fn missing_field(template: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            template: template.into(),
            field,
        }
    }

    pub fn render(template: impl Into<String>, source: askama::Error) -> Self {
        Self::Render {
            template: template.into(),
            source,
        }
    }
}

/// Renders a template identifier with a data mapping into a string.
///
/// Expected to have no side effects beyond its return value.
pub trait ContentProducer: Send + Sync {
    fn render(&self, template: &str, data: &DataMap) -> Result<String, TemplateError>;
}

type RenderFn = Arc<dyn Fn(&DataMap) -> Result<String, TemplateError> + Send + Sync>;

/// Content producer backed by a table of named render functions.
#[derive(Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, RenderFn>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, template: impl Into<String>, render: F) -> Self
    where
        F: Fn(&DataMap) -> Result<String, TemplateError> + Send + Sync + 'static,
    {
        self.templates.insert(template.into(), Arc::new(render));
        self
    }

    pub fn contains(&self, template: &str) -> bool {
        self.templates.contains_key(template)
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TemplateSet")
            .field("templates", &names)
            .finish()
    }
}

impl ContentProducer for TemplateSet {
    fn render(&self, template: &str, data: &DataMap) -> Result<String, TemplateError> {
        let render = self
            .templates
            .get(template)
            .ok_or_else(|| TemplateError::unknown(template))?;
        render(data)
    }
}
