use thiserror::Error;

use crate::{application::render::RenderError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("no block producer registered for `{path}`")]
    BlockNotFound { path: String },
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn block_not_found(path: impl Into<String>) -> Self {
        Self::BlockNotFound { path: path.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Chain of messages from this error down through its sources.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}
