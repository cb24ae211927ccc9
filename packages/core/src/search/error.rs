//! Search Error Types

use thiserror::Error;

/// Errors raised by search engines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Criterion the engine does not support
    #[error("Criterion '{0}' is not supported by this search engine")]
    NotImplemented(String),

    /// Query that cannot be evaluated
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Engine failure while indexing or querying
    #[error("Search backend failure: {0}")]
    Backend(String),
}

impl SearchError {
    pub fn not_implemented(criterion: impl Into<String>) -> Self {
        Self::NotImplemented(criterion.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
