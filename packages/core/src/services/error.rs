//! Service Layer Error Types
//!
//! [`RepositoryError`] is the error every service operation returns. It maps the
//! repository's failure taxonomy (not found, invalid argument, validation,
//! unauthorized, bad state, not implemented) plus transaction misuse.

use crate::models::ValidationError;
use crate::search::SearchError;
use thiserror::Error;

/// Repository operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// Unknown id, code or identifier
    #[error("Could not find '{kind}' with identifier '{identifier}'")]
    NotFound { kind: String, identifier: String },

    /// Argument rejected before any state was touched
    #[error("Argument '{argument}' is invalid: {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// Malformed, missing or duplicate input
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Policy denial
    #[error("The user does not have the '{function}' '{module}' permission")]
    Unauthorized { module: String, function: String },

    /// Operation invalid for the current lifecycle state
    #[error("Argument '{argument}' has a bad state: {reason}")]
    BadState { argument: String, reason: String },

    /// Optional feature the configured backend does not provide
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Maximum number of languages reached ({max})")]
    LanguageLimitReached { max: usize },

    /// `commit` or `rollback` without a matching `begin_transaction`
    #[error("There is no active transaction")]
    NoActiveTransaction,

    /// Commit rejected, e.g. because another commit landed first
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },

    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Repository could not be set up
    #[error("Initialization error: {0}")]
    InitializationError(String),
}

impl RepositoryError {
    /// Create a not found error
    pub fn not_found(kind: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            identifier: identifier.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Create an unauthorized error for a module/function pair
    pub fn unauthorized(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self::Unauthorized {
            module: module.into(),
            function: function.into(),
        }
    }

    /// Create a bad state error
    pub fn bad_state(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadState {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented(feature.into())
    }

    /// Create a transaction failed error
    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::InitializationError(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<SearchError> for RepositoryError {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::NotImplemented(criterion) => Self::NotImplemented(criterion),
            SearchError::InvalidQuery(reason) => Self::invalid_argument("query", reason),
            SearchError::Backend(msg) => Self::SearchFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_carries_module_and_function() {
        let err = RepositoryError::unauthorized("content", "create");
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "The user does not have the 'create' 'content' permission"
        );
    }

    #[test]
    fn test_language_limit_message_mentions_maximum() {
        let err = RepositoryError::LanguageLimitReached { max: 62 };
        assert!(err.to_string().contains("Maximum number of languages reached"));
    }

    #[test]
    fn test_search_errors_map_to_taxonomy() {
        let err: RepositoryError = SearchError::not_implemented("ImageMetadata").into();
        assert!(matches!(err, RepositoryError::NotImplemented(_)));

        let err: RepositoryError = SearchError::invalid_query("bad").into();
        assert!(matches!(err, RepositoryError::InvalidArgument { .. }));
    }
}
