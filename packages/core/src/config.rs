//! Repository Configuration
//!
//! Settings are plain serde data with defaults suitable for tests and embedded
//! use. Binaries usually start from [`RepositoryConfig::from_env`], which reads
//! `FOLIO_*` variables on top of the defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// When committed changes become visible to search queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Index updates are applied as part of every commit
    Immediate,
    /// Index updates are queued until `refresh_search_index()` is called
    Deferred,
}

impl std::str::FromStr for RefreshMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(RefreshMode::Immediate),
            "deferred" => Ok(RefreshMode::Deferred),
            other => Err(format!("unknown search refresh mode '{}'", other)),
        }
    }
}

/// Configuration for [`Repository`](crate::services::Repository)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// Language seeded on startup and used when no language is given
    pub default_language_code: String,

    /// Name of the seeded default language
    pub default_language_name: String,

    pub search_refresh: RefreshMode,

    /// Page size when a search query sets no limit
    pub default_search_limit: usize,

    /// Maximum number of loaded content versions kept in memory
    pub content_cache_capacity: usize,

    pub default_token_length: usize,

    /// Requests for longer tokens fail fast
    pub max_token_length: usize,

    pub anonymous_user_id: u64,

    pub admin_user_id: u64,

    /// Buffer of the domain event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_language_code: "eng-GB".to_string(),
            default_language_name: "English (United Kingdom)".to_string(),
            search_refresh: RefreshMode::Immediate,
            default_search_limit: 25,
            content_cache_capacity: 1024,
            default_token_length: 64,
            max_token_length: 256,
            anonymous_user_id: 10,
            admin_user_id: 14,
            event_channel_capacity: 256,
        }
    }
}

impl RepositoryConfig {
    /// Defaults overridden by `FOLIO_*` environment variables
    ///
    /// Recognized variables: `FOLIO_DEFAULT_LANGUAGE`, `FOLIO_SEARCH_REFRESH`,
    /// `FOLIO_SEARCH_LIMIT`, `FOLIO_CACHE_CAPACITY`, `FOLIO_TOKEN_LENGTH`,
    /// `FOLIO_MAX_TOKEN_LENGTH`, `FOLIO_ANONYMOUS_USER_ID`, `FOLIO_ADMIN_USER_ID`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(code) = env::var("FOLIO_DEFAULT_LANGUAGE") {
            config.default_language_code = code;
        }
        if let Ok(mode) = env::var("FOLIO_SEARCH_REFRESH") {
            config.search_refresh = mode.parse()?;
        }
        config.default_search_limit = parse_var("FOLIO_SEARCH_LIMIT", config.default_search_limit)?;
        config.content_cache_capacity =
            parse_var("FOLIO_CACHE_CAPACITY", config.content_cache_capacity)?;
        config.default_token_length = parse_var("FOLIO_TOKEN_LENGTH", config.default_token_length)?;
        config.max_token_length = parse_var("FOLIO_MAX_TOKEN_LENGTH", config.max_token_length)?;
        config.anonymous_user_id = parse_var("FOLIO_ANONYMOUS_USER_ID", config.anonymous_user_id)?;
        config.admin_user_id = parse_var("FOLIO_ADMIN_USER_ID", config.admin_user_id)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_language_code.trim().is_empty() {
            return Err("default_language_code must not be empty".to_string());
        }
        if self.default_search_limit == 0 {
            return Err("default_search_limit must be greater than zero".to_string());
        }
        if self.content_cache_capacity == 0 {
            return Err("content_cache_capacity must be greater than zero".to_string());
        }
        if self.default_token_length == 0 || self.default_token_length > self.max_token_length {
            return Err(format!(
                "default_token_length must be between 1 and max_token_length ({})",
                self.max_token_length
            ));
        }
        if self.anonymous_user_id == self.admin_user_id {
            return Err("anonymous and administrator user ids must differ".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}
