//! Token Service
//!
//! Opaque, expiring credentials such as password reset or invitation tokens.
//! Values are random alphanumeric strings; a token is found by type, value
//! and (optionally) the identifier it was issued for. Expired tokens are never
//! returned and can be purged with [`TokenService::delete_expired_tokens`].

use crate::db::Sequence;
use crate::models::Token;
use crate::services::{RepositoryError, Session};
use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub struct TokenService<'a> {
    session: &'a Session,
}

impl<'a> TokenService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Issue a token valid for `ttl_seconds`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty type, a negative ttl, or a length of 0
    /// or above the configured maximum.
    pub async fn generate_token(
        &self,
        token_type: &str,
        ttl_seconds: i64,
        identifier: Option<&str>,
        length: Option<usize>,
    ) -> Result<Token, RepositoryError> {
        let config = self.session.repository().config();
        let length = length.unwrap_or(config.default_token_length);
        if length == 0 || length > config.max_token_length {
            return Err(RepositoryError::invalid_argument(
                "length",
                format!(
                    "token length must be between 1 and {}, got {}",
                    config.max_token_length, length
                ),
            ));
        }
        if token_type.trim().is_empty() {
            return Err(RepositoryError::invalid_argument(
                "type",
                "token type must not be empty",
            ));
        }
        if ttl_seconds < 0 {
            return Err(RepositoryError::invalid_argument(
                "ttl",
                "ttl must not be negative",
            ));
        }
        let ttl = Duration::try_seconds(ttl_seconds).ok_or_else(|| ttl_out_of_range(ttl_seconds))?;

        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        self.session
            .write(|uow| {
                let expires_at = uow
                    .now
                    .checked_add_signed(ttl)
                    .ok_or_else(|| ttl_out_of_range(ttl_seconds))?;
                let id = uow.state.next_id(Sequence::Token);
                let token = Token {
                    id,
                    token_type: token_type.to_string(),
                    value,
                    identifier: identifier.map(str::to_string),
                    created_at: uow.now,
                    expires_at,
                };
                uow.state.tokens.insert(id, token.clone());
                tracing::debug!("Generated {} token {}", token.token_type, id);
                Ok(token)
            })
            .await
    }

    /// A valid token; expired or unknown tokens are `NotFound`
    pub async fn get_token(
        &self,
        token_type: &str,
        value: &str,
        identifier: Option<&str>,
    ) -> Result<Token, RepositoryError> {
        let now = chrono::Utc::now();
        self.session
            .read(|ctx| {
                ctx.state
                    .tokens
                    .values()
                    .find(|token| {
                        token.token_type == token_type
                            && token.value == value
                            && identifier.map_or(true, |id| token.identifier.as_deref() == Some(id))
                            && !token.is_expired(now)
                    })
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("Token", format!("{}:{}", token_type, value)))
            })
            .await
    }

    pub async fn check_token(
        &self,
        token_type: &str,
        value: &str,
        identifier: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        match self.get_token(token_type, value, identifier).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Expire every token of a type issued for `identifier`
    pub async fn revoke_token_by_identifier(
        &self,
        token_type: &str,
        identifier: &str,
    ) -> Result<usize, RepositoryError> {
        self.session
            .write(|uow| {
                let now = uow.now;
                let mut revoked = 0;
                for token in uow.state.tokens.values_mut() {
                    if token.token_type == token_type
                        && token.identifier.as_deref() == Some(identifier)
                        && !token.is_expired(now)
                    {
                        token.expires_at = now;
                        revoked += 1;
                    }
                }
                Ok(revoked)
            })
            .await
    }

    pub async fn delete_token(&self, token: &Token) -> Result<(), RepositoryError> {
        let id = token.id;
        self.session
            .write(|uow| {
                uow.state
                    .tokens
                    .remove(&id)
                    .map(|_| ())
                    .ok_or_else(|| RepositoryError::not_found("Token", id))
            })
            .await
    }

    /// Purge expired tokens, optionally of one type only
    pub async fn delete_expired_tokens(&self, token_type: Option<&str>) -> Result<usize, RepositoryError> {
        self.session
            .write(|uow| {
                let now = uow.now;
                let before = uow.state.tokens.len();
                uow.state.tokens.retain(|_, token| {
                    !(token.is_expired(now) && token_type.map_or(true, |t| token.token_type == t))
                });
                let deleted = before - uow.state.tokens.len();
                if deleted > 0 {
                    tracing::info!("Deleted {} expired tokens", deleted);
                }
                Ok(deleted)
            })
            .await
    }
}

fn ttl_out_of_range(ttl_seconds: i64) -> RepositoryError {
    RepositoryError::invalid_argument(
        "ttl",
        format!("ttl of {} seconds is out of range", ttl_seconds),
    )
}
