//! URL Wildcard Service
//!
//! A wildcard maps a source pattern such as `/articles/*` to a destination
//! such as `/content/{1}`, where `{n}` is replaced by whatever the n-th `*`
//! matched. When several patterns match a URL, the one with the most literal
//! characters wins; ties go to the oldest wildcard.

use crate::db::Sequence;
use crate::models::{UrlWildcard, UrlWildcardTranslationResult, ValidationError};
use crate::services::{RepositoryError, Session};
use regex::Regex;
use std::sync::OnceLock;

const PLACEHOLDER_PATTERN: &str = r"\{(\d+)\}";

pub struct UrlWildcardService<'a> {
    session: &'a Session,
}

impl<'a> UrlWildcardService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Register a wildcard
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a wildcard with the same source exists
    /// - `Validation(PlaceholderMismatch)` if the destination references a
    ///   `{n}` without a matching `*`
    pub async fn create(
        &self,
        source_url: &str,
        destination_url: &str,
        forward: bool,
    ) -> Result<UrlWildcard, RepositoryError> {
        let source_url = normalize(source_url);
        let destination_url = normalize(destination_url);
        self.session
            .write(|uow| {
                uow.authorize_global("content", "urltranslator")?;
                if uow
                    .state
                    .url_wildcards
                    .values()
                    .any(|wildcard| wildcard.source_url == source_url)
                {
                    return Err(RepositoryError::invalid_argument(
                        "sourceUrl",
                        format!("a wildcard for '{}' already exists", source_url),
                    ));
                }
                validate_placeholders(&source_url, &destination_url)?;

                let id = uow.state.next_id(Sequence::UrlWildcard);
                let wildcard = UrlWildcard {
                    id,
                    source_url,
                    destination_url,
                    forward,
                };
                uow.state.url_wildcards.insert(id, wildcard.clone());
                tracing::debug!(
                    "Created URL wildcard {} -> {}",
                    wildcard.source_url,
                    wildcard.destination_url
                );
                Ok(wildcard)
            })
            .await
    }

    pub async fn load(&self, id: u64) -> Result<UrlWildcard, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.state
                    .url_wildcards
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("UrlWildcard", id))
            })
            .await
    }

    pub async fn load_all(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<UrlWildcard>, RepositoryError> {
        self.session
            .read(|ctx| {
                Ok(ctx
                    .state
                    .url_wildcards
                    .values()
                    .skip(offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect())
            })
            .await
    }

    pub async fn count_all(&self) -> Result<usize, RepositoryError> {
        self.session
            .read(|ctx| Ok(ctx.state.url_wildcards.len()))
            .await
    }

    pub async fn remove(&self, wildcard: &UrlWildcard) -> Result<(), RepositoryError> {
        let id = wildcard.id;
        self.session
            .write(|uow| {
                uow.authorize_global("content", "urltranslator")?;
                uow.state
                    .url_wildcards
                    .remove(&id)
                    .map(|_| ())
                    .ok_or_else(|| RepositoryError::not_found("UrlWildcard", id))
            })
            .await
    }

    /// Translate a URL through the most specific matching wildcard
    pub async fn translate(&self, url: &str) -> Result<UrlWildcardTranslationResult, RepositoryError> {
        let url = normalize(url);
        self.session
            .read(|ctx| {
                let mut best: Option<(usize, &UrlWildcard, Vec<String>)> = None;
                for wildcard in ctx.state.url_wildcards.values() {
                    let Some(captures) = match_source(&wildcard.source_url, &url)? else {
                        continue;
                    };
                    let specificity = literal_length(&wildcard.source_url);
                    // ids ascend, so the first wildcard wins ties
                    let leader = best.as_ref().map(|(score, winner, _)| (*score, winner.id));
                    match leader {
                        Some((score, winner_id)) if specificity == score => {
                            tracing::warn!(
                                "URL wildcards {} and {} match '{}' equally, using {}",
                                winner_id,
                                wildcard.id,
                                url,
                                winner_id
                            );
                        }
                        Some((score, _)) if specificity < score => {}
                        _ => best = Some((specificity, wildcard, captures)),
                    }
                }

                let (_, wildcard, captures) =
                    best.ok_or_else(|| RepositoryError::not_found("UrlWildcard", &url))?;
                Ok(UrlWildcardTranslationResult {
                    uri: substitute(&wildcard.destination_url, &captures),
                    forward: wildcard.forward,
                })
            })
            .await
    }
}

/// Leading slash, no surrounding whitespace or trailing slash
fn normalize(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    format!("/{}", trimmed)
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).unwrap())
}

fn validate_placeholders(source_url: &str, destination_url: &str) -> Result<(), ValidationError> {
    let wildcards = source_url.matches('*').count();
    for captures in placeholder_regex().captures_iter(destination_url) {
        let placeholder = captures[1].parse::<usize>().unwrap_or(usize::MAX);
        if placeholder == 0 || placeholder > wildcards {
            return Err(ValidationError::PlaceholderMismatch { placeholder });
        }
    }
    Ok(())
}

fn literal_length(source_url: &str) -> usize {
    source_url.chars().filter(|c| *c != '*').count()
}

fn match_source(source_url: &str, url: &str) -> Result<Option<Vec<String>>, RepositoryError> {
    let pattern = source_url
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(.*)");
    let regex = Regex::new(&format!("^{}$", pattern))
        .map_err(|e| RepositoryError::invalid_argument("sourceUrl", e.to_string()))?;
    Ok(regex.captures(url).map(|captures| {
        captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    }))
}

fn substitute(destination_url: &str, captures: &[String]) -> String {
    placeholder_regex()
        .replace_all(destination_url, |groups: &regex::Captures<'_>| {
            groups[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| captures.get(n.wrapping_sub(1)))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}
