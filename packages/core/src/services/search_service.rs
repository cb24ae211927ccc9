//! Search Service
//!
//! Runs queries against the configured [`SearchEngine`](crate::search::SearchEngine)
//! and turns its matches into permission-filtered, paged [`SearchResult`]s.
//!
//! The index only reflects committed state: searches inside an open
//! transaction do not see the transaction's own changes, and with deferred
//! refresh a commit becomes searchable after
//! [`Repository::refresh_search_index`](crate::services::Repository::refresh_search_index).

use crate::db::RepositoryState;
use crate::models::{Content, ContentInfo, Location};
use crate::permissions::{PermissionResolver, PermissionTarget};
use crate::search::{
    ContentDocument, Criterion, LanguageSettings, LocationQuery, Query, SearchHit, SearchResult,
};
use crate::services::{RepositoryError, Session};
use std::time::Instant;

pub struct SearchService<'a> {
    session: &'a Session,
}

impl<'a> SearchService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Find content; fields are limited to the requested languages
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a `Field` criterion on a field that is not searchable
    /// - `NotImplemented` for criteria the engine does not support
    pub async fn find_content(
        &self,
        query: Query,
        languages: Option<LanguageSettings>,
    ) -> Result<SearchResult<Content>, RepositoryError> {
        let languages = languages.unwrap_or_default();
        let result = self.content_hits(&query, &languages).await?;
        let hits = result
            .search_hits
            .into_iter()
            .map(|hit| {
                let mut content = hit.value_object.content.clone();
                if !languages.languages.is_empty() {
                    content.fields.retain(|field| {
                        field.language_code == hit.matched_translation
                            || languages.languages.contains(&field.language_code)
                    });
                }
                SearchHit {
                    value_object: content,
                    score: hit.score,
                    matched_translation: hit.matched_translation,
                }
            })
            .collect();
        Ok(SearchResult {
            search_hits: hits,
            ..result_shell(result.total_count, result.max_score, result.time)
        })
    }

    pub async fn find_content_info(
        &self,
        query: Query,
    ) -> Result<SearchResult<ContentInfo>, RepositoryError> {
        let result = self.content_hits(&query, &LanguageSettings::default()).await?;
        let hits = result
            .search_hits
            .into_iter()
            .map(|hit| SearchHit {
                value_object: hit.value_object.content.content_info.clone(),
                score: hit.score,
                matched_translation: hit.matched_translation,
            })
            .collect();
        Ok(SearchResult {
            search_hits: hits,
            ..result_shell(result.total_count, result.max_score, result.time)
        })
    }

    /// Find locations; each location of a content item is a separate hit
    pub async fn find_locations(
        &self,
        query: LocationQuery,
        languages: Option<LanguageSettings>,
    ) -> Result<SearchResult<Location>, RepositoryError> {
        let started = Instant::now();
        let languages = languages.unwrap_or_default();
        self.validate(&query).await?;

        let engine = self.session.repository().inner().search.clone();
        let matches = engine.find_locations(&query, &languages).await?;
        let limit = self.limit(&query);
        let scored = query.query.is_some();

        self.session
            .read(|ctx| {
                let permissions = ctx.permissions();
                let readable: Vec<_> = matches
                    .into_iter()
                    .filter(|m| {
                        permissions.can_user(
                            "content",
                            "read",
                            &PermissionTarget::for_location(&m.document.content.content_info, &m.location),
                        )
                    })
                    .collect();

                let total_count = readable.len();
                let max_score = scored
                    .then(|| readable.iter().map(|m| m.score).fold(f32::MIN, f32::max))
                    .filter(|_| total_count > 0);
                let search_hits = readable
                    .into_iter()
                    .skip(query.offset)
                    .take(limit)
                    .map(|m| SearchHit {
                        value_object: m.location,
                        score: scored.then_some(m.score),
                        matched_translation: m.matched_translation,
                    })
                    .collect();
                Ok(SearchResult {
                    total_count,
                    search_hits,
                    max_score,
                    time: started.elapsed(),
                })
            })
            .await
    }

    /// The single content item matching `filter`
    ///
    /// # Errors
    ///
    /// - `NotFound` when nothing readable matches
    /// - `InvalidArgument` when more than one item matches
    pub async fn find_single(
        &self,
        filter: Criterion,
        languages: Option<LanguageSettings>,
    ) -> Result<Content, RepositoryError> {
        let result = self
            .find_content(Query::filter(filter).with_limit(2), languages)
            .await?;
        match result.total_count {
            0 => Err(RepositoryError::not_found("Content", "search criterion")),
            1 => result
                .search_hits
                .into_iter()
                .next()
                .map(|hit| hit.value_object)
                .ok_or_else(|| RepositoryError::not_found("Content", "search criterion")),
            count => Err(RepositoryError::invalid_argument(
                "filter",
                format!("expected a single match, found {}", count),
            )),
        }
    }

    /// Readable content matches, paged
    async fn content_hits(
        &self,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<SearchResult<std::sync::Arc<ContentDocument>>, RepositoryError> {
        let started = Instant::now();
        self.validate(query).await?;

        let engine = self.session.repository().inner().search.clone();
        let matches = engine.find_contents(query, languages).await?;
        let limit = self.limit(query);
        let scored = query.query.is_some();

        self.session
            .read(|ctx| {
                let permissions = ctx.permissions();
                let readable: Vec<_> = matches
                    .into_iter()
                    .filter(|m| can_read_document(&permissions, &m.document))
                    .collect();

                let total_count = readable.len();
                let max_score = scored
                    .then(|| readable.iter().map(|m| m.score).fold(f32::MIN, f32::max))
                    .filter(|_| total_count > 0);
                let search_hits = readable
                    .into_iter()
                    .skip(query.offset)
                    .take(limit)
                    .map(|m| SearchHit {
                        value_object: m.document,
                        score: scored.then_some(m.score),
                        matched_translation: m.matched_translation,
                    })
                    .collect();
                Ok(SearchResult {
                    total_count,
                    search_hits,
                    max_score,
                    time: started.elapsed(),
                })
            })
            .await
    }

    /// Reject field criteria on fields no content type marks searchable
    async fn validate(&self, query: &Query) -> Result<(), RepositoryError> {
        self.session
            .read(|ctx| {
                for criterion in query.criteria() {
                    let mut failure = None;
                    criterion.walk(&mut |node| {
                        if let Criterion::Field { identifier, .. } = node {
                            if failure.is_none() && !is_searchable_field(ctx.state, identifier) {
                                failure = Some(identifier.clone());
                            }
                        }
                    });
                    if let Some(identifier) = failure {
                        return Err(RepositoryError::invalid_argument(
                            "criterion",
                            format!("no searchable field definition '{}' exists", identifier),
                        ));
                    }
                }
                Ok(())
            })
            .await
    }

    fn limit(&self, query: &Query) -> usize {
        query
            .limit
            .unwrap_or(self.session.repository().config().default_search_limit)
    }
}

fn result_shell<T>(
    total_count: usize,
    max_score: Option<f32>,
    time: std::time::Duration,
) -> SearchResult<T> {
    SearchResult {
        total_count,
        search_hits: Vec::new(),
        max_score,
        time,
    }
}

fn is_searchable_field(state: &RepositoryState, identifier: &str) -> bool {
    state.content_types.values().any(|content_type| {
        content_type
            .field_definition(identifier)
            .is_some_and(|definition| definition.is_searchable)
    })
}

fn can_read_document(permissions: &PermissionResolver<'_>, document: &ContentDocument) -> bool {
    let info = &document.content.content_info;
    let target = PermissionTarget {
        section_id: Some(info.section_id),
        owner_id: Some(info.owner_id),
        content_type_id: Some(info.content_type_id),
        location_paths: document
            .locations
            .iter()
            .map(|location| location.path_string.clone())
            .collect(),
        location_ids: document.locations.iter().map(|location| location.id).collect(),
        language_codes: None,
    };
    permissions.can_user("content", "read", &target)
}

#[cfg(test)]
#[path = "search_service_test.rs"]
mod search_service_test;
