//! Search Engines
//!
//! [`SearchEngine`] is the seam to a search backend. The repository hands every
//! commit's [`IndexBatch`] to [`SearchEngine::index`] while holding the commit
//! lock, so batches arrive in commit order. Whether they become visible at once
//! or only after [`SearchEngine::refresh`] is up to the backend; after
//! `refresh` returns, every batch indexed before the call is visible.
//!
//! Engines return every match ordered by the query's sort clauses. Permission
//! filtering and paging happen in the search service.

use crate::config::RefreshMode;
use crate::models::{Location, SortOrder};
use crate::search::criterion::{Criterion, LanguageSettings, Query, SortClause};
use crate::search::document::{validate_operands, Candidate, ContentDocument};
use crate::search::synchronizer::IndexBatch;
use crate::search::SearchError;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A matching content document
#[derive(Debug, Clone)]
pub struct ContentMatch {
    pub document: Arc<ContentDocument>,
    pub score: f32,
    pub matched_translation: String,
}

/// A matching location with the document of its content
#[derive(Debug, Clone)]
pub struct LocationMatch {
    pub document: Arc<ContentDocument>,
    pub location: Location,
    pub score: f32,
    pub matched_translation: String,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accept the index updates of one commit
    async fn index(&self, batch: IndexBatch) -> Result<(), SearchError>;

    /// Make every previously indexed batch visible
    async fn refresh(&self) -> Result<(), SearchError>;

    async fn find_contents(
        &self,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<Vec<ContentMatch>, SearchError>;

    async fn find_locations(
        &self,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<Vec<LocationMatch>, SearchError>;
}

/// Embedded engine evaluating criteria over in-memory documents
pub struct InMemoryEngine {
    mode: RefreshMode,
    documents: RwLock<HashMap<u64, Arc<ContentDocument>>>,
    pending: Mutex<Vec<IndexBatch>>,
}

impl InMemoryEngine {
    pub fn new(mode: RefreshMode) -> Self {
        Self {
            mode,
            documents: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Number of visible documents
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn pending_batches(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn apply(documents: &mut HashMap<u64, Arc<ContentDocument>>, batch: IndexBatch) {
        if batch.purge_all {
            documents.clear();
        }
        for content_id in batch.removals {
            documents.remove(&content_id);
        }
        for document in batch.upserts {
            documents.insert(document.content_id(), document);
        }
    }

    fn check(query: &Query) -> Result<(), SearchError> {
        for criterion in query.criteria() {
            validate_operands(criterion)?;
            let mut unsupported = None;
            criterion.walk(&mut |node| {
                if matches!(node, Criterion::ImageMetadata { .. } | Criterion::CustomField { .. }) {
                    unsupported.get_or_insert(node.name());
                }
            });
            if let Some(name) = unsupported {
                return Err(SearchError::not_implemented(name));
            }
        }
        Ok(())
    }

    /// First candidate language under which the query matches
    fn evaluate(
        candidate: Candidate<'_>,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<Option<(f32, String)>, SearchError> {
        let document = candidate.document;
        for language in
            document.candidate_languages(&languages.languages, languages.use_always_available)
        {
            if let Some(filter) = &query.filter {
                if candidate.score(filter, language)?.is_none() {
                    continue;
                }
            }
            let score = match &query.query {
                Some(criterion) => match candidate.score(criterion, language)? {
                    Some(score) => score,
                    None => continue,
                },
                None => 1.0,
            };
            return Ok(Some((score, language.to_string())));
        }
        Ok(None)
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn index(&self, batch: IndexBatch) -> Result<(), SearchError> {
        if batch.is_empty() {
            return Ok(());
        }
        match self.mode {
            RefreshMode::Immediate => {
                let mut documents = self.documents.write().await;
                Self::apply(&mut documents, batch);
            }
            RefreshMode::Deferred => {
                self.pending.lock().await.push(batch);
            }
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        let batches: Vec<IndexBatch> = std::mem::take(&mut *self.pending.lock().await);
        if batches.is_empty() {
            return Ok(());
        }
        let mut documents = self.documents.write().await;
        tracing::debug!("Applying {} pending index batches", batches.len());
        for batch in batches {
            Self::apply(&mut documents, batch);
        }
        Ok(())
    }

    async fn find_contents(
        &self,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<Vec<ContentMatch>, SearchError> {
        Self::check(query)?;
        let documents = self.documents.read().await;

        let mut matches = Vec::new();
        for document in documents.values() {
            if let Some((score, matched_translation)) =
                Self::evaluate(Candidate::content(document), query, languages)?
            {
                matches.push(ContentMatch {
                    document: document.clone(),
                    score,
                    matched_translation,
                });
            }
        }

        matches.sort_by(|a, b| {
            compare_hits(
                &query.sort_clauses,
                query.query.is_some(),
                (a.document.as_ref(), a.document.main_location(), a.score),
                (b.document.as_ref(), b.document.main_location(), b.score),
            )
        });
        Ok(matches)
    }

    async fn find_locations(
        &self,
        query: &Query,
        languages: &LanguageSettings,
    ) -> Result<Vec<LocationMatch>, SearchError> {
        Self::check(query)?;
        let documents = self.documents.read().await;

        let mut matches = Vec::new();
        for document in documents.values() {
            for location in &document.locations {
                if let Some((score, matched_translation)) =
                    Self::evaluate(Candidate::location(document, location), query, languages)?
                {
                    matches.push(LocationMatch {
                        document: document.clone(),
                        location: location.clone(),
                        score,
                        matched_translation,
                    });
                }
            }
        }

        matches.sort_by(|a, b| {
            compare_hits(
                &query.sort_clauses,
                query.query.is_some(),
                (a.document.as_ref(), Some(&a.location), a.score),
                (b.document.as_ref(), Some(&b.location), b.score),
            )
            .then_with(|| a.location.id.cmp(&b.location.id))
        });
        Ok(matches)
    }
}

type HitKey<'a> = (&'a ContentDocument, Option<&'a Location>, f32);

/// Order two hits by the sort clauses, then by score (scored queries) and id
fn compare_hits(clauses: &[SortClause], scored: bool, a: HitKey<'_>, b: HitKey<'_>) -> Ordering {
    let (doc_a, location_a, score_a) = a;
    let (doc_b, location_b, score_b) = b;
    let info_a = &doc_a.content.content_info;
    let info_b = &doc_b.content.content_info;

    for clause in clauses {
        let (ordering, order) = match clause {
            SortClause::ContentId(order) => (info_a.id.cmp(&info_b.id), order),
            SortClause::ContentName(order) => (
                info_a.name.to_lowercase().cmp(&info_b.name.to_lowercase()),
                order,
            ),
            SortClause::DatePublished(order) => (info_a.published_at.cmp(&info_b.published_at), order),
            SortClause::DateModified(order) => (info_a.modified_at.cmp(&info_b.modified_at), order),
            SortClause::SectionId(order) => (info_a.section_id.cmp(&info_b.section_id), order),
            SortClause::LocationPriority(order) => (
                location_a
                    .map(|l| l.priority)
                    .cmp(&location_b.map(|l| l.priority)),
                order,
            ),
            SortClause::LocationDepth(order) => (
                location_a.map(|l| l.depth).cmp(&location_b.map(|l| l.depth)),
                order,
            ),
            SortClause::LocationPath(order) => (
                location_a
                    .map(|l| l.path())
                    .cmp(&location_b.map(|l| l.path())),
                order,
            ),
            SortClause::Score(order) => (
                score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal),
                order,
            ),
        };
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    let by_score = if scored {
        score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
    } else {
        Ordering::Equal
    };
    by_score.then_with(|| info_a.id.cmp(&info_b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::FieldTypeRegistry;
    use crate::config::RepositoryConfig;
    use crate::db::seed::{seed_state, HOME_CONTENT_ID};
    use crate::search::synchronizer::IndexSynchronizer;

    fn home_batch() -> IndexBatch {
        let state = seed_state(&RepositoryConfig::default());
        IndexSynchronizer::new(&state, &FieldTypeRegistry::new()).full_batch()
    }

    #[tokio::test]
    async fn test_immediate_engine_applies_on_index() {
        let engine = InMemoryEngine::new(RefreshMode::Immediate);
        engine.index(home_batch()).await.unwrap();

        let hits = engine
            .find_contents(
                &Query::filter(Criterion::ContentId(vec![HOME_CONTENT_ID])),
                &LanguageSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched_translation, "eng-GB");
    }

    #[tokio::test]
    async fn test_deferred_engine_waits_for_refresh() {
        let engine = InMemoryEngine::new(RefreshMode::Deferred);
        engine.index(home_batch()).await.unwrap();

        assert_eq!(engine.document_count().await, 0);
        assert_eq!(engine.pending_batches().await, 1);

        engine.refresh().await.unwrap();
        assert_eq!(engine.document_count().await, 1);
        assert_eq!(engine.pending_batches().await, 0);
    }

    #[tokio::test]
    async fn test_unsupported_criterion_is_rejected_before_matching() {
        let engine = InMemoryEngine::new(RefreshMode::Immediate);
        let query = Query::filter(Criterion::CustomField {
            field: "title_s".into(),
            operator: crate::search::Operator::Eq,
            values: vec!["x".into()],
        });

        let err = engine
            .find_contents(&query, &LanguageSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotImplemented(_)));
    }

    #[tokio::test]
    async fn test_location_search_yields_each_location() {
        let engine = InMemoryEngine::new(RefreshMode::Immediate);
        engine.index(home_batch()).await.unwrap();

        let hits = engine
            .find_locations(
                &Query::filter(Criterion::Subtree(vec!["/1/".into()])),
                &LanguageSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].location.id, 2);
    }
}
