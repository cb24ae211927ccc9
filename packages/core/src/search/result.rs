//! Search Results

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One matching value object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit<T> {
    pub value_object: T,
    /// Relevance; `None` for filter-only queries
    pub score: Option<f32>,
    /// Translation the query matched in
    pub matched_translation: String,
}

/// A page of hits with the total number of readable matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    pub total_count: usize,
    pub search_hits: Vec<SearchHit<T>>,
    pub max_score: Option<f32>,
    pub time: Duration,
}

impl<T> SearchResult<T> {
    pub fn is_empty(&self) -> bool {
        self.search_hits.is_empty()
    }

    /// Value objects of the hits in result order
    pub fn value_objects(&self) -> impl Iterator<Item = &T> {
        self.search_hits.iter().map(|hit| &hit.value_object)
    }
}
