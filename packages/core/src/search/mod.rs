//! Search Index
//!
//! - [`Criterion`], [`Query`], [`SortClause`] - query model
//! - [`IndexSynchronizer`] - derives documents from committed state
//! - [`SearchEngine`] - backend seam, with the embedded [`InMemoryEngine`]
//! - [`fulltext`] - tokenizer shared by indexing and querying
//! - [`SearchResult`] - hits returned by the search service

mod criterion;
mod document;
mod engine;
mod error;
pub mod fulltext;
mod result;
mod synchronizer;

pub use criterion::{
    Criterion, DateTarget, LanguageSettings, LocationQuery, Operator, Query, SortClause,
    UserTarget, Visibility,
};
pub use document::{compare, Candidate, ContentDocument, TranslationDocument};
pub use engine::{ContentMatch, InMemoryEngine, LocationMatch, SearchEngine};
pub use error::SearchError;
pub use result::{SearchHit, SearchResult};
pub use synchronizer::{IndexBatch, IndexSynchronizer};
