//! Query Criteria
//!
//! A [`Query`] carries two criterion trees: `filter` restricts the result set
//! without affecting relevance, `query` restricts it and contributes to the
//! score. Both compose with `LogicalAnd`, `LogicalOr` and `LogicalNot`.
//!
//! # Examples
//!
//! ```rust
//! use folio_core::search::{Criterion, Query, Visibility};
//!
//! let query = Query::new()
//!     .with_filter(Criterion::and(vec![
//!         Criterion::ContentTypeIdentifier(vec!["article".into()]),
//!         Criterion::Subtree(vec!["/1/2/".into()]),
//!         Criterion::Visibility(Visibility::Visible),
//!     ]))
//!     .with_query(Criterion::FullText("sindelfingen".into()))
//!     .with_limit(10);
//! assert_eq!(query.limit, Some(10));
//! ```

use crate::models::{ComparableValue, SortOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comparison operator for field, date and depth criteria
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Inclusive range; expects two values
    Between,
    /// Text pattern with `*` wildcards
    Like,
    /// Case-insensitive substring
    Contains,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateTarget {
    Modified,
    Published,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserTarget {
    Owner,
    /// Creator of the published version
    Modifier,
}

/// Predicate node of a search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "criterion",
    content = "value",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Criterion {
    ContentId(Vec<u64>),
    LocationId(Vec<u64>),
    ParentLocationId(Vec<u64>),
    ContentTypeIdentifier(Vec<String>),
    ContentTypeId(Vec<u64>),
    RemoteId(Vec<String>),
    LocationRemoteId(Vec<String>),
    SectionId(Vec<u64>),
    LanguageCode {
        codes: Vec<String>,
        /// Also match always-available content in its main language
        match_always_available: bool,
    },
    Visibility(Visibility),
    /// Path prefixes, e.g. `/1/2/`
    Subtree(Vec<String>),
    FullText(String),
    /// Value of a searchable field
    Field {
        identifier: String,
        operator: Operator,
        values: Vec<ComparableValue>,
    },
    DateMetadata {
        target: DateTarget,
        operator: Operator,
        values: Vec<DateTime<Utc>>,
    },
    UserMetadata {
        target: UserTarget,
        values: Vec<u64>,
    },
    Depth {
        operator: Operator,
        values: Vec<u32>,
    },
    /// Image dimension/size criteria; backend optional
    ImageMetadata {
        identifier: String,
        operator: Operator,
        values: Vec<ComparableValue>,
    },
    /// Raw backend field mapping; backend optional
    CustomField {
        field: String,
        operator: Operator,
        values: Vec<ComparableValue>,
    },
    MatchAll,
    MatchNone,
    LogicalAnd(Vec<Criterion>),
    LogicalOr(Vec<Criterion>),
    LogicalNot(Box<Criterion>),
}

impl Criterion {
    pub fn and(criteria: Vec<Criterion>) -> Self {
        Criterion::LogicalAnd(criteria)
    }

    pub fn or(criteria: Vec<Criterion>) -> Self {
        Criterion::LogicalOr(criteria)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(criterion: Criterion) -> Self {
        Criterion::LogicalNot(Box::new(criterion))
    }

    /// Field criterion with a single value
    pub fn field(
        identifier: impl Into<String>,
        operator: Operator,
        value: impl Into<ComparableValue>,
    ) -> Self {
        Criterion::Field {
            identifier: identifier.into(),
            operator,
            values: vec![value.into()],
        }
    }

    pub fn language(code: impl Into<String>) -> Self {
        Criterion::LanguageCode {
            codes: vec![code.into()],
            match_always_available: false,
        }
    }

    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::ContentId(_) => "ContentId",
            Criterion::LocationId(_) => "LocationId",
            Criterion::ParentLocationId(_) => "ParentLocationId",
            Criterion::ContentTypeIdentifier(_) => "ContentTypeIdentifier",
            Criterion::ContentTypeId(_) => "ContentTypeId",
            Criterion::RemoteId(_) => "RemoteId",
            Criterion::LocationRemoteId(_) => "LocationRemoteId",
            Criterion::SectionId(_) => "SectionId",
            Criterion::LanguageCode { .. } => "LanguageCode",
            Criterion::Visibility(_) => "Visibility",
            Criterion::Subtree(_) => "Subtree",
            Criterion::FullText(_) => "FullText",
            Criterion::Field { .. } => "Field",
            Criterion::DateMetadata { .. } => "DateMetadata",
            Criterion::UserMetadata { .. } => "UserMetadata",
            Criterion::Depth { .. } => "Depth",
            Criterion::ImageMetadata { .. } => "ImageMetadata",
            Criterion::CustomField { .. } => "CustomField",
            Criterion::MatchAll => "MatchAll",
            Criterion::MatchNone => "MatchNone",
            Criterion::LogicalAnd(_) => "LogicalAnd",
            Criterion::LogicalOr(_) => "LogicalOr",
            Criterion::LogicalNot(_) => "LogicalNot",
        }
    }

    /// Visit this criterion and all nested ones
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Criterion)) {
        visit(self);
        match self {
            Criterion::LogicalAnd(children) | Criterion::LogicalOr(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            Criterion::LogicalNot(inner) => inner.walk(visit),
            _ => {}
        }
    }
}

/// Ordering of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "clause", content = "order", rename_all = "camelCase")]
pub enum SortClause {
    ContentId(SortOrder),
    ContentName(SortOrder),
    DatePublished(SortOrder),
    DateModified(SortOrder),
    SectionId(SortOrder),
    /// Location queries only; content queries use the main location
    LocationPriority(SortOrder),
    LocationDepth(SortOrder),
    LocationPath(SortOrder),
    Score(SortOrder),
}

/// Content or location query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub filter: Option<Criterion>,
    pub query: Option<Criterion>,
    pub sort_clauses: Vec<SortClause>,
    pub offset: usize,
    /// Defaults to the configured search limit
    pub limit: Option<usize>,
}

/// Location queries use the same shape; criteria apply per location
pub type LocationQuery = Query;

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query with only a filter
    pub fn filter(criterion: Criterion) -> Self {
        Self::new().with_filter(criterion)
    }

    pub fn with_filter(mut self, criterion: Criterion) -> Self {
        self.filter = Some(criterion);
        self
    }

    pub fn with_query(mut self, criterion: Criterion) -> Self {
        self.query = Some(criterion);
        self
    }

    pub fn sort_by(mut self, clause: SortClause) -> Self {
        self.sort_clauses.push(clause);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Both trees, filter first
    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.filter.iter().chain(self.query.iter())
    }
}

/// Translations considered by a content search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSettings {
    /// Prioritized language codes; empty means every translation
    pub languages: Vec<String>,
    /// Also match always-available content in its main language
    pub use_always_available: bool,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            use_always_available: true,
        }
    }
}

impl LanguageSettings {
    pub fn new(languages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            use_always_available: true,
        }
    }

    pub fn use_always_available(mut self, use_always_available: bool) -> Self {
        self.use_always_available = use_always_available;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_nested_criteria() {
        let criterion = Criterion::and(vec![
            Criterion::ContentId(vec![1]),
            Criterion::not(Criterion::or(vec![
                Criterion::MatchNone,
                Criterion::FullText("x".into()),
            ])),
        ]);
        let mut names = Vec::new();
        criterion.walk(&mut |c| names.push(c.name()));
        assert_eq!(
            names,
            vec!["LogicalAnd", "ContentId", "LogicalNot", "LogicalOr", "MatchNone", "FullText"]
        );
    }

    #[test]
    fn test_criterion_serialization_contract() {
        let json = serde_json::to_value(Criterion::field("price", Operator::Gte, 10i64)).unwrap();
        assert_eq!(json["criterion"], "field");
        assert_eq!(json["value"]["operator"], "gte");
        assert_eq!(json["value"]["values"][0], 10);

        let json = serde_json::to_value(Criterion::LanguageCode {
            codes: vec!["eng-GB".to_string()],
            match_always_available: true,
        })
        .unwrap();
        assert_eq!(json["criterion"], "languageCode");
        assert_eq!(json["value"]["matchAlwaysAvailable"], true);
    }
}
