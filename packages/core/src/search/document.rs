//! Search Documents and Criterion Matching
//!
//! The index stores one [`ContentDocument`] per published, non-trashed content
//! item. It carries the published version, every active location and one
//! [`TranslationDocument`] per language with the full-text terms and comparable
//! values of the searchable fields in that language.
//!
//! Location searches evaluate the same documents once per location, with
//! location criteria (`LocationId`, `Subtree`, `Visibility`, ...) applied to that
//! location only.

use crate::models::{ComparableValue, Content, Location};
use crate::search::criterion::{Criterion, DateTarget, Operator, UserTarget, Visibility};
use crate::search::fulltext::{normalize, parse_query, TermIndex};
use crate::search::SearchError;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Searchable data of one translation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationDocument {
    pub language_code: String,
    pub name: String,
    pub terms: TermIndex,
    /// Comparable values of searchable fields keyed by field identifier
    pub fields: HashMap<String, Vec<ComparableValue>>,
}

/// Indexed form of a published content item
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDocument {
    /// Published version with all of its fields
    pub content: Content,
    pub content_type_identifier: String,
    /// Active locations, ordered by id
    pub locations: Vec<Location>,
    pub translations: BTreeMap<String, TranslationDocument>,
}

impl ContentDocument {
    pub fn content_id(&self) -> u64 {
        self.content.content_info.id
    }

    pub fn main_location(&self) -> Option<&Location> {
        let main_id = self.content.content_info.main_location_id;
        self.locations
            .iter()
            .find(|location| Some(location.id) == main_id)
            .or_else(|| self.locations.first())
    }

    /// Languages to evaluate for a search, in priority order
    ///
    /// An empty preference list means every translation, main language first.
    pub fn candidate_languages<'s>(
        &'s self,
        preferred: &'s [String],
        use_always_available: bool,
    ) -> Vec<&'s str> {
        let info = &self.content.content_info;
        let main = info.main_language_code.as_str();

        if preferred.is_empty() {
            let mut languages: Vec<&str> = self
                .translations
                .keys()
                .map(String::as_str)
                .filter(|code| *code != main)
                .collect();
            if self.translations.contains_key(main) {
                languages.insert(0, main);
            }
            return languages;
        }

        let mut languages: Vec<&str> = preferred
            .iter()
            .map(String::as_str)
            .filter(|code| self.translations.contains_key(*code))
            .collect();
        if use_always_available
            && info.always_available
            && !languages.contains(&main)
            && self.translations.contains_key(main)
        {
            languages.push(main);
        }
        languages
    }
}

/// A document evaluated as content (all locations) or as one location
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub document: &'a ContentDocument,
    pub location: Option<&'a Location>,
}

impl<'a> Candidate<'a> {
    pub fn content(document: &'a ContentDocument) -> Self {
        Self {
            document,
            location: None,
        }
    }

    pub fn location(document: &'a ContentDocument, location: &'a Location) -> Self {
        Self {
            document,
            location: Some(location),
        }
    }

    fn locations(&self) -> Vec<&'a Location> {
        match self.location {
            Some(location) => vec![location],
            None => self.document.locations.iter().collect(),
        }
    }

    /// Score of the candidate for a criterion in one language
    ///
    /// `None` means no match. Full-text matches score their term frequency,
    /// every other matching criterion scores 1.
    pub fn score(&self, criterion: &Criterion, language: &str) -> Result<Option<f32>, SearchError> {
        let info = &self.document.content.content_info;
        let matched = match criterion {
            Criterion::LogicalAnd(children) => {
                let mut total = 0.0;
                for child in children {
                    match self.score(child, language)? {
                        Some(score) => total += score,
                        None => return Ok(None),
                    }
                }
                return Ok(Some(total));
            }
            Criterion::LogicalOr(children) => {
                let mut total = None;
                for child in children {
                    if let Some(score) = self.score(child, language)? {
                        total = Some(total.unwrap_or(0.0) + score);
                    }
                }
                return Ok(total);
            }
            Criterion::LogicalNot(inner) => {
                return Ok(match self.score(inner, language)? {
                    Some(_) => None,
                    None => Some(1.0),
                });
            }
            Criterion::FullText(text) => {
                let terms = parse_query(text);
                return Ok(self
                    .document
                    .translations
                    .get(language)
                    .and_then(|translation| translation.terms.score(&terms)));
            }
            Criterion::MatchAll => true,
            Criterion::MatchNone => false,
            Criterion::ContentId(ids) => ids.contains(&info.id),
            Criterion::ContentTypeId(ids) => ids.contains(&info.content_type_id),
            Criterion::ContentTypeIdentifier(identifiers) => {
                identifiers.contains(&self.document.content_type_identifier)
            }
            Criterion::RemoteId(remote_ids) => remote_ids.contains(&info.remote_id),
            Criterion::SectionId(ids) => ids.contains(&info.section_id),
            Criterion::LanguageCode {
                codes,
                match_always_available,
            } => {
                (*match_always_available && info.always_available)
                    || self
                        .document
                        .content
                        .version_info
                        .language_codes
                        .iter()
                        .any(|code| codes.contains(code))
            }
            Criterion::LocationId(ids) => self.locations().iter().any(|l| ids.contains(&l.id)),
            Criterion::ParentLocationId(ids) => self.locations().iter().any(|l| {
                l.parent_location_id
                    .map(|parent| ids.contains(&parent))
                    .unwrap_or(false)
            }),
            Criterion::LocationRemoteId(remote_ids) => self
                .locations()
                .iter()
                .any(|l| remote_ids.contains(&l.remote_id)),
            Criterion::Subtree(paths) => self.locations().iter().any(|l| {
                paths
                    .iter()
                    .any(|prefix| l.path_string.starts_with(prefix.as_str()))
            }),
            Criterion::Visibility(visibility) => {
                let want_invisible = *visibility == Visibility::Hidden;
                self.locations().iter().any(|l| l.invisible == want_invisible)
            }
            Criterion::Depth { operator, values } => {
                let expected: Vec<ComparableValue> = values
                    .iter()
                    .map(|depth| ComparableValue::Integer(i64::from(*depth)))
                    .collect();
                self.locations().iter().any(|l| {
                    compare(*operator, &ComparableValue::Integer(i64::from(l.depth)), &expected)
                })
            }
            Criterion::DateMetadata {
                target,
                operator,
                values,
            } => {
                let actual = match target {
                    DateTarget::Modified => Some(info.modified_at),
                    DateTarget::Published => info.published_at,
                };
                let expected: Vec<ComparableValue> = values
                    .iter()
                    .map(|date| ComparableValue::Integer(date.timestamp()))
                    .collect();
                actual
                    .map(|date| {
                        compare(*operator, &ComparableValue::Integer(date.timestamp()), &expected)
                    })
                    .unwrap_or(false)
            }
            Criterion::UserMetadata { target, values } => match target {
                UserTarget::Owner => values.contains(&info.owner_id),
                UserTarget::Modifier => {
                    values.contains(&self.document.content.version_info.creator_id)
                }
            },
            Criterion::Field {
                identifier,
                operator,
                values,
            } => self
                .document
                .translations
                .get(language)
                .and_then(|translation| translation.fields.get(identifier))
                .map(|actual| actual.iter().any(|value| compare(*operator, value, values)))
                .unwrap_or(false),
            Criterion::ImageMetadata { .. } | Criterion::CustomField { .. } => {
                return Err(SearchError::not_implemented(criterion.name()));
            }
        };
        Ok(matched.then_some(1.0))
    }
}

/// Evaluate an operator against expected values
pub fn compare(operator: Operator, actual: &ComparableValue, expected: &[ComparableValue]) -> bool {
    let ordering = |index: usize| expected.get(index).and_then(|value| actual.compare(value));
    match operator {
        Operator::Eq => ordering(0) == Some(Ordering::Equal),
        Operator::In => expected
            .iter()
            .any(|value| actual.compare(value) == Some(Ordering::Equal)),
        Operator::Gt => ordering(0) == Some(Ordering::Greater),
        Operator::Gte => matches!(ordering(0), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => ordering(0) == Some(Ordering::Less),
        Operator::Lte => matches!(ordering(0), Some(Ordering::Less | Ordering::Equal)),
        Operator::Between => {
            matches!(ordering(0), Some(Ordering::Greater | Ordering::Equal))
                && matches!(ordering(1), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::Like => match (actual, expected.first()) {
            (ComparableValue::Text(text), Some(ComparableValue::Text(pattern))) => {
                wildcard_match(&normalize(pattern), &normalize(text))
            }
            _ => false,
        },
        Operator::Contains => match (actual, expected.first()) {
            (ComparableValue::Text(text), Some(ComparableValue::Text(needle))) => {
                normalize(text).contains(&normalize(needle))
            }
            _ => false,
        },
    }
}

/// Match `text` against a pattern where `*` stands for any run of characters
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) || !text[first.len()..].ends_with(last) {
        return false;
    }

    let mut remaining = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match remaining.find(part) {
            Some(index) => remaining = &remaining[index + part.len()..],
            None => return false,
        }
    }
    true
}

/// Reject criteria with operands the operator cannot use
pub fn validate_operands(criterion: &Criterion) -> Result<(), SearchError> {
    let mut result = Ok(());
    criterion.walk(&mut |node| {
        if result.is_err() {
            return;
        }
        let (operator, count) = match node {
            Criterion::Field { operator, values, .. } => (*operator, values.len()),
            Criterion::DateMetadata { operator, values, .. } => (*operator, values.len()),
            Criterion::Depth { operator, values } => (*operator, values.len()),
            _ => return,
        };
        let valid = match operator {
            Operator::In => count > 0,
            Operator::Between => count == 2,
            _ => count == 1,
        };
        if !valid {
            result = Err(SearchError::invalid_query(format!(
                "{} criterion with operator {:?} got {} value(s)",
                node.name(),
                operator,
                count
            )));
        }
    });
    result
}
