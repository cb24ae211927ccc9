//! Content Aggregates
//!
//! - [`ContentInfo`] - identity and metadata of a content item, independent of version
//! - [`VersionInfo`] - one revision with its lifecycle status
//! - [`Content`] - a version together with its field values
//! - [`Relation`] - directed edge from a source version to a destination content
//!
//! # Version lifecycle
//!
//! ```text
//! DRAFT ──publish──▶ PUBLISHED ──(next publish)──▶ ARCHIVED
//! ```
//!
//! Transitions are monotonic; a version never returns to `Draft`. At most one
//! version of a content item is `Published` at any time.

use crate::models::{ContentType, Field, FieldValue, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall status of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Never published
    Draft,
    Published,
    /// Every location of the content is in the trash
    Trashed,
}

/// Status of a single version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    Draft,
    Published,
    Archived,
}

/// Identity record of a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInfo {
    pub id: u64,
    pub content_type_id: u64,
    /// Externally stable, globally unique key
    pub remote_id: String,
    /// Name of the published version in the main language
    pub name: String,
    pub section_id: u64,
    /// Version number of the published version (1 while never published)
    pub current_version_no: u32,
    pub status: ContentStatus,
    pub owner_id: u64,
    pub main_language_code: String,
    pub main_location_id: Option<u64>,
    pub always_available: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
}

impl ContentInfo {
    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    pub fn is_trashed(&self) -> bool {
        self.status == ContentStatus::Trashed
    }
}

/// One revision of a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub content_id: u64,
    pub version_no: u32,
    pub status: VersionStatus,
    /// Languages present in this version, sorted
    pub language_codes: Vec<String>,
    pub initial_language_code: String,
    pub creator_id: u64,
    /// Names derived from the content type name schema, per language
    pub names: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl VersionInfo {
    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }

    pub fn is_published(&self) -> bool {
        self.status == VersionStatus::Published
    }

    pub fn has_language(&self, language_code: &str) -> bool {
        self.language_codes.iter().any(|code| code == language_code)
    }

    pub fn name(&self, language_code: &str) -> Option<&str> {
        self.names.get(language_code).map(String::as_str)
    }
}

/// A version with its field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub content_info: ContentInfo,
    pub version_info: VersionInfo,
    pub fields: Vec<Field>,
}

impl Content {
    pub fn id(&self) -> u64 {
        self.content_info.id
    }

    /// Field value in the given language (main language when `None`)
    pub fn get_field_value(&self, identifier: &str, language_code: Option<&str>) -> Option<&FieldValue> {
        let language = language_code.unwrap_or(&self.content_info.main_language_code);
        self.fields
            .iter()
            .find(|field| field.field_def_identifier == identifier && field.language_code == language)
            .map(|field| &field.value)
    }

    pub fn fields_by_language(&self, language_code: &str) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|field| field.language_code == language_code)
            .collect()
    }

    /// Name in the given language, falling back to the content name
    pub fn name(&self, language_code: Option<&str>) -> &str {
        language_code
            .and_then(|code| self.version_info.name(code))
            .unwrap_or(&self.content_info.name)
    }
}

/// Value set on a create/update struct before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    pub identifier: String,
    /// `None` means the struct's main/initial language
    pub language_code: Option<String>,
    pub value: FieldValue,
}

/// Input for a new content item
///
/// Built from a content type so setters can reject unknown fields and
/// translation violations immediately:
///
/// ```rust
/// # use folio_core::models::{ContentCreateStruct, ContentType};
/// # fn example(article: &ContentType) -> Result<(), folio_core::models::ValidationError> {
/// let create = ContentCreateStruct::new(article, "eng-GB")
///     .set_field("title", "Sindelfingen")?
///     .set_field_in("title", "Sindelfingen (de)", "ger-DE")?
///     .with_remote_id("article-sindelfingen");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCreateStruct {
    pub content_type_id: u64,
    pub main_language_code: String,
    pub remote_id: Option<String>,
    pub section_id: Option<u64>,
    pub owner_id: Option<u64>,
    pub always_available: Option<bool>,
    pub fields: Vec<FieldInput>,
    #[serde(skip)]
    definitions: Vec<(String, bool)>,
}

impl ContentCreateStruct {
    pub fn new(content_type: &ContentType, main_language_code: impl Into<String>) -> Self {
        Self {
            content_type_id: content_type.id,
            main_language_code: main_language_code.into(),
            remote_id: None,
            section_id: None,
            owner_id: None,
            always_available: None,
            fields: Vec::new(),
            definitions: content_type
                .field_definitions
                .iter()
                .map(|d| (d.identifier.clone(), d.is_translatable))
                .collect(),
        }
    }

    /// Set a field value in the main language
    pub fn set_field(
        self,
        identifier: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Self, ValidationError> {
        let language = self.main_language_code.clone();
        self.set_field_in(identifier, value, &language)
    }

    /// Set a field value in a specific language
    pub fn set_field_in(
        mut self,
        identifier: &str,
        value: impl Into<FieldValue>,
        language_code: &str,
    ) -> Result<Self, ValidationError> {
        // Structs deserialized without their type skip the early check; the
        // service validates again against the stored content type.
        if !self.definitions.is_empty() {
            let translatable = self
                .definitions
                .iter()
                .find(|(id, _)| id == identifier)
                .map(|(_, translatable)| *translatable)
                .ok_or_else(|| ValidationError::UnknownField(identifier.to_string()))?;
            if !translatable && language_code != self.main_language_code {
                return Err(ValidationError::NotTranslatable {
                    field: identifier.to_string(),
                    language: language_code.to_string(),
                });
            }
        }

        self.fields.retain(|f| {
            !(f.identifier == identifier && f.language_code.as_deref() == Some(language_code))
        });
        self.fields.push(FieldInput {
            identifier: identifier.to_string(),
            language_code: Some(language_code.to_string()),
            value: value.into(),
        });
        Ok(self)
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn with_section_id(mut self, section_id: u64) -> Self {
        self.section_id = Some(section_id);
        self
    }

    pub fn with_owner_id(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_always_available(mut self, always_available: bool) -> Self {
        self.always_available = Some(always_available);
        self
    }

    /// Every language a value was given in, main language first
    pub fn language_codes(&self) -> Vec<String> {
        let mut codes = vec![self.main_language_code.clone()];
        for field in &self.fields {
            if let Some(code) = &field.language_code {
                if !codes.contains(code) {
                    codes.push(code.clone());
                }
            }
        }
        codes
    }
}

/// Field changes applied to a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdateStruct {
    /// Language of the values without an explicit language; defaults to the
    /// draft's initial language
    pub initial_language_code: Option<String>,
    pub fields: Vec<FieldInput>,
}

impl ContentUpdateStruct {
    pub fn new() -> Self {
        Self {
            initial_language_code: None,
            fields: Vec::new(),
        }
    }

    pub fn in_language(mut self, language_code: impl Into<String>) -> Self {
        self.initial_language_code = Some(language_code.into());
        self
    }

    pub fn set_field(mut self, identifier: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.push(FieldInput {
            identifier: identifier.to_string(),
            language_code: None,
            value: value.into(),
        });
        self
    }

    pub fn set_field_in(
        mut self,
        identifier: &str,
        value: impl Into<FieldValue>,
        language_code: &str,
    ) -> Self {
        self.fields.push(FieldInput {
            identifier: identifier.to_string(),
            language_code: Some(language_code.to_string()),
            value: value.into(),
        });
        self
    }
}

impl Default for ContentUpdateStruct {
    fn default() -> Self {
        Self::new()
    }
}

/// Sparse update of content metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadataUpdateStruct {
    pub owner_id: Option<u64>,
    pub remote_id: Option<String>,
    pub main_language_code: Option<String>,
    pub always_available: Option<bool>,
    pub main_location_id: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Kind of a relation edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Added explicitly through the relation API
    Common,
    Embed,
    Link,
    /// Derived from a relation field value
    Field,
}

/// Directed edge from a source version to a destination content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: u64,
    pub source_content_id: u64,
    pub source_version_no: u32,
    pub destination_content_id: u64,
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field_identifier: Option<String>,
}
