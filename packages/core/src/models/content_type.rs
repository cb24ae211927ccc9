//! Content Type Definitions
//!
//! A content type describes the fields every content item of that type carries.
//! Field definitions reference a field type by identifier (`string`, `text`,
//! `integer`, …); the type must be registered in the
//! [`FieldTypeRegistry`](crate::behaviors::FieldTypeRegistry).
//!
//! ## Name schema
//!
//! `name_schema` derives the content name from field values, e.g. `<title>` or
//! `<short_name|name>` (first non-empty alternative wins).

use crate::models::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Definition of one field of a content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: u64,
    pub identifier: String,
    pub field_type_identifier: String,
    pub position: u32,
    pub is_required: bool,
    pub is_translatable: bool,
    /// Whether values take part in full-text and field criteria
    pub is_searchable: bool,
    #[serde(default)]
    pub default_value: FieldValue,
}

/// A content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    pub id: u64,
    pub identifier: String,
    pub remote_id: String,
    /// Names keyed by language code
    pub names: BTreeMap<String, String>,
    pub main_language_code: String,
    pub name_schema: String,
    pub is_container: bool,
    pub default_always_available: bool,
    pub field_definitions: Vec<FieldDefinition>,
    pub creator_id: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ContentType {
    pub fn field_definition(&self, identifier: &str) -> Option<&FieldDefinition> {
        self.field_definitions
            .iter()
            .find(|definition| definition.identifier == identifier)
    }

    /// Name in the given language, falling back to the main language
    pub fn name(&self, language_code: &str) -> Option<&str> {
        self.names
            .get(language_code)
            .or_else(|| self.names.get(&self.main_language_code))
            .map(String::as_str)
    }
}

/// Input for a new field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinitionCreateStruct {
    pub identifier: String,
    pub field_type_identifier: String,
    pub position: Option<u32>,
    pub is_required: bool,
    pub is_translatable: bool,
    pub is_searchable: bool,
    #[serde(default)]
    pub default_value: FieldValue,
}

impl FieldDefinitionCreateStruct {
    /// Translatable, searchable, optional field of the given type
    pub fn new(identifier: impl Into<String>, field_type_identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            field_type_identifier: field_type_identifier.into(),
            position: None,
            is_required: false,
            is_translatable: true,
            is_searchable: true,
            default_value: FieldValue::Empty,
        }
    }

    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn translatable(mut self, is_translatable: bool) -> Self {
        self.is_translatable = is_translatable;
        self
    }

    pub fn searchable(mut self, is_searchable: bool) -> Self {
        self.is_searchable = is_searchable;
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = value.into();
        self
    }
}

/// Input for a new content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeCreateStruct {
    pub identifier: String,
    pub remote_id: Option<String>,
    pub main_language_code: String,
    pub names: BTreeMap<String, String>,
    pub name_schema: Option<String>,
    pub is_container: bool,
    pub default_always_available: bool,
    pub field_definitions: Vec<FieldDefinitionCreateStruct>,
}

impl ContentTypeCreateStruct {
    pub fn new(identifier: impl Into<String>, main_language_code: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            remote_id: None,
            main_language_code: main_language_code.into(),
            names: BTreeMap::new(),
            name_schema: None,
            is_container: false,
            default_always_available: true,
            field_definitions: Vec::new(),
        }
    }

    pub fn with_name(mut self, language_code: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(language_code.into(), name.into());
        self
    }

    pub fn with_name_schema(mut self, schema: impl Into<String>) -> Self {
        self.name_schema = Some(schema.into());
        self
    }

    pub fn container(mut self, is_container: bool) -> Self {
        self.is_container = is_container;
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn add_field_definition(mut self, definition: FieldDefinitionCreateStruct) -> Self {
        self.field_definitions.push(definition);
        self
    }
}

/// Sparse update of content type metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeUpdateStruct {
    pub identifier: Option<String>,
    pub names: Option<BTreeMap<String, String>>,
    pub name_schema: Option<String>,
    pub is_container: Option<bool>,
    pub default_always_available: Option<bool>,
}
