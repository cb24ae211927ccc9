//! Field Values
//!
//! A content version stores one [`Field`] per (field definition identifier,
//! language code) pair. The value is a closed [`FieldValue`] enum; which variants a
//! field accepts is decided by the field type behavior registered for the field
//! definition (see [`crate::behaviors`]).
//!
//! # Examples
//!
//! ```rust
//! use folio_core::models::FieldValue;
//!
//! let title: FieldValue = "Sindelfingen".into();
//! assert!(!title.is_empty());
//! assert!(FieldValue::Empty.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Validation errors for content, field and struct input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field '{field}' in language '{language}'")]
    MissingRequiredField { field: String, language: String },

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Unknown field definition: {0}")]
    UnknownField(String),

    #[error("Field '{field}' is not translatable and cannot be set in language '{language}'")]
    NotTranslatable { field: String, language: String },

    #[error("Remote id '{0}' is already in use")]
    DuplicateRemoteId(String),

    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Destination placeholder {{{placeholder}}} has no matching wildcard in the source URL")]
    PlaceholderMismatch { placeholder: usize },

    #[error("Missing required value: {0}")]
    MissingValue(String),
}

/// Geographic point with an optional postal address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Image reference; the binary itself lives outside the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValue {
    pub file_name: String,
    #[serde(default)]
    pub alternative_text: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlValue {
    pub link: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Value stored in a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    #[default]
    Empty,
    String(String),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Email(String),
    /// ISO 3166 alpha-2 codes
    Countries(Vec<String>),
    Geolocation(GeoPoint),
    Image(ImageValue),
    Url(UrlValue),
    /// Destination content id
    Relation(Option<u64>),
}

impl FieldValue {
    /// Whether the value carries no data
    ///
    /// Blank strings, empty country lists and unset relations count as empty, so a
    /// required field cannot be satisfied by whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::String(s) | FieldValue::Text(s) | FieldValue::Email(s) => {
                s.trim().is_empty()
            }
            FieldValue::Countries(c) => c.is_empty(),
            FieldValue::Relation(r) => r.is_none(),
            FieldValue::Url(u) => u.link.trim().is_empty(),
            FieldValue::Image(i) => i.file_name.trim().is_empty(),
            FieldValue::Integer(_)
            | FieldValue::Float(_)
            | FieldValue::Boolean(_)
            | FieldValue::Geolocation(_) => false,
        }
    }

    /// Name of the variant, used in validation messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::String(_) => "string",
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Email(_) => "email",
            FieldValue::Countries(_) => "countries",
            FieldValue::Geolocation(_) => "geolocation",
            FieldValue::Image(_) => "image",
            FieldValue::Url(_) => "url",
            FieldValue::Relation(_) => "relation",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// A field value of one version in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub field_def_identifier: String,
    pub language_code: String,
    pub field_type_identifier: String,
    pub value: FieldValue,
}

/// Scalar projection of a field value used for criteria and sorting
///
/// Values of different kinds never compare equal; integer/float pairs are
/// compared numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparableValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl ComparableValue {
    pub fn compare(&self, other: &ComparableValue) -> Option<Ordering> {
        match (self, other) {
            (ComparableValue::Integer(a), ComparableValue::Integer(b)) => Some(a.cmp(b)),
            (ComparableValue::Float(a), ComparableValue::Float(b)) => a.partial_cmp(b),
            (ComparableValue::Integer(a), ComparableValue::Float(b)) => (*a as f64).partial_cmp(b),
            (ComparableValue::Float(a), ComparableValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (ComparableValue::Boolean(a), ComparableValue::Boolean(b)) => Some(a.cmp(b)),
            (ComparableValue::Text(a), ComparableValue::Text(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            _ => None,
        }
    }
}

impl From<&str> for ComparableValue {
    fn from(value: &str) -> Self {
        ComparableValue::Text(value.to_string())
    }
}

impl From<i64> for ComparableValue {
    fn from(value: i64) -> Self {
        ComparableValue::Integer(value)
    }
}

impl From<bool> for ComparableValue {
    fn from(value: bool) -> Self {
        ComparableValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_empty() {
        assert!(FieldValue::String("   ".to_string()).is_empty());
        assert!(FieldValue::Countries(vec![]).is_empty());
        assert!(FieldValue::Relation(None).is_empty());
        assert!(!FieldValue::Integer(0).is_empty());
        assert!(!FieldValue::Boolean(false).is_empty());
    }

    #[test]
    fn test_field_value_serialization_contract() {
        let value = FieldValue::Countries(vec!["DE".to_string(), "NO".to_string()]);
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json["type"], "countries");
        assert_eq!(json["value"][1], "NO");
    }

    #[test]
    fn test_comparable_values_mix_numeric_kinds() {
        let int = ComparableValue::Integer(3);
        let float = ComparableValue::Float(2.5);

        assert_eq!(int.compare(&float), Some(Ordering::Greater));
        assert_eq!(int.compare(&ComparableValue::Text("3".into())), None);
    }

    #[test]
    fn test_text_comparison_ignores_case() {
        let a = ComparableValue::from("Oslo");
        let b = ComparableValue::from("oslo");
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }
}
