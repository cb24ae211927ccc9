//! Built-in field types

use super::FieldTypeBehavior;
use crate::models::{ComparableValue, FieldValue};
use regex::Regex;
use std::sync::OnceLock;

/// Maximum length of a `string` field value, in characters
pub const MAX_STRING_LENGTH: usize = 255;

// Pragmatic address check: one '@', no whitespace, dotted domain
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

// Absolute URLs with a scheme, or site-relative paths
const URL_PATTERN: &str = r"^([a-zA-Z][a-zA-Z0-9+.-]*://\S+|/\S*)$";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(URL_PATTERN).expect("url pattern is valid"))
}

fn unexpected(expected: &str, value: &FieldValue) -> String {
    format!("expected {} value, got {}", expected, value.kind())
}

pub struct StringFieldType;

impl FieldTypeBehavior for StringFieldType {
    fn identifier(&self) -> &'static str {
        "string"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::String(s) if s.chars().count() > MAX_STRING_LENGTH => Err(format!(
                "string is longer than {} characters",
                MAX_STRING_LENGTH
            )),
            FieldValue::String(_) => Ok(()),
            other => Err(unexpected("string", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::String(s) => vec![ComparableValue::Text(s.clone())],
            _ => Vec::new(),
        }
    }
}

pub struct TextFieldType;

impl FieldTypeBehavior for TextFieldType {
    fn identifier(&self) -> &'static str {
        "text"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Text(_) | FieldValue::String(_) => Ok(()),
            other => Err(unexpected("text", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Text(s) | FieldValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        self.search_text(value)
            .map(|text| vec![ComparableValue::Text(text)])
            .unwrap_or_default()
    }
}

pub struct IntegerFieldType;

impl FieldTypeBehavior for IntegerFieldType {
    fn identifier(&self) -> &'static str {
        "integer"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Integer(_) => Ok(()),
            other => Err(unexpected("integer", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Integer(i) => vec![ComparableValue::Integer(*i)],
            _ => Vec::new(),
        }
    }
}

pub struct FloatFieldType;

impl FieldTypeBehavior for FloatFieldType {
    fn identifier(&self) -> &'static str {
        "float"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Float(f) if !f.is_finite() => Err("float must be finite".to_string()),
            FieldValue::Float(_) | FieldValue::Integer(_) => Ok(()),
            other => Err(unexpected("float", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Float(f) => vec![ComparableValue::Float(*f)],
            FieldValue::Integer(i) => vec![ComparableValue::Float(*i as f64)],
            _ => Vec::new(),
        }
    }
}

pub struct BooleanFieldType;

impl FieldTypeBehavior for BooleanFieldType {
    fn identifier(&self) -> &'static str {
        "boolean"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Boolean(_) => Ok(()),
            other => Err(unexpected("boolean", other)),
        }
    }

    fn search_text(&self, _value: &FieldValue) -> Option<String> {
        None
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Boolean(b) => vec![ComparableValue::Boolean(*b)],
            _ => Vec::new(),
        }
    }
}

pub struct EmailFieldType;

impl FieldTypeBehavior for EmailFieldType {
    fn identifier(&self) -> &'static str {
        "email"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Email(address) | FieldValue::String(address) => {
                if email_regex().is_match(address.trim()) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a valid email address", address))
                }
            }
            other => Err(unexpected("email", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Email(address) | FieldValue::String(address) => {
                Some(address.trim().to_lowercase())
            }
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        self.search_text(value)
            .map(|address| vec![ComparableValue::Text(address)])
            .unwrap_or_default()
    }
}

pub struct CountryFieldType;

impl FieldTypeBehavior for CountryFieldType {
    fn identifier(&self) -> &'static str {
        "country"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Countries(codes) => {
                for code in codes {
                    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                        return Err(format!("'{}' is not an ISO 3166 alpha-2 code", code));
                    }
                }
                Ok(())
            }
            other => Err(unexpected("countries", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Countries(codes) => Some(codes.join(" ")),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Countries(codes) => codes
                .iter()
                .map(|code| ComparableValue::Text(code.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub struct GeolocationFieldType;

impl FieldTypeBehavior for GeolocationFieldType {
    fn identifier(&self) -> &'static str {
        "geolocation"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Geolocation(point) => {
                if !(-90.0..=90.0).contains(&point.latitude) {
                    return Err(format!("latitude {} is out of range", point.latitude));
                }
                if !(-180.0..=180.0).contains(&point.longitude) {
                    return Err(format!("longitude {} is out of range", point.longitude));
                }
                Ok(())
            }
            other => Err(unexpected("geolocation", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Geolocation(point) => point.address.clone(),
            _ => None,
        }
    }

    fn comparable(&self, _value: &FieldValue) -> Vec<ComparableValue> {
        Vec::new()
    }
}

pub struct ImageFieldType;

impl FieldTypeBehavior for ImageFieldType {
    fn identifier(&self) -> &'static str {
        "image"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Image(image) if image.width == 0 || image.height == 0 => {
                Err("image dimensions must be positive".to_string())
            }
            FieldValue::Image(_) => Ok(()),
            other => Err(unexpected("image", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Image(image) => image.alternative_text.clone(),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Image(image) => vec![ComparableValue::Text(image.file_name.clone())],
            _ => Vec::new(),
        }
    }
}

pub struct UrlFieldType;

impl FieldTypeBehavior for UrlFieldType {
    fn identifier(&self) -> &'static str {
        "url"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Url(url) if url_regex().is_match(&url.link) => Ok(()),
            FieldValue::Url(url) => Err(format!("'{}' is not a valid link", url.link)),
            other => Err(unexpected("url", other)),
        }
    }

    fn search_text(&self, value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Url(url) => url.text.clone(),
            _ => None,
        }
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Url(url) => vec![ComparableValue::Text(url.link.clone())],
            _ => Vec::new(),
        }
    }
}

pub struct RelationFieldType;

impl FieldTypeBehavior for RelationFieldType {
    fn identifier(&self) -> &'static str {
        "relation"
    }

    fn validate(&self, value: &FieldValue) -> Result<(), String> {
        match value {
            FieldValue::Relation(_) => Ok(()),
            other => Err(unexpected("relation", other)),
        }
    }

    fn search_text(&self, _value: &FieldValue) -> Option<String> {
        None
    }

    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue> {
        match value {
            FieldValue::Relation(Some(id)) => vec![ComparableValue::Integer(*id as i64)],
            _ => Vec::new(),
        }
    }
}
