//! Field Type Behavior System
//!
//! This module provides the trait-based behavior system for field types:
//!
//! - `FieldTypeBehavior` trait - Defines type-specific validation and indexing
//! - Built-in behaviors (string, text, integer, email, country, …)
//! - `FieldTypeRegistry` - Behavior lookup and registration
//!
//! The behavior system enables extensibility while maintaining consistent
//! validation across content creation, updates and search indexing.

mod field_types;

pub use field_types::{
    BooleanFieldType, CountryFieldType, EmailFieldType, FloatFieldType, GeolocationFieldType,
    ImageFieldType, IntegerFieldType, RelationFieldType, StringFieldType, TextFieldType,
    UrlFieldType,
};

use crate::models::{ComparableValue, FieldValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-specific handling of field values
pub trait FieldTypeBehavior: Send + Sync {
    /// Identifier referenced by field definitions
    fn identifier(&self) -> &'static str;

    /// Validate a non-empty value; the error is a human readable reason
    fn validate(&self, value: &FieldValue) -> Result<(), String>;

    fn is_empty(&self, value: &FieldValue) -> bool {
        value.is_empty()
    }

    /// Text contributed to the full-text corpus
    fn search_text(&self, value: &FieldValue) -> Option<String>;

    /// Scalars matched by field criteria and used for sorting
    fn comparable(&self, value: &FieldValue) -> Vec<ComparableValue>;
}

/// Registry of field type behaviors keyed by identifier
pub struct FieldTypeRegistry {
    behaviors: HashMap<&'static str, Arc<dyn FieldTypeBehavior>>,
}

impl FieldTypeRegistry {
    /// Registry with all built-in field types
    pub fn new() -> Self {
        let mut registry = Self {
            behaviors: HashMap::new(),
        };
        registry.register(Arc::new(StringFieldType));
        registry.register(Arc::new(TextFieldType));
        registry.register(Arc::new(IntegerFieldType));
        registry.register(Arc::new(FloatFieldType));
        registry.register(Arc::new(BooleanFieldType));
        registry.register(Arc::new(EmailFieldType));
        registry.register(Arc::new(CountryFieldType));
        registry.register(Arc::new(GeolocationFieldType));
        registry.register(Arc::new(ImageFieldType));
        registry.register(Arc::new(UrlFieldType));
        registry.register(Arc::new(RelationFieldType));
        registry
    }

    /// Register (or replace) a behavior
    pub fn register(&mut self, behavior: Arc<dyn FieldTypeBehavior>) {
        self.behaviors.insert(behavior.identifier(), behavior);
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<dyn FieldTypeBehavior>> {
        self.behaviors.get(identifier).cloned()
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.behaviors.contains_key(identifier)
    }

    /// Validate a value for the given field type
    ///
    /// Empty values always pass here; required-ness is checked by the caller
    /// against the field definition.
    pub fn validate(&self, field_type: &str, value: &FieldValue) -> Result<(), String> {
        let behavior = self
            .get(field_type)
            .ok_or_else(|| format!("unknown field type '{}'", field_type))?;
        if behavior.is_empty(value) {
            return Ok(());
        }
        behavior.validate(value)
    }

    pub fn is_empty(&self, field_type: &str, value: &FieldValue) -> bool {
        match self.get(field_type) {
            Some(behavior) => behavior.is_empty(value),
            None => value.is_empty(),
        }
    }

    pub fn search_text(&self, field_type: &str, value: &FieldValue) -> Option<String> {
        let behavior = self.get(field_type)?;
        if behavior.is_empty(value) {
            return None;
        }
        behavior.search_text(value)
    }

    pub fn comparable(&self, field_type: &str, value: &FieldValue) -> Vec<ComparableValue> {
        match self.get(field_type) {
            Some(behavior) if !behavior.is_empty(value) => behavior.comparable(value),
            _ => Vec::new(),
        }
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut identifiers: Vec<_> = self.behaviors.keys().copied().collect();
        identifiers.sort_unstable();
        identifiers
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
