//! Reference Data: Sections and Languages

use serde::{Deserialize, Serialize};

/// Bit 0 of a language mask marks "always available"; the sign bit is unused.
pub const ALWAYS_AVAILABLE_BIT: i64 = 1;

/// Language ids are single bits 1..=62 of an `i64` mask
pub const MAX_LANGUAGES: usize = (i64::BITS - 2) as usize;

/// Partition tag on content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: u64,
    pub identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCreateStruct {
    pub identifier: String,
    pub name: String,
}

impl SectionCreateStruct {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionUpdateStruct {
    pub identifier: Option<String>,
    pub name: Option<String>,
}

/// Locale entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// Single-bit id, see [`MAX_LANGUAGES`]
    pub id: i64,
    pub language_code: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageCreateStruct {
    pub language_code: String,
    pub name: String,
    pub enabled: bool,
}

impl LanguageCreateStruct {
    pub fn new(language_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            name: name.into(),
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Compute the mask for a set of language ids
pub fn language_mask(language_ids: impl IntoIterator<Item = i64>, always_available: bool) -> i64 {
    let mask = language_ids.into_iter().fold(0, |mask, id| mask | id);
    if always_available {
        mask | ALWAYS_AVAILABLE_BIT
    } else {
        mask
    }
}
