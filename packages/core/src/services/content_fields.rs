//! Field assembly and content names
//!
//! Shared by content creation, draft updates and copies. A version's fields are
//! rebuilt whole: every field definition gets a value in every language of the
//! version, taken from (in order) the submitted input, the main language value
//! for non-translatable fields, the previous value, or the definition default.

use crate::behaviors::FieldTypeRegistry;
use crate::models::{ContentType, Field, FieldInput, FieldValue, ValidationError};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Matches `<field>` and `<a|b>` name schema tokens
const NAME_TOKEN_PATTERN: &str = r"<([^<>]+)>";

pub(crate) struct FieldAssembler<'a> {
    pub content_type: &'a ContentType,
    pub registry: &'a FieldTypeRegistry,
    pub main_language_code: &'a str,
}

impl FieldAssembler<'_> {
    /// Build the full field list for `languages`
    ///
    /// `default_language` is used for inputs without an explicit language.
    pub fn assemble(
        &self,
        languages: &BTreeSet<String>,
        existing: &[Field],
        inputs: &[FieldInput],
        default_language: &str,
    ) -> Result<Vec<Field>, ValidationError> {
        let mut submitted: HashMap<(String, String), FieldValue> = HashMap::new();
        for input in inputs {
            let language = input
                .language_code
                .clone()
                .unwrap_or_else(|| default_language.to_string());
            let definition = self
                .content_type
                .field_definition(&input.identifier)
                .ok_or_else(|| ValidationError::UnknownField(input.identifier.clone()))?;

            if !definition.is_translatable && language != self.main_language_code {
                return Err(ValidationError::NotTranslatable {
                    field: input.identifier.clone(),
                    language,
                });
            }
            self.registry
                .validate(&definition.field_type_identifier, &input.value)
                .map_err(|reason| ValidationError::InvalidFieldValue {
                    field: input.identifier.clone(),
                    reason,
                })?;
            submitted.insert((input.identifier.clone(), language), input.value.clone());
        }

        let previous: HashMap<(&str, &str), &FieldValue> = existing
            .iter()
            .map(|f| ((f.field_def_identifier.as_str(), f.language_code.as_str()), &f.value))
            .collect();

        let mut definitions: Vec<_> = self.content_type.field_definitions.iter().collect();
        definitions.sort_by_key(|definition| definition.position);

        let mut fields = Vec::new();
        for definition in definitions {
            let identifier = definition.identifier.as_str();
            let main_value = submitted
                .get(&(identifier.to_string(), self.main_language_code.to_string()))
                .cloned()
                .or_else(|| {
                    previous
                        .get(&(identifier, self.main_language_code))
                        .map(|value| (*value).clone())
                });

            for language in languages {
                let value = if !definition.is_translatable {
                    main_value.clone()
                } else {
                    submitted
                        .get(&(identifier.to_string(), language.clone()))
                        .cloned()
                        .or_else(|| {
                            previous
                                .get(&(identifier, language.as_str()))
                                .map(|value| (*value).clone())
                        })
                }
                .unwrap_or_else(|| definition.default_value.clone());

                if definition.is_required
                    && self.registry.is_empty(&definition.field_type_identifier, &value)
                {
                    return Err(ValidationError::MissingRequiredField {
                        field: identifier.to_string(),
                        language: language.clone(),
                    });
                }

                fields.push(Field {
                    field_def_identifier: identifier.to_string(),
                    language_code: language.clone(),
                    field_type_identifier: definition.field_type_identifier.clone(),
                    value,
                });
            }
        }
        Ok(fields)
    }

    /// Resolve the name schema for every language of `fields`
    pub fn names(&self, fields: &[Field], languages: &BTreeSet<String>) -> BTreeMap<String, String> {
        languages
            .iter()
            .map(|language| {
                let in_language: Vec<&Field> =
                    fields.iter().filter(|f| &f.language_code == language).collect();
                (
                    language.clone(),
                    resolve_name(&self.content_type.name_schema, &in_language, self.registry),
                )
            })
            .collect()
    }
}

/// Replace every `<a|b>` token with the first non-empty field's text
pub(crate) fn resolve_name(schema: &str, fields: &[&Field], registry: &FieldTypeRegistry) -> String {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let name_regex = NAME_REGEX.get_or_init(|| Regex::new(NAME_TOKEN_PATTERN).unwrap());

    name_regex
        .replace_all(schema, |captures: &regex::Captures<'_>| {
            captures[1]
                .split('|')
                .map(str::trim)
                .find_map(|identifier| {
                    fields
                        .iter()
                        .find(|f| f.field_def_identifier == identifier)
                        .and_then(|f| registry.search_text(&f.field_type_identifier, &f.value))
                        .filter(|text| !text.trim().is_empty())
                })
                .unwrap_or_default()
        })
        .trim()
        .to_string()
}

/// Destination content ids referenced by relation fields
pub(crate) fn relation_targets(fields: &[Field]) -> Vec<(String, u64)> {
    let mut targets: Vec<(String, u64)> = fields
        .iter()
        .filter_map(|field| match field.value {
            FieldValue::Relation(Some(destination)) => {
                Some((field.field_def_identifier.clone(), destination))
            }
            _ => None,
        })
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldDefinition;
    use chrono::Utc;

    fn definition(identifier: &str, required: bool, translatable: bool) -> FieldDefinition {
        FieldDefinition {
            id: 0,
            identifier: identifier.to_string(),
            field_type_identifier: "string".to_string(),
            position: 0,
            is_required: required,
            is_translatable: translatable,
            is_searchable: true,
            default_value: FieldValue::Empty,
        }
    }

    fn article() -> ContentType {
        let now = Utc::now();
        ContentType {
            id: 5,
            identifier: "article".to_string(),
            remote_id: "article".to_string(),
            names: BTreeMap::new(),
            main_language_code: "eng-GB".to_string(),
            name_schema: "<short_title|title> (<isbn>)".to_string(),
            is_container: false,
            default_always_available: false,
            field_definitions: vec![
                definition("title", true, true),
                definition("short_title", false, true),
                definition("isbn", false, false),
            ],
            creator_id: 14,
            created_at: now,
            modified_at: now,
        }
    }

    fn input(identifier: &str, value: &str, language: Option<&str>) -> FieldInput {
        FieldInput {
            identifier: identifier.to_string(),
            language_code: language.map(str::to_string),
            value: value.into(),
        }
    }

    fn languages(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_non_translatable_value_is_copied_to_every_language() {
        let content_type = article();
        let registry = FieldTypeRegistry::new();
        let assembler = FieldAssembler {
            content_type: &content_type,
            registry: &registry,
            main_language_code: "eng-GB",
        };

        let fields = assembler
            .assemble(
                &languages(&["eng-GB", "ger-DE"]),
                &[],
                &[
                    input("title", "Hello", None),
                    input("title", "Hallo", Some("ger-DE")),
                    input("isbn", "123", None),
                ],
                "eng-GB",
            )
            .unwrap();

        let isbn: Vec<_> = fields
            .iter()
            .filter(|f| f.field_def_identifier == "isbn")
            .collect();
        assert_eq!(isbn.len(), 2);
        assert!(isbn.iter().all(|f| f.value == FieldValue::String("123".into())));
    }

    #[test]
    fn test_required_field_is_checked_per_language() {
        let content_type = article();
        let registry = FieldTypeRegistry::new();
        let assembler = FieldAssembler {
            content_type: &content_type,
            registry: &registry,
            main_language_code: "eng-GB",
        };

        let err = assembler
            .assemble(
                &languages(&["eng-GB", "ger-DE"]),
                &[],
                &[input("title", "Hello", None)],
                "eng-GB",
            )
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRequiredField {
                field: "title".into(),
                language: "ger-DE".into()
            }
        );
    }

    #[test]
    fn test_name_schema_uses_first_non_empty_alternative() {
        let content_type = article();
        let registry = FieldTypeRegistry::new();
        let assembler = FieldAssembler {
            content_type: &content_type,
            registry: &registry,
            main_language_code: "eng-GB",
        };
        let langs = languages(&["eng-GB"]);
        let fields = assembler
            .assemble(
                &langs,
                &[],
                &[input("title", "Long title", None), input("isbn", "42", None)],
                "eng-GB",
            )
            .unwrap();

        assert_eq!(assembler.names(&fields, &langs)["eng-GB"], "Long title (42)");
    }

    #[test]
    fn test_wrong_value_kind_is_rejected() {
        let content_type = article();
        let registry = FieldTypeRegistry::new();
        let assembler = FieldAssembler {
            content_type: &content_type,
            registry: &registry,
            main_language_code: "eng-GB",
        };
        let inputs = vec![FieldInput {
            identifier: "title".into(),
            language_code: None,
            value: FieldValue::Integer(3),
        }];

        let err = assembler
            .assemble(&languages(&["eng-GB"]), &[], &inputs, "eng-GB")
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFieldValue { .. }));
    }
}
