//! Initial Repository Data
//!
//! A fresh repository holds the tree root, a `Home` folder below it, the
//! default language, two sections and the `anonymous`/`administrator` roles.

use crate::config::RepositoryConfig;
use crate::db::state::{RepositoryState, Sequence, StoredVersion};
use crate::models::{
    ContentInfo, ContentStatus, ContentType, Field, FieldDefinition, FieldValue, Language,
    Limitation, Location, Policy, Role, RoleAssignment, Section, SortField, SortOrder,
    VersionInfo, VersionStatus, ROOT_CONTENT_ID, ROOT_LOCATION_ID,
};
use chrono::Utc;
use std::collections::BTreeMap;

pub const STANDARD_SECTION_ID: u64 = 1;
pub const MEDIA_SECTION_ID: u64 = 2;
pub const FOLDER_CONTENT_TYPE_ID: u64 = 1;
pub const HOME_CONTENT_ID: u64 = 1;
pub const HOME_LOCATION_ID: u64 = 2;
pub const ANONYMOUS_ROLE_ID: u64 = 1;
pub const ADMINISTRATOR_ROLE_ID: u64 = 2;

/// Build the initial state for a new repository
pub fn seed_state(config: &RepositoryConfig) -> RepositoryState {
    let mut state = RepositoryState::default();
    let now = Utc::now();
    let language = config.default_language_code.clone();

    state.languages.insert(
        language.clone(),
        Language {
            id: 2,
            language_code: language.clone(),
            name: config.default_language_name.clone(),
            enabled: true,
        },
    );

    for (id, identifier, name) in [
        (STANDARD_SECTION_ID, "standard", "Standard"),
        (MEDIA_SECTION_ID, "media", "Media"),
    ] {
        state.sections.insert(
            id,
            Section {
                id,
                identifier: identifier.to_string(),
                name: name.to_string(),
            },
        );
    }
    state.reserve_id(Sequence::Section, MEDIA_SECTION_ID);

    let folder_fields = [
        ("name", "string", true),
        ("short_name", "string", false),
        ("description", "text", false),
    ];
    let field_definitions: Vec<FieldDefinition> = folder_fields
        .iter()
        .enumerate()
        .map(|(position, (identifier, field_type, required))| FieldDefinition {
            id: position as u64 + 1,
            identifier: identifier.to_string(),
            field_type_identifier: field_type.to_string(),
            position: position as u32 + 1,
            is_required: *required,
            is_translatable: true,
            is_searchable: true,
            default_value: FieldValue::Empty,
        })
        .collect();
    state.reserve_id(Sequence::FieldDefinition, field_definitions.len() as u64);
    state.content_types.insert(
        FOLDER_CONTENT_TYPE_ID,
        ContentType {
            id: FOLDER_CONTENT_TYPE_ID,
            identifier: "folder".to_string(),
            remote_id: "a3d405b81be900468eb153d774f4f0d2".to_string(),
            names: BTreeMap::from([(language.clone(), "Folder".to_string())]),
            main_language_code: language.clone(),
            name_schema: "<short_name|name>".to_string(),
            is_container: true,
            default_always_available: true,
            field_definitions,
            creator_id: config.admin_user_id,
            created_at: now,
            modified_at: now,
        },
    );
    state.reserve_id(Sequence::ContentType, FOLDER_CONTENT_TYPE_ID);

    state.attach_location(Location {
        id: ROOT_LOCATION_ID,
        content_id: ROOT_CONTENT_ID,
        parent_location_id: None,
        path_string: format!("/{}/", ROOT_LOCATION_ID),
        depth: 0,
        priority: 0,
        hidden: false,
        invisible: false,
        remote_id: "629709ba256fe317c3ddcee35453a96a".to_string(),
        sort_field: SortField::Path,
        sort_order: SortOrder::Asc,
    });

    state.contents.insert(
        HOME_CONTENT_ID,
        ContentInfo {
            id: HOME_CONTENT_ID,
            content_type_id: FOLDER_CONTENT_TYPE_ID,
            remote_id: "9459d3c29e15006e45197295722c7ade".to_string(),
            name: "Home".to_string(),
            section_id: STANDARD_SECTION_ID,
            current_version_no: 1,
            status: ContentStatus::Published,
            owner_id: config.admin_user_id,
            main_language_code: language.clone(),
            main_location_id: Some(HOME_LOCATION_ID),
            always_available: true,
            published_at: Some(now),
            modified_at: now,
        },
    );
    state.versions.insert(
        (HOME_CONTENT_ID, 1),
        StoredVersion {
            info: VersionInfo {
                content_id: HOME_CONTENT_ID,
                version_no: 1,
                status: VersionStatus::Published,
                language_codes: vec![language.clone()],
                initial_language_code: language.clone(),
                creator_id: config.admin_user_id,
                names: BTreeMap::from([(language.clone(), "Home".to_string())]),
                created_at: now,
                modified_at: now,
            },
            fields: vec![Field {
                field_def_identifier: "name".to_string(),
                language_code: language,
                field_type_identifier: "string".to_string(),
                value: FieldValue::String("Home".to_string()),
            }],
        },
    );
    state.reserve_id(Sequence::Content, HOME_CONTENT_ID);

    state.attach_location(Location {
        id: HOME_LOCATION_ID,
        content_id: HOME_CONTENT_ID,
        parent_location_id: Some(ROOT_LOCATION_ID),
        path_string: format!("/{}/{}/", ROOT_LOCATION_ID, HOME_LOCATION_ID),
        depth: 1,
        priority: 0,
        hidden: false,
        invisible: false,
        remote_id: "f3e90596361e31d496d4026eb624c983".to_string(),
        sort_field: SortField::Priority,
        sort_order: SortOrder::Asc,
    });
    state.reserve_id(Sequence::Location, HOME_LOCATION_ID);

    state.roles.insert(
        ANONYMOUS_ROLE_ID,
        Role {
            id: ANONYMOUS_ROLE_ID,
            identifier: "anonymous".to_string(),
            policies: vec![Policy::new("content", "read")
                .with_limitation(Limitation::Section(vec![STANDARD_SECTION_ID]))],
        },
    );
    state.roles.insert(
        ADMINISTRATOR_ROLE_ID,
        Role {
            id: ADMINISTRATOR_ROLE_ID,
            identifier: "administrator".to_string(),
            policies: vec![Policy::new("*", "*")],
        },
    );
    state.reserve_id(Sequence::Role, ADMINISTRATOR_ROLE_ID);

    for (id, role_id, user_id) in [
        (1, ANONYMOUS_ROLE_ID, config.anonymous_user_id),
        (2, ADMINISTRATOR_ROLE_ID, config.admin_user_id),
    ] {
        state.role_assignments.insert(
            id,
            RoleAssignment {
                id,
                role_id,
                user_id,
                limitation: None,
            },
        );
    }
    state.reserve_id(Sequence::RoleAssignment, 2);

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_has_root_and_home() {
        let state = seed_state(&RepositoryConfig::default());

        assert!(state.root_location().is_some());
        assert_eq!(state.child_ids(ROOT_LOCATION_ID), vec![HOME_LOCATION_ID]);
        assert_eq!(state.locations_of(HOME_CONTENT_ID).len(), 1);
        assert!(state.published_version(HOME_CONTENT_ID).is_some());
        assert!(state.languages.contains_key("eng-GB"));
    }

    #[test]
    fn test_new_ids_do_not_collide_with_seed() {
        let mut state = seed_state(&RepositoryConfig::default());
        assert_eq!(state.next_id(Sequence::Location), 3);
        assert_eq!(state.next_id(Sequence::Section), 3);
        assert_eq!(state.next_id(Sequence::Content), 2);
    }
}
