//! Content Type Service
//!
//! Content types define the fields of content items. Identifiers of types and of
//! the field definitions within a type are unique, and every field definition
//! must reference a registered field type. A type cannot be deleted while
//! content of that type exists.
//!
//! All mutations require the `class` module policies (`class/create`,
//! `class/update`, `class/delete`).

use crate::db::Sequence;
use crate::models::{
    ContentType, ContentTypeCreateStruct, ContentTypeUpdateStruct, FieldDefinition,
    FieldDefinitionCreateStruct,
};
use crate::services::{RepositoryError, Session};
use std::collections::HashSet;

pub struct ContentTypeService<'a> {
    session: &'a Session,
}

impl<'a> ContentTypeService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Create a content type with its field definitions
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a duplicate identifier or remote id, duplicate field
    ///   identifiers or an unknown field type
    /// - `Unauthorized` without `class/create`
    pub async fn create_content_type(
        &self,
        create: ContentTypeCreateStruct,
    ) -> Result<ContentType, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("class", "create")?;
                validate_identifier("identifier", &create.identifier)?;
                if uow.state.content_type_by_identifier(&create.identifier).is_some() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        format!("content type '{}' already exists", create.identifier),
                    ));
                }
                if let Some(remote_id) = &create.remote_id {
                    if uow.state.content_types.values().any(|t| &t.remote_id == remote_id) {
                        return Err(RepositoryError::invalid_argument(
                            "remoteId",
                            format!("remote id '{}' is already in use", remote_id),
                        ));
                    }
                }
                if !uow.state.languages.contains_key(&create.main_language_code) {
                    return Err(RepositoryError::not_found(
                        "Language",
                        &create.main_language_code,
                    ));
                }

                let mut seen = HashSet::new();
                let mut field_definitions = Vec::with_capacity(create.field_definitions.len());
                for (index, definition) in create.field_definitions.iter().enumerate() {
                    if !seen.insert(definition.identifier.clone()) {
                        return Err(RepositoryError::invalid_argument(
                            "fieldDefinitions",
                            format!("duplicate field identifier '{}'", definition.identifier),
                        ));
                    }
                    let position = definition.position.unwrap_or(index as u32 + 1);
                    field_definitions.push(build_definition(uow, definition, position)?);
                }

                let name_schema = create.name_schema.clone().unwrap_or_else(|| {
                    field_definitions
                        .iter()
                        .min_by_key(|d| d.position)
                        .map(|d| format!("<{}>", d.identifier))
                        .unwrap_or_default()
                });

                let id = uow.state.next_id(Sequence::ContentType);
                let content_type = ContentType {
                    id,
                    identifier: create.identifier.clone(),
                    remote_id: create
                        .remote_id
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
                    names: create.names.clone(),
                    main_language_code: create.main_language_code.clone(),
                    name_schema,
                    is_container: create.is_container,
                    default_always_available: create.default_always_available,
                    field_definitions,
                    creator_id: uow.user.user_id,
                    created_at: uow.now,
                    modified_at: uow.now,
                };
                uow.state.content_types.insert(id, content_type.clone());
                tracing::info!("Created content type '{}' ({})", content_type.identifier, id);
                Ok(content_type)
            })
            .await
    }

    pub async fn load_content_type(&self, id: u64) -> Result<ContentType, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.state
                    .content_type(id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("ContentType", id))
            })
            .await
    }

    pub async fn load_content_type_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<ContentType, RepositoryError> {
        self.session
            .read(|ctx| {
                ctx.state
                    .content_type_by_identifier(identifier)
                    .cloned()
                    .ok_or_else(|| RepositoryError::not_found("ContentType", identifier))
            })
            .await
    }

    /// All content types ordered by id
    pub async fn load_content_types(&self) -> Result<Vec<ContentType>, RepositoryError> {
        self.session
            .read(|ctx| Ok(ctx.state.content_types.values().cloned().collect()))
            .await
    }

    /// Update type metadata; existing content keeps its stored names
    pub async fn update_content_type(
        &self,
        id: u64,
        update: ContentTypeUpdateStruct,
    ) -> Result<ContentType, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("class", "update")?;
                if uow.state.content_type(id).is_none() {
                    return Err(RepositoryError::not_found("ContentType", id));
                }
                if let Some(identifier) = &update.identifier {
                    validate_identifier("identifier", identifier)?;
                    if uow
                        .state
                        .content_type_by_identifier(identifier)
                        .is_some_and(|other| other.id != id)
                    {
                        return Err(RepositoryError::invalid_argument(
                            "identifier",
                            format!("content type '{}' already exists", identifier),
                        ));
                    }
                }

                let now = uow.now;
                let content_type = uow
                    .state
                    .content_types
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::not_found("ContentType", id))?;
                let renamed = update
                    .identifier
                    .as_ref()
                    .is_some_and(|identifier| *identifier != content_type.identifier);
                if let Some(identifier) = update.identifier {
                    content_type.identifier = identifier;
                }
                if let Some(names) = update.names {
                    content_type.names = names;
                }
                if let Some(name_schema) = update.name_schema {
                    content_type.name_schema = name_schema;
                }
                if let Some(is_container) = update.is_container {
                    content_type.is_container = is_container;
                }
                if let Some(always_available) = update.default_always_available {
                    content_type.default_always_available = always_available;
                }
                content_type.modified_at = now;
                let updated = content_type.clone();

                // Index documents carry the type identifier
                if renamed {
                    let affected: Vec<u64> = uow
                        .state
                        .contents
                        .values()
                        .filter(|info| info.content_type_id == id)
                        .map(|info| info.id)
                        .collect();
                    tracing::debug!(
                        "Content type {} renamed to '{}', reindexing {} content items",
                        id,
                        updated.identifier,
                        affected.len()
                    );
                    for content_id in affected {
                        uow.state.touch_content(content_id, uow.changes);
                    }
                }
                Ok(updated)
            })
            .await
    }

    /// Append a field definition to an existing type
    ///
    /// Existing content gets the definition's default value in every language
    /// the next time a draft of it is saved.
    pub async fn add_field_definition(
        &self,
        content_type_id: u64,
        definition: FieldDefinitionCreateStruct,
    ) -> Result<ContentType, RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("class", "update")?;
                let content_type = uow
                    .state
                    .content_type(content_type_id)
                    .ok_or_else(|| RepositoryError::not_found("ContentType", content_type_id))?;
                if content_type.field_definition(&definition.identifier).is_some() {
                    return Err(RepositoryError::invalid_argument(
                        "identifier",
                        format!("field '{}' already exists", definition.identifier),
                    ));
                }
                let position = definition.position.unwrap_or_else(|| {
                    content_type
                        .field_definitions
                        .iter()
                        .map(|d| d.position)
                        .max()
                        .unwrap_or(0)
                        + 1
                });

                let field_definition = build_definition(uow, &definition, position)?;
                let now = uow.now;
                let content_type = uow
                    .state
                    .content_types
                    .get_mut(&content_type_id)
                    .ok_or_else(|| RepositoryError::not_found("ContentType", content_type_id))?;
                content_type.field_definitions.push(field_definition);
                content_type.modified_at = now;
                Ok(content_type.clone())
            })
            .await
    }

    /// Delete a content type that no content uses
    pub async fn delete_content_type(&self, id: u64) -> Result<(), RepositoryError> {
        self.session
            .write(|uow| {
                uow.authorize_global("class", "delete")?;
                let content_type = uow
                    .state
                    .content_type(id)
                    .ok_or_else(|| RepositoryError::not_found("ContentType", id))?;
                if uow.state.contents.values().any(|c| c.content_type_id == id) {
                    return Err(RepositoryError::bad_state(
                        "contentType",
                        format!("content of type '{}' still exists", content_type.identifier),
                    ));
                }
                uow.state.content_types.remove(&id);
                Ok(())
            })
            .await
    }
}

fn validate_identifier(argument: &str, identifier: &str) -> Result<(), RepositoryError> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::invalid_argument(
            argument,
            format!("'{}' must be a non-empty [A-Za-z0-9_-] identifier", identifier),
        ))
    }
}

fn build_definition(
    uow: &mut crate::services::repository::UnitOfWork<'_>,
    create: &FieldDefinitionCreateStruct,
    position: u32,
) -> Result<FieldDefinition, RepositoryError> {
    validate_identifier("fieldDefinition.identifier", &create.identifier)?;
    let registry = &uow.inner.field_types;
    if !registry.has(&create.field_type_identifier) {
        return Err(RepositoryError::invalid_argument(
            "fieldTypeIdentifier",
            format!("unknown field type '{}'", create.field_type_identifier),
        ));
    }
    registry
        .validate(&create.field_type_identifier, &create.default_value)
        .map_err(|reason| RepositoryError::invalid_argument("defaultValue", reason))?;

    Ok(FieldDefinition {
        id: uow.state.next_id(Sequence::FieldDefinition),
        identifier: create.identifier.clone(),
        field_type_identifier: create.field_type_identifier.clone(),
        position,
        is_required: create.is_required,
        is_translatable: create.is_translatable,
        is_searchable: create.is_searchable,
        default_value: create.default_value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::RepositoryConfig;
    use crate::db::seed::{FOLDER_CONTENT_TYPE_ID, HOME_LOCATION_ID};
    use crate::models::{
        ContentCreateStruct, ContentTypeCreateStruct, ContentTypeUpdateStruct,
        FieldDefinitionCreateStruct, FieldValue, LocationCreateStruct,
    };
    use crate::services::{Repository, RepositoryError};

    fn blog_post() -> ContentTypeCreateStruct {
        ContentTypeCreateStruct::new("blog_post", "eng-GB")
            .with_name("eng-GB", "Blog post")
            .add_field_definition(FieldDefinitionCreateStruct::new("title", "string").required(true))
            .add_field_definition(
                FieldDefinitionCreateStruct::new("rating", "integer").with_default(FieldValue::Integer(3)),
            )
    }

    #[tokio::test]
    async fn test_create_content_type_assigns_positions_and_name_schema() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.admin_session();
        let types = session.content_type_service();

        let created = types.create_content_type(blog_post()).await.unwrap();
        assert_eq!(created.name_schema, "<title>");
        let positions: Vec<u32> = created.field_definitions.iter().map(|d| d.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(
            types.load_content_type_by_identifier("blog_post").await.unwrap(),
            created
        );
        assert_eq!(types.load_content_types().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_definitions_are_rejected() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.admin_session();
        let types = session.content_type_service();

        let duplicate_type = types
            .create_content_type(ContentTypeCreateStruct::new("folder", "eng-GB"))
            .await;
        assert!(matches!(duplicate_type, Err(RepositoryError::InvalidArgument { .. })));

        let unknown_field_type = types
            .create_content_type(
                ContentTypeCreateStruct::new("gallery", "eng-GB")
                    .add_field_definition(FieldDefinitionCreateStruct::new("photos", "carousel")),
            )
            .await;
        assert!(matches!(unknown_field_type, Err(RepositoryError::InvalidArgument { .. })));

        let duplicate_field = types
            .create_content_type(
                ContentTypeCreateStruct::new("gallery", "eng-GB")
                    .add_field_definition(FieldDefinitionCreateStruct::new("title", "string"))
                    .add_field_definition(FieldDefinitionCreateStruct::new("title", "text")),
            )
            .await;
        assert!(matches!(duplicate_field, Err(RepositoryError::InvalidArgument { .. })));

        let bad_default = types
            .create_content_type(
                ContentTypeCreateStruct::new("gallery", "eng-GB").add_field_definition(
                    FieldDefinitionCreateStruct::new("count", "integer").with_default("many"),
                ),
            )
            .await;
        assert!(matches!(bad_default, Err(RepositoryError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_update_and_extend_content_type() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.admin_session();
        let types = session.content_type_service();
        let created = types.create_content_type(blog_post()).await.unwrap();

        let updated = types
            .update_content_type(
                created.id,
                ContentTypeUpdateStruct {
                    is_container: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_container);
        assert_eq!(updated.identifier, "blog_post");

        let rename = types
            .update_content_type(
                created.id,
                ContentTypeUpdateStruct {
                    identifier: Some("folder".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(rename, Err(RepositoryError::InvalidArgument { .. })));

        let extended = types
            .add_field_definition(created.id, FieldDefinitionCreateStruct::new("summary", "text"))
            .await
            .unwrap();
        let summary = extended.field_definition("summary").unwrap();
        assert_eq!(summary.position, 3);

        let again = types
            .add_field_definition(created.id, FieldDefinitionCreateStruct::new("summary", "text"))
            .await;
        assert!(matches!(again, Err(RepositoryError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_delete_content_type_in_use() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.admin_session();
        let types = session.content_type_service();

        assert!(matches!(
            types.delete_content_type(FOLDER_CONTENT_TYPE_ID).await,
            Err(RepositoryError::BadState { .. })
        ));

        let created = types.create_content_type(blog_post()).await.unwrap();
        let draft = session
            .content_service()
            .create_content(
                ContentCreateStruct::new(&created, "eng-GB")
                    .set_field("title", "Hello")
                    .unwrap(),
                vec![LocationCreateStruct::new(HOME_LOCATION_ID)],
            )
            .await
            .unwrap();
        assert_eq!(
            draft.get_field_value("rating", None),
            Some(&FieldValue::Integer(3))
        );
        session.content_service().delete_content(&draft.content_info).await.unwrap();

        types.delete_content_type(created.id).await.unwrap();
        assert!(types.load_content_type(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_anonymous_user_cannot_create_types() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let anonymous = repository.anonymous_session();

        let result = anonymous.content_type_service().create_content_type(blog_post()).await;
        assert!(result.unwrap_err().is_unauthorized());
    }
}
